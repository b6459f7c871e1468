// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for onebridge integration tests.
//!
//! Provides a scripted transport and a collecting sink so the full
//! normalize-aggregate-dispatch pipeline runs without a OneBot server.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted enrichment answers, failure injection, event routing
//! - [`CollectingSink`] - Dispatch sink that records finalized messages
//! - [`events`] - Raw OneBot event and segment builders
//! - [`TestHarness`] - Transport, adapter and sink wired together

pub mod events;
pub mod harness;
pub mod mock_transport;
pub mod sink;

pub use harness::TestHarness;
pub use mock_transport::{ActionCall, MockTransport};
pub use sink::CollectingSink;
