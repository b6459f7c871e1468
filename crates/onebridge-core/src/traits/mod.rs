// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the onebridge core.

pub mod adapter;
pub mod sink;

pub use adapter::PluginAdapter;
pub use sink::DispatchSink;
