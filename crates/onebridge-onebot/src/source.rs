// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription interface between an event-producing transport and the adapter.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::event::{EventKind, RawEvent};

/// Receives events of the kinds it was subscribed for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: RawEvent);
}

/// A transport that pushes events to handlers registered per [`EventKind`].
pub trait EventSource: Send + Sync {
    /// Registers `handler` for `kind`, replacing any previous handler for it.
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>);
}

/// Per-kind handler registry that event sources embed.
#[derive(Default)]
pub struct HandlerTable {
    handlers: DashMap<EventKind, Arc<dyn EventHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            debug!(?kind, "replaced event handler");
        }
    }

    fn handler_for(&self, kind: EventKind) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(&kind).map(|entry| Arc::clone(entry.value()))
    }

    /// Delivers `event` to the handler of its kind. Returns `false` when the
    /// event has no routable kind or nobody subscribed to it.
    pub async fn route(&self, event: RawEvent) -> bool {
        let Some(kind) = EventKind::of(&event) else {
            debug!(post_type = ?event.post_type(), "no route for event");
            return false;
        };
        // Clone out of the map so no shard guard is held across the handler's awaits.
        let Some(handler) = self.handler_for(kind) else {
            debug!(?kind, "no handler subscribed");
            return false;
        };
        handler.handle_event(event).await;
        true
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.handler_for(kind).is_some()
    }
}

impl EventSource for HandlerTable {
    fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        HandlerTable::subscribe(self, kind, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle_event(&self, _event: RawEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn routes_only_to_subscribed_kind() {
        let table = HandlerTable::new();
        let notices = Arc::new(Counter::default());
        table.subscribe(EventKind::Notice, notices.clone());

        assert!(table.route(RawEvent::new(json!({"post_type": "notice"}))).await);
        assert!(
            !table
                .route(RawEvent::new(json!({"post_type": "request"})))
                .await
        );
        assert!(
            !table
                .route(RawEvent::new(json!({"post_type": "meta_event"})))
                .await
        );
        assert_eq!(notices.0.load(Ordering::SeqCst), 1);
        assert!(table.is_subscribed(EventKind::Notice));
        assert!(!table.is_subscribed(EventKind::Request));
    }

    #[tokio::test]
    async fn resubscribing_replaces_the_handler() {
        let table = HandlerTable::new();
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        table.subscribe(EventKind::Notice, first.clone());
        table.subscribe(EventKind::Notice, second.clone());

        assert!(table.route(RawEvent::new(json!({"post_type": "notice"}))).await);
        assert_eq!(first.0.load(Ordering::SeqCst), 0);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
    }

    /// A handler that subscribes from inside its own delivery must not
    /// deadlock on the registry.
    struct Resubscriber {
        table: Arc<HandlerTable>,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Resubscriber {
        async fn handle_event(&self, _event: RawEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.table
                .subscribe(EventKind::Request, Arc::new(Counter::default()));
        }
    }

    #[tokio::test]
    async fn handler_may_subscribe_during_delivery() {
        let table = Arc::new(HandlerTable::new());
        let handler = Arc::new(Resubscriber {
            table: table.clone(),
            seen: AtomicUsize::new(0),
        });
        table.subscribe(EventKind::Notice, handler.clone());

        assert!(table.route(RawEvent::new(json!({"post_type": "notice"}))).await);
        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);
        assert!(table.is_subscribed(EventKind::Request));
    }
}
