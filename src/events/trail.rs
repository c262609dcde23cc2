//! In-memory event recorder.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{AuthEvent, EventHooks};

/// In-memory recorder for authentication events.
///
/// Stores events in the order they were published. Useful in tests and as
/// a building block for an audit sink.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use route_auth::events::{AuthEvent, AuthEventKind, EventHooks, EventTrail};
///
/// let trail = Arc::new(EventTrail::new());
/// let mut hooks = EventHooks::new();
/// trail.subscribe(&mut hooks);
///
/// hooks.publish(&AuthEvent::new("req-123", AuthEventKind::PreAuth));
/// assert_eq!(trail.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EventTrail {
    events: Mutex<Vec<AuthEvent>>,
}

impl EventTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers this trail for both event kinds.
    pub fn subscribe(self: &Arc<Self>, hooks: &mut EventHooks) {
        let pre = Arc::clone(self);
        hooks.on_pre_auth(move |event| {
            pre.record(event.clone());
            Ok(())
        });
        let post = Arc::clone(self);
        hooks.on_post_auth(move |event| {
            post.record(event.clone());
            Ok(())
        });
    }

    /// Records an event.
    pub fn record(&self, event: AuthEvent) {
        self.events.lock().push(event);
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AuthEventKind;

    #[test]
    fn starts_empty() {
        let trail = EventTrail::new();
        assert!(trail.is_empty());
        assert_eq!(trail.len(), 0);
    }

    #[test]
    fn records_published_events_in_order() {
        let trail = Arc::new(EventTrail::new());
        let mut hooks = EventHooks::new();
        trail.subscribe(&mut hooks);

        hooks.publish(&AuthEvent::new("req-1", AuthEventKind::PreAuth));
        hooks.publish(&AuthEvent::new("req-1", AuthEventKind::PostAuth).with_principal("alice"));

        let events = trail.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), AuthEventKind::PreAuth);
        assert_eq!(events[1].principal(), Some("alice"));

        trail.clear();
        assert!(trail.is_empty());
    }
}
