//! Pre/post authentication subscribers.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{AuthEvent, AuthEventKind};
use crate::error::HookError;

/// Subscriber callback.
pub type HookFn = dyn Fn(&AuthEvent) -> Result<(), HookError> + Send + Sync;

/// Ordered subscriber lists for the two authentication events.
///
/// Subscribers run synchronously, in registration order, inside the
/// dispatch flow. An error or a panic in one subscriber is logged at warn
/// and the remaining subscribers still run; the flow itself is never
/// affected.
///
/// # Example
///
/// ```
/// use route_auth::events::{AuthEvent, AuthEventKind, EventHooks};
///
/// let mut hooks = EventHooks::new();
/// hooks.on_post_auth(|event| {
///     println!("signed in: {:?}", event.principal());
///     Ok(())
/// });
/// hooks.publish(&AuthEvent::new("req-1", AuthEventKind::PostAuth));
/// ```
#[derive(Default, Clone)]
pub struct EventHooks {
    pre_auth: Vec<Arc<HookFn>>,
    post_auth: Vec<Arc<HookFn>>,
}

impl EventHooks {
    /// Creates empty hook lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events published before credentials are verified.
    pub fn on_pre_auth<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&AuthEvent) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre_auth.push(Arc::new(hook));
        self
    }

    /// Subscribes to events published after a successful authentication.
    pub fn on_post_auth<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&AuthEvent) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_auth.push(Arc::new(hook));
        self
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: AuthEventKind) -> usize {
        self.subscribers(kind).len()
    }

    /// Delivers `event` to every subscriber of its kind.
    pub fn publish(&self, event: &AuthEvent) {
        for hook in self.subscribers(event.kind()) {
            match panic::catch_unwind(AssertUnwindSafe(|| hook(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    request_id = %event.request_id(),
                    kind = %event.kind(),
                    error = %e,
                    "event hook failed"
                ),
                Err(_) => tracing::warn!(
                    request_id = %event.request_id(),
                    kind = %event.kind(),
                    "event hook panicked"
                ),
            }
        }
    }

    fn subscribers(&self, kind: AuthEventKind) -> &[Arc<HookFn>] {
        match kind {
            AuthEventKind::PreAuth => &self.pre_auth,
            AuthEventKind::PostAuth => &self.post_auth,
        }
    }
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("pre_auth", &self.pre_auth.len())
            .field("post_auth", &self.post_auth.len())
            .finish()
    }
}
