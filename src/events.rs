//! Authentication lifecycle events.
//!
//! This module provides:
//! - `AuthEvent`: metadata about one authentication attempt
//! - `EventHooks`: the `on_pre_auth` and `on_post_auth` subscriber lists
//! - `EventTrail`: in-memory event recorder
//!
//! Subscribers observe the flow; they cannot change it. Events carry only
//! safe metadata and never a credential.

mod event;
mod hooks;
mod trail;

pub use event::{AuthEvent, AuthEventKind};
pub use hooks::{EventHooks, HookFn};
pub use trail::EventTrail;
