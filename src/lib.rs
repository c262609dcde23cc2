//! Per-request authentication and authorization dispatch for HTTP routes.
//!
//! Given a request and the auth policy of the route it matched, this crate
//! decides whether the request may proceed, establishes or restores the
//! verified identity ([`Subject`]) and records the side effects the chosen
//! scheme requires: session mutation, redirects and challenge headers.
//!
//! # Core Types
//!
//! - [`SecurityManager`]: configured schemes, session manager and event hooks
//! - [`AuthDispatcher`]: runs the form or stateless flow for one request
//! - [`Context`]: single owner of a request's wrapper, route, subject and reply
//! - [`Scheme`]: a resolved scheme, tagged by the flow it needs
//! - [`Request`] / [`RequestPool`]: request wrapper and its reset-on-release pool
//! - [`Session`] / [`Storer`]: per-client state and its pluggable store
//! - [`Credential`]: secret bytes that redact themselves and never persist
//!
//! # Examples
//!
//! ```
//! use http::{Method, Uri};
//! use route_auth::{
//!     AuthDispatcher, AuthOutcome, Context, RawRequest, RequestPool, Route,
//!     SecurityManager, SessionManager,
//! };
//!
//! let manager = SecurityManager::new(SessionManager::in_memory());
//! let pool = RequestPool::new();
//!
//! let req = pool.acquire(RawRequest::new(Method::GET, Uri::from_static("/about")));
//! let session = manager.session_manager().get_session(&req)?;
//! let mut ctx = Context::new(req, Route::anonymous(Method::GET, "/about"), session);
//!
//! let outcome = AuthDispatcher::new(&manager).handle_authc_and_authz(&mut ctx)?;
//! assert_eq!(outcome, AuthOutcome::ContinueAnonymous);
//!
//! // After the response is written: flush the session once, then the
//! // request wrapper goes back to the pool when `req` drops.
//! let (req, session, _reply) = ctx.into_parts();
//! manager.session_manager().save(&session)?;
//! drop(req);
//! assert_eq!(pool.idle_count(), 1);
//! # Ok::<(), route_auth::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod authc;
mod authz;
pub mod config;
mod context;
mod credential;
mod dispatch;
mod error;
pub mod events;
mod logging;
mod manager;
mod reply;
pub mod request;
mod route;
pub mod scheme;
pub mod session;
mod subject;
pub mod view;

pub use authc::{AuthenticationInfo, AuthenticationToken, Principal};
pub use authz::{AuthorizationInfo, Permission};
pub use config::{Components, SecurityConfig};
pub use context::Context;
pub use credential::Credential;
pub use dispatch::{AuthDispatcher, AuthOutcome, Flow, FIELD_RETURN_TARGET, KEY_AUTHC_INFO};
pub use error::{Error, HookError, Result};
pub use logging::RequestLog;
pub use manager::SecurityManager;
pub use reply::Reply;
pub use request::{PooledRequest, RawRequest, Request, RequestPool};
pub use route::{Route, ANONYMOUS};
pub use scheme::{
    AuthScheme, Authenticator, Authorizer, BasicAuth, FormAuth, PasswordEncoder, Scheme, TokenAuth,
};
pub use session::{MemoryStore, Session, SessionManager, StoreRegistry, Storer};
pub use subject::Subject;
pub use view::ViewArgs;
