//! Per-request authentication and authorization dispatch.
//!
//! [`AuthDispatcher::handle_authc_and_authz`] runs once per request after
//! route matching. It resolves the route's auth policy to a [`Scheme`] and
//! runs the flow that scheme requires:
//!
//! ```text
//! anonymous / unresolved ─────────────────────────────> ContinueAnonymous
//! Form:      authenticated session ── restore ────────> ContinueAuthenticated
//!            not the login submit ────────────────────> RedirectToLogin
//!            login submit ── ok ──────────────────────> RedirectToTarget
//!                         └─ AuthenticationFailed ────> RedirectToFailure
//! Stateless: ok ──────────────────────────────────────> ContinueAuthenticated
//!            AuthenticationFailed ────────────────────> Unauthorized
//! ```
//!
//! Every outcome that stops the flow has already been written to the
//! [`Reply`](crate::Reply) and marked done.

use std::borrow::Borrow;

use http::header::{HeaderValue, WWW_AUTHENTICATE};
use http::Method;

use crate::authc::AuthenticationInfo;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::events::{AuthEvent, AuthEventKind};
use crate::manager::SecurityManager;
use crate::request::Request;
use crate::scheme::{AuthScheme, FormAuth, Scheme};

/// Session key the form flow caches the scrubbed authentication info under.
pub const KEY_AUTHC_INFO: &str = "_aahAuthcInfo";

/// Form field carrying the post-login return target.
pub const FIELD_RETURN_TARGET: &str = "_rt";

/// Whether request handling proceeds after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the route handler
    Continue,
    /// The reply is final; stop the pipeline
    Stop,
}

/// Terminal outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No authentication required, or the scheme could not be resolved
    ContinueAnonymous,
    /// The subject is authenticated for this request
    ContinueAuthenticated,
    /// Sent to the form login page
    RedirectToLogin,
    /// Form login failed; sent to the failure page
    RedirectToFailure,
    /// Form login succeeded; sent to the return target
    RedirectToTarget,
    /// Stateless authentication failed
    Unauthorized,
}

impl AuthOutcome {
    /// Binary flow signal for the request pipeline.
    pub fn flow(self) -> Flow {
        match self {
            AuthOutcome::ContinueAnonymous | AuthOutcome::ContinueAuthenticated => Flow::Continue,
            AuthOutcome::RedirectToLogin
            | AuthOutcome::RedirectToFailure
            | AuthOutcome::RedirectToTarget
            | AuthOutcome::Unauthorized => Flow::Stop,
        }
    }
}

/// Runs the auth flow for a request against a [`SecurityManager`].
///
/// The dispatcher holds no state of its own; create one per request or
/// share one across requests.
///
/// # Example
///
/// ```
/// use http::{Method, Uri};
/// use route_auth::{
///     AuthDispatcher, AuthOutcome, Context, Flow, RawRequest, Request, Route,
///     SecurityManager, SessionManager,
/// };
///
/// let manager = SecurityManager::new(SessionManager::in_memory());
/// let req = Request::populate(RawRequest::new(Method::GET, Uri::from_static("/")));
/// let session = manager.session_manager().get_session(&req)?;
/// let mut ctx = Context::new(req, Route::anonymous(Method::GET, "/"), session);
///
/// let outcome = AuthDispatcher::new(&manager).handle_authc_and_authz(&mut ctx)?;
/// assert_eq!(outcome, AuthOutcome::ContinueAnonymous);
/// assert_eq!(outcome.flow(), Flow::Continue);
/// # Ok::<(), route_auth::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthDispatcher<'m> {
    manager: &'m SecurityManager,
}

impl<'m> AuthDispatcher<'m> {
    /// Creates a dispatcher over `manager`.
    pub fn new(manager: &'m SecurityManager) -> Self {
        Self { manager }
    }

    /// Authenticates and authorizes the request held by `ctx`.
    ///
    /// An unresolvable scheme name is treated like `anonymous`.
    ///
    /// # Errors
    ///
    /// Errors other than [`Error::AuthenticationFailed`] raised by the
    /// scheme's backends, and session write failures.
    pub fn handle_authc_and_authz<R>(&self, ctx: &mut Context<R>) -> Result<AuthOutcome>
    where
        R: Borrow<Request>,
    {
        if ctx.route().is_anonymous() {
            ctx.log()
                .debug(format_args!("route auth is anonymous: {}", ctx.req().path));
            return Ok(AuthOutcome::ContinueAnonymous);
        }

        let Some(scheme) = self.manager.get_auth_scheme(&ctx.route().auth) else {
            ctx.log().trace(format_args!(
                "route auth scheme {:?} not found, treating as anonymous: {}",
                ctx.route().auth,
                ctx.req().path
            ));
            return Ok(AuthOutcome::ContinueAnonymous);
        };

        ctx.log()
            .debug(format_args!("route auth scheme: {}", scheme.kind()));
        match scheme {
            Scheme::Form(form) => self.form_flow(form, ctx),
            Scheme::Stateless(scheme) => self.stateless_flow(scheme.as_ref(), ctx),
        }
    }

    fn form_flow<R>(&self, form: &FormAuth, ctx: &mut Context<R>) -> Result<AuthOutcome>
    where
        R: Borrow<Request>,
    {
        if ctx.subject().is_authenticated() {
            restore_authentication(form, ctx);
            return Ok(AuthOutcome::ContinueAuthenticated);
        }

        let is_login_submit =
            ctx.route().path == form.login_submit_url && ctx.req().method == Method::POST;
        if !is_login_submit {
            let login_url = if form.login_url == ctx.req().path {
                form.login_url.clone()
            } else {
                with_return_target(&form.login_url, '?', ctx.req().request_uri())
            };
            ctx.reply_mut().redirect(login_url).done();
            return Ok(AuthOutcome::RedirectToLogin);
        }

        self.publish(AuthEventKind::PreAuth, form.name(), ctx);

        let return_target = ctx
            .req()
            .form_value(FIELD_RETURN_TARGET)
            .unwrap_or_default();
        let token = form.extract_authentication_token(ctx.req());
        let mut info = match form.do_authenticate(&token) {
            Ok(info) => info,
            Err(Error::AuthenticationFailed) => {
                ctx.log().info(format_args!(
                    "authentication failed, sending to login failure URL"
                ));
                ctx.reply_mut()
                    .redirect(with_return_target(
                        &form.login_failure_url,
                        '&',
                        &return_target,
                    ))
                    .done();
                return Ok(AuthOutcome::RedirectToFailure);
            }
            Err(e) => return Err(e),
        };

        let authorization = form.do_authorization_info(&info);
        info.scrub_credential();
        ctx.session_mut().set(KEY_AUTHC_INFO, &info)?;
        ctx.session_mut().is_authenticated = true;
        let subject = ctx.subject_mut();
        subject.authentication_info = Some(info);
        subject.authorization_info = Some(authorization);

        self.publish(AuthEventKind::PostAuth, form.name(), ctx);

        let target = if form.always_redirect_to_default_target || return_target.is_empty() {
            form.default_target_url.clone()
        } else if HeaderValue::from_str(&return_target).is_err() {
            ctx.log().warn(format_args!(
                "return target is not a valid header value, using default target"
            ));
            form.default_target_url.clone()
        } else {
            ctx.log()
                .debug(format_args!("redirect target found: {}", return_target));
            return_target
        };
        ctx.reply_mut().redirect(target).done();
        Ok(AuthOutcome::RedirectToTarget)
    }

    fn stateless_flow<R>(
        &self,
        scheme: &dyn AuthScheme,
        ctx: &mut Context<R>,
    ) -> Result<AuthOutcome>
    where
        R: Borrow<Request>,
    {
        self.publish(AuthEventKind::PreAuth, scheme.name(), ctx);

        let token = scheme.extract_authentication_token(ctx.req());
        let mut info = match scheme.do_authenticate(&token) {
            Ok(info) => info,
            Err(Error::AuthenticationFailed) => {
                ctx.log().info(format_args!("authentication failed"));
                ctx.reply_mut().unauthorized();
                if let Some(challenge) = scheme.challenge() {
                    let set = ctx
                        .reply_mut()
                        .header(WWW_AUTHENTICATE.as_str(), &challenge)
                        .map(|_| ());
                    if let Err(e) = set {
                        ctx.log()
                            .warn(format_args!("challenge header not set: {}", e));
                    }
                }
                ctx.reply_mut().done();
                return Ok(AuthOutcome::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        let authorization = scheme.do_authorization_info(&info);
        info.scrub_credential();
        ctx.session_mut().is_authenticated = true;
        let subject = ctx.subject_mut();
        subject.authentication_info = Some(info);
        subject.authorization_info = Some(authorization);

        self.publish(AuthEventKind::PostAuth, scheme.name(), ctx);
        Ok(AuthOutcome::ContinueAuthenticated)
    }

    fn publish<R>(&self, kind: AuthEventKind, scheme: &str, ctx: &Context<R>)
    where
        R: Borrow<Request>,
    {
        let mut event = AuthEvent::new(ctx.request_id(), kind)
            .with_route(ctx.route().method.as_str(), ctx.route().path.as_str())
            .with_scheme(scheme);
        if kind == AuthEventKind::PostAuth {
            if let Some(principal) = ctx.subject().primary_principal() {
                event = event.with_principal(principal.value.as_str());
            }
        }
        self.manager.hooks().publish(&event);
    }
}

/// Restores the cached identity of an authenticated form session.
///
/// Authorization info is not cached; it is derived again on every request.
/// Appends `_rt=<target>` to `base`, percent-encoding the target.
fn with_return_target(base: &str, separator: char, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}{}{}={}", base, separator, FIELD_RETURN_TARGET, encoded)
}

fn restore_authentication<R>(form: &FormAuth, ctx: &mut Context<R>)
where
    R: Borrow<Request>,
{
    match ctx.session().get_as::<AuthenticationInfo>(KEY_AUTHC_INFO) {
        Ok(Some(info)) => {
            let authorization = form.do_authorization_info(&info);
            let subject = ctx.subject_mut();
            subject.authentication_info = Some(info);
            subject.authorization_info = Some(authorization);
        }
        Ok(None) => ctx.log().warn(format_args!(
            "authenticated session has no cached authentication info"
        )),
        Err(e) => ctx.log().warn(format_args!("{}", e)),
    }
}
