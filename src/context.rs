use std::borrow::Borrow;

use crate::logging::RequestLog;
use crate::reply::Reply;
use crate::request::Request;
use crate::route::Route;
use crate::session::Session;
use crate::subject::Subject;

/// Per-request execution context.
///
/// `Context<R>` is the single owner of everything one request touches
/// during authentication: the request wrapper, the matched route, a fresh
/// [`Subject`] holding the session, and the [`Reply`] being built.
///
/// `R` is the request holder. It defaults to an owned [`Request`]; a
/// [`PooledRequest`](crate::PooledRequest) guard works too, so a pooled
/// wrapper returns to its pool only when the context's parts are dropped.
///
/// # Examples
///
/// ```
/// use http::{Method, Uri};
/// use route_auth::{Context, RawRequest, Request, Route, Session};
///
/// let req = Request::populate(RawRequest::new(Method::GET, Uri::from_static("/orders")));
/// let route = Route::new(Method::GET, "/orders", "form_auth");
/// let ctx = Context::new(req, route, Session::new());
///
/// assert!(!ctx.subject().is_authenticated());
/// assert_eq!(ctx.req().path, "/orders");
/// ```
#[derive(Debug)]
pub struct Context<R = Request> {
    request_id: String,
    request: R,
    route: Route,
    subject: Subject,
    reply: Reply,
}

impl<R> Context<R>
where
    R: Borrow<Request>,
{
    /// Creates a context with a random request ID and an anonymous subject
    /// bound to `session`.
    pub fn new(request: R, route: Route, session: Session) -> Self {
        Self::with_request_id(uuid::Uuid::new_v4().to_string(), request, route, session)
    }

    /// Creates a context with an explicit request ID, e.g. one propagated
    /// from an upstream proxy.
    pub fn with_request_id(
        request_id: impl Into<String>,
        request: R,
        route: Route,
        session: Session,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            request,
            route,
            subject: Subject::new(session),
            reply: Reply::new(),
        }
    }

    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Request wrapper.
    pub fn req(&self) -> &Request {
        self.request.borrow()
    }

    /// Matched route.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Identity the request acts as.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Mutable identity.
    pub fn subject_mut(&mut self) -> &mut Subject {
        &mut self.subject
    }

    /// Session owned by this request.
    pub fn session(&self) -> &Session {
        self.subject.session()
    }

    /// Mutable session owned by this request.
    pub fn session_mut(&mut self) -> &mut Session {
        self.subject.session_mut()
    }

    /// Reply being built.
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Mutable reply.
    pub fn reply_mut(&mut self) -> &mut Reply {
        &mut self.reply
    }

    /// Returns a logger tagged with this request's ID.
    ///
    /// ```
    /// # use http::{Method, Uri};
    /// # use route_auth::{Context, RawRequest, Request, Route, Session};
    /// # let req = Request::populate(RawRequest::new(Method::GET, Uri::from_static("/")));
    /// # let ctx = Context::new(req, Route::anonymous(Method::GET, "/"), Session::new());
    /// ctx.log().debug(format_args!("route auth: {}", ctx.route().auth));
    /// ```
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id)
    }

    /// Tears the context down, handing the session back for the single
    /// flush at response time.
    pub fn into_parts(self) -> (R, Session, Reply) {
        (self.request, self.subject.into_session(), self.reply)
    }
}
