//! End-to-end dispatch flows: anonymous and unresolved routes, form login,
//! stateless challenge schemes, session caching and event hooks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::{Method, StatusCode, Uri};
use route_auth::events::{AuthEventKind, EventTrail};
use route_auth::{
    AuthDispatcher, AuthOutcome, AuthenticationInfo, AuthenticationToken, Authenticator,
    AuthorizationInfo, Authorizer, BasicAuth, Components, Context, Error, Flow, FormAuth,
    HookError, MemoryStore, PasswordEncoder, Principal, RawRequest, Request, Route,
    SecurityConfig, SecurityManager, Session, SessionManager, StoreRegistry, Storer, TokenAuth,
    KEY_AUTHC_INFO,
};

/// Identity backend keyed by username, or by token for opaque tokens.
struct Directory {
    users: HashMap<String, (String, Vec<String>)>,
    lookups: AtomicUsize,
    offline: AtomicBool,
}

impl Directory {
    fn new() -> Arc<Self> {
        let mut users = HashMap::new();
        users.insert(
            "alice".to_string(),
            ("wonderland".to_string(), vec!["admin".to_string()]),
        );
        users.insert(
            "svc-token-1".to_string(),
            (String::new(), vec!["service".to_string()]),
        );
        Arc::new(Self {
            users,
            lookups: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        })
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Authenticator for Directory {
    fn authentication_info(
        &self,
        token: &AuthenticationToken,
    ) -> route_auth::Result<Option<AuthenticationInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Backend("directory offline".to_string()));
        }
        let key = if token.identity.is_empty() {
            token.credential.expose_str().unwrap_or_default()
        } else {
            token.identity.as_str()
        };
        Ok(self.users.get(key).map(|(password, _)| {
            AuthenticationInfo::new(Principal::new("directory", "username", key), password.as_str())
        }))
    }
}

impl Authorizer for Directory {
    fn authorization_info(&self, info: &AuthenticationInfo) -> AuthorizationInfo {
        let roles = info
            .primary_principal()
            .and_then(|p| self.users.get(&p.value))
            .map(|(_, roles)| roles.clone())
            .unwrap_or_default();
        AuthorizationInfo::new()
            .add_role(roles)
            .add_permission_str(["orders:read"])
    }
}

struct PlainText;

impl PasswordEncoder for PlainText {
    fn compare(&self, hash: &[u8], password: &[u8]) -> bool {
        hash == password
    }
}

struct Fixture {
    manager: SecurityManager,
    directory: Arc<Directory>,
    trail: Arc<EventTrail>,
}

/// Log output for a failing test: `RUST_LOG=route_auth=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture(configure_form: impl FnOnce(&mut FormAuth)) -> Fixture {
    init_tracing();
    let directory = Directory::new();
    let mut manager = SecurityManager::new(SessionManager::in_memory());

    let mut form = FormAuth::new(
        "form_auth",
        directory.clone(),
        directory.clone(),
        Arc::new(PlainText),
    );
    configure_form(&mut form);
    manager.add_auth_scheme(form).unwrap();
    manager
        .add_auth_scheme(
            BasicAuth::new(
                "api_basic",
                directory.clone(),
                directory.clone(),
                Arc::new(PlainText),
            )
            .with_realm("Corp"),
        )
        .unwrap();
    manager
        .add_auth_scheme(TokenAuth::new(
            "api_token",
            directory.clone(),
            directory.clone(),
        ))
        .unwrap();

    let trail = Arc::new(EventTrail::new());
    trail.subscribe(manager.hooks_mut());

    Fixture {
        manager,
        directory,
        trail,
    }
}

fn default_fixture() -> Fixture {
    fixture(|_| {})
}

fn context(raw: RawRequest, route: Route, session: Session) -> Context {
    Context::new(Request::populate(raw), route, session)
}

fn get(uri: &'static str) -> RawRequest {
    RawRequest::new(Method::GET, Uri::from_static(uri))
}

fn login_submit(fields: &[(&str, &str)]) -> RawRequest {
    RawRequest::new(Method::POST, Uri::from_static("/login")).with_form(fields.iter().copied())
}

fn login_route() -> Route {
    Route::new(Method::POST, "/login", "form_auth")
}

fn authenticated_session(cached: Option<serde_json::Value>) -> Session {
    let mut session = Session::new();
    session.is_authenticated = true;
    if let Some(value) = cached {
        session.set(KEY_AUTHC_INFO, &value).unwrap();
    }
    session
}

fn dispatch(fx: &Fixture, ctx: &mut Context) -> route_auth::Result<AuthOutcome> {
    AuthDispatcher::new(&fx.manager).handle_authc_and_authz(ctx)
}

#[test]
fn anonymous_route_continues_without_touching_session() {
    let fx = default_fixture();
    let session = Session::new();
    let before = session.clone();
    let mut ctx = context(get("/about"), Route::anonymous(Method::GET, "/about"), session);

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::ContinueAnonymous);
    assert_eq!(outcome.flow(), Flow::Continue);

    let (_, session, reply) = ctx.into_parts();
    assert_eq!(session, before);
    assert!(!reply.is_done());
    assert!(fx.trail.is_empty());
}

#[test]
fn unresolved_scheme_fails_open() {
    let fx = default_fixture();
    let mut ctx = context(
        get("/reports"),
        Route::new(Method::GET, "/reports", "no_such_scheme"),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::ContinueAnonymous);
    assert!(!ctx.subject().is_authenticated());
    assert!(!ctx.reply().is_done());
    assert_eq!(fx.directory.lookups(), 0);
}

#[test]
fn unauthenticated_request_redirects_to_login_with_return_target() {
    let fx = default_fixture();
    let mut ctx = context(
        get("/orders?page=2"),
        Route::new(Method::GET, "/orders", "form_auth"),
        Session::new(),
    );

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::RedirectToLogin);
    assert_eq!(outcome.flow(), Flow::Stop);
    assert_eq!(ctx.reply().status_code(), StatusCode::FOUND);
    assert_eq!(
        ctx.reply().redirect_url(),
        Some("/login.html?_rt=%2Forders%3Fpage%3D2")
    );
    assert!(ctx.reply().is_done());
    assert!(fx.trail.is_empty());
}

#[test]
fn login_page_redirect_omits_return_target() {
    let fx = default_fixture();
    let mut ctx = context(
        get("/login.html"),
        Route::new(Method::GET, "/login.html", "form_auth"),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToLogin);
    assert_eq!(ctx.reply().redirect_url(), Some("/login.html"));
}

#[test]
fn successful_login_redirects_to_submitted_target() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "wonderland"),
            ("_rt", "/dashboard"),
        ]),
        login_route(),
        Session::new(),
    );

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().redirect_url(), Some("/dashboard"));
    assert!(ctx.subject().is_authenticated());
    assert!(ctx.subject().has_role("admin"));
    assert_eq!(ctx.subject().primary_principal().unwrap().value, "alice");
}

#[test]
fn always_redirect_flag_ignores_submitted_target() {
    let fx = fixture(|form| {
        form.always_redirect_to_default_target = true;
        form.default_target_url = "/home".to_string();
    });
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "wonderland"),
            ("_rt", "/dashboard"),
        ]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().redirect_url(), Some("/home"));
}

#[test]
fn login_without_target_lands_on_default() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[("username", "alice"), ("password", "wonderland")]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().redirect_url(), Some("/"));
}

#[test]
fn failed_login_redirects_to_failure_url_with_target() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "guess"),
            ("_rt", "/dashboard"),
        ]),
        login_route(),
        Session::new(),
    );

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::RedirectToFailure);
    assert_eq!(
        ctx.reply().redirect_url(),
        Some("/login.html?error=true&_rt=%2Fdashboard")
    );
    assert!(!ctx.subject().is_authenticated());
    assert!(!ctx.session().is_key_exists(KEY_AUTHC_INFO));

    let events = fx.trail.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), AuthEventKind::PreAuth);
}

#[test]
fn return_target_with_query_survives_the_login_round_trip() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "guess"),
            ("_rt", "/a?b=1&c=2"),
        ]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToFailure);
    let location = ctx.reply().redirect_url().unwrap().to_string();
    let (_, query) = location.split_once('?').unwrap();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(
        pairs,
        [
            ("error".to_string(), "true".to_string()),
            ("_rt".to_string(), "/a?b=1&c=2".to_string()),
        ]
    );
}

#[test]
fn unusable_return_target_falls_back_to_default() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "wonderland"),
            ("_rt", "/x\r\nSet-Cookie: a=b"),
        ]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().status_code(), StatusCode::FOUND);
    assert_eq!(ctx.reply().redirect_url(), Some("/"));
    assert_eq!(ctx.reply().headers()["location"], "/");
    assert!(ctx.subject().is_authenticated());
}

#[test]
fn failed_login_with_unusable_target_still_has_location() {
    let fx = default_fixture();
    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "guess"),
            ("_rt", "/x\r\nSet-Cookie: a=b"),
        ]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToFailure);
    assert_eq!(
        ctx.reply().headers()["location"],
        "/login.html?error=true&_rt=%2Fx%0D%0ASet-Cookie%3A+a%3Db"
    );
}

#[test]
fn multipart_login_submit_authenticates() {
    let fx = default_fixture();
    let raw = RawRequest::new(Method::POST, Uri::from_static("/login"))
        .with_header("content-type", "multipart/form-data; boundary=----form")
        .with_field("username", "alice")
        .with_field("password", "wonderland")
        .with_field("_rt", "/dashboard");
    let mut ctx = context(raw, login_route(), Session::new());

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().redirect_url(), Some("/dashboard"));
    assert!(ctx.subject().is_authenticated());
    assert!(ctx.session().is_key_exists(KEY_AUTHC_INFO));
}

#[test]
fn unknown_user_and_wrong_password_look_the_same() {
    let fx = default_fixture();
    let mut redirects = Vec::new();
    for (user, password) in [("alice", "guess"), ("mallory", "wonderland")] {
        let mut ctx = context(
            login_submit(&[("username", user), ("password", password)]),
            login_route(),
            Session::new(),
        );
        assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToFailure);
        redirects.push(ctx.reply().redirect_url().map(str::to_string));
    }
    assert_eq!(redirects[0], redirects[1]);
}

#[test]
fn persisted_session_never_contains_credential() {
    let fx = default_fixture();
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(
        login_submit(&[("username", "alice"), ("password", "wonderland")]),
        login_route(),
        Session::new(),
    );
    dispatch(&fx, &mut ctx).unwrap();

    let info = ctx.subject().authentication_info.as_ref().unwrap();
    assert!(info.credential.is_empty());
    assert_eq!(ctx.session().get(KEY_AUTHC_INFO).unwrap()["credential"], serde_json::Value::Null);

    let (_, session, _) = ctx.into_parts();
    store.save(&session).unwrap();
    let loaded = store.load(&session.id).unwrap().unwrap();
    let cached: AuthenticationInfo = loaded.get_as(KEY_AUTHC_INFO).unwrap().unwrap();
    assert!(cached.credential.is_empty());
    assert_eq!(cached.primary_principal().unwrap().value, "alice");

    let raw = serde_json::to_string(&loaded).unwrap();
    assert!(!raw.contains("wonderland"));
}

#[test]
fn authenticated_session_restores_without_reauthenticating() {
    let fx = default_fixture();
    let cached = AuthenticationInfo::new(Principal::new("directory", "username", "alice"), "");
    let session = authenticated_session(Some(serde_json::to_value(&cached).unwrap()));
    let mut ctx = context(
        get("/orders"),
        Route::new(Method::GET, "/orders", "form_auth"),
        session,
    );

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::ContinueAuthenticated);
    assert_eq!(fx.directory.lookups(), 0);
    assert_eq!(ctx.subject().primary_principal().unwrap().value, "alice");
    // Authorization is derived again from the restored identity.
    assert!(ctx.subject().has_role("admin"));
    assert!(ctx.subject().is_permitted("orders:read"));
    assert!(!ctx.reply().is_done());
}

#[test]
fn malformed_cache_continues_without_identity() {
    let fx = default_fixture();
    let session = authenticated_session(Some(serde_json::json!("not an authentication info")));
    let mut ctx = context(
        get("/orders"),
        Route::new(Method::GET, "/orders", "form_auth"),
        session,
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::ContinueAuthenticated);
    assert!(ctx.subject().authentication_info.is_none());
    assert!(ctx.subject().authorization_info.is_none());
    assert!(matches!(
        ctx.session().get_as::<AuthenticationInfo>(KEY_AUTHC_INFO),
        Err(Error::SessionCacheInconsistent { .. })
    ));
}

#[test]
fn basic_failure_sends_realm_challenge() {
    let fx = default_fixture();
    let raw = get("/api/items").with_header(
        "authorization",
        &format!("Basic {}", STANDARD.encode("alice:guess")),
    );
    let mut ctx = context(
        raw,
        Route::new(Method::GET, "/api/items", "api_basic"),
        Session::new(),
    );

    let outcome = dispatch(&fx, &mut ctx).unwrap();
    assert_eq!(outcome, AuthOutcome::Unauthorized);
    assert_eq!(outcome.flow(), Flow::Stop);
    assert_eq!(ctx.reply().status_code(), StatusCode::UNAUTHORIZED);
    let challenge = ctx.reply().headers()["www-authenticate"].to_str().unwrap();
    assert!(challenge.contains(r#"realm="Corp""#));
    assert!(ctx.reply().is_done());
}

#[test]
fn basic_success_continues_without_caching_identity() {
    let fx = default_fixture();
    let raw = get("/api/items").with_header(
        "authorization",
        &format!("Basic {}", STANDARD.encode("alice:wonderland")),
    );
    let mut ctx = context(
        raw,
        Route::new(Method::GET, "/api/items", "api_basic"),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::ContinueAuthenticated);
    assert!(ctx.subject().is_authenticated());
    assert!(ctx.subject().has_role("admin"));
    assert!(ctx
        .subject()
        .authentication_info
        .as_ref()
        .unwrap()
        .credential
        .is_empty());
    assert!(!ctx.session().is_key_exists(KEY_AUTHC_INFO));
    assert!(!ctx.reply().is_done());
}

#[test]
fn token_failure_has_no_challenge_header() {
    let fx = default_fixture();
    let raw = get("/api/jobs").with_header("authorization", "Bearer nope");
    let mut ctx = context(
        raw,
        Route::new(Method::GET, "/api/jobs", "api_token"),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::Unauthorized);
    assert!(ctx.reply().headers().get("www-authenticate").is_none());
}

#[test]
fn token_success() {
    let fx = default_fixture();
    let raw = get("/api/jobs").with_header("authorization", "Bearer svc-token-1");
    let mut ctx = context(
        raw,
        Route::new(Method::GET, "/api/jobs", "api_token"),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::ContinueAuthenticated);
    assert!(ctx.subject().has_role("service"));
}

#[test]
fn backend_failure_is_not_a_failed_login() {
    let fx = default_fixture();
    fx.directory.offline.store(true, Ordering::SeqCst);

    let mut form_ctx = context(
        login_submit(&[("username", "alice"), ("password", "wonderland")]),
        login_route(),
        Session::new(),
    );
    assert!(matches!(dispatch(&fx, &mut form_ctx), Err(Error::Backend(_))));
    assert!(!form_ctx.reply().is_done());

    let raw = get("/api/items").with_header(
        "authorization",
        &format!("Basic {}", STANDARD.encode("alice:wonderland")),
    );
    let mut basic_ctx = context(
        raw,
        Route::new(Method::GET, "/api/items", "api_basic"),
        Session::new(),
    );
    assert!(matches!(dispatch(&fx, &mut basic_ctx), Err(Error::Backend(_))));
    assert!(!basic_ctx.subject().is_authenticated());
}

#[test]
fn hook_failures_do_not_change_outcome() {
    let mut fx = default_fixture();
    fx.manager
        .hooks_mut()
        .on_pre_auth(|_| Err(HookError::new("audit", "sink unavailable")))
        .on_post_auth(|_| panic!("subscriber bug"));

    let mut ctx = context(
        login_submit(&[
            ("username", "alice"),
            ("password", "wonderland"),
            ("_rt", "/dashboard"),
        ]),
        login_route(),
        Session::new(),
    );

    assert_eq!(dispatch(&fx, &mut ctx).unwrap(), AuthOutcome::RedirectToTarget);
    assert_eq!(ctx.reply().redirect_url(), Some("/dashboard"));

    let events = fx.trail.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), AuthEventKind::PreAuth);
    assert!(events[0].principal().is_none());
    assert_eq!(events[1].kind(), AuthEventKind::PostAuth);
    assert_eq!(events[1].principal(), Some("alice"));
    assert_eq!(events[1].scheme(), Some("form_auth"));
    assert_eq!(events[1].request_id(), ctx.request_id());
}

#[test]
fn configured_manager_runs_full_login_cycle() {
    let cfg = SecurityConfig::from_toml(
        r#"
        [session]
        store_type = "memory"

        [auth_schemes.form_auth]
        scheme = "form"
        authenticator = "directory"
        authorizer = "directory"
        password_encoder = "plain"
        "#,
    )
    .unwrap();
    let directory = Directory::new();
    let components = Components::new()
        .with_authenticator("directory", directory.clone())
        .with_authorizer("directory", directory)
        .with_password_encoder("plain", Arc::new(PlainText));
    let manager = SecurityManager::from_config(&cfg, &components, &StoreRegistry::new()).unwrap();
    let dispatcher = AuthDispatcher::new(&manager);
    let sessions = manager.session_manager();

    // Login and flush the session.
    let req = Request::populate(login_submit(&[
        ("username", "alice"),
        ("password", "wonderland"),
    ]));
    let session = sessions.get_session(&req).unwrap();
    let mut ctx = Context::new(req, login_route(), session);
    assert_eq!(
        dispatcher.handle_authc_and_authz(&mut ctx).unwrap(),
        AuthOutcome::RedirectToTarget
    );
    let (_, session, _) = ctx.into_parts();
    sessions.save(&session).unwrap();
    let cookie = sessions.set_cookie_value(&session);
    let cookie_pair = cookie.split(';').next().unwrap().to_string();

    // The next request carries the cookie and is restored from the store.
    let req = Request::populate(get("/orders").with_header("cookie", &cookie_pair));
    let session = sessions.get_session(&req).unwrap();
    let mut ctx = Context::new(req, Route::new(Method::GET, "/orders", "form_auth"), session);
    assert_eq!(
        dispatcher.handle_authc_and_authz(&mut ctx).unwrap(),
        AuthOutcome::ContinueAuthenticated
    );
    assert_eq!(ctx.subject().primary_principal().unwrap().value, "alice");
}
