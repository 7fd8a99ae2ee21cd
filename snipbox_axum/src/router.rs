use axum::{
    Router,
    handler::Handler,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{
    authenticate, csrf_protect, handle_panic, require_authentication, secure_headers,
    session_manager,
};

/// The full application: liveness probe and fallback outside the session
/// chain, everything else inside it, with the standard chain wrapped around
/// the whole router.
pub fn app_router() -> Router {
    let router = Router::new()
        .route("/ping", get(handlers::ping))
        .merge(session_routes())
        .fallback(handlers::not_found);
    standard_chain(router)
}

/// Wraps `router` in the layers every response passes through. Outermost to
/// innermost at runtime: panic recovery, request tracing, security headers.
pub fn standard_chain(router: Router) -> Router {
    router
        .layer(from_fn(secure_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Routes that carry a session. At runtime each request passes through
/// session load/commit, then CSRF verification, then authentication, before
/// reaching its handler.
pub fn session_routes() -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/snippet/view/{id}", get(handlers::snippet_view))
        .route(
            "/user/signup",
            get(handlers::user_signup_form).post(handlers::user_signup),
        )
        .route(
            "/user/login",
            get(handlers::user_login_form).post(handlers::user_login),
        )
        .merge(protected_routes())
        .layer(from_fn(authenticate))
        .layer(from_fn(csrf_protect))
        .layer(from_fn(session_manager))
}

/// Routes that additionally require an authenticated user. The guard wraps
/// each handler rather than the route, so unmatched paths stay 404 and
/// unmatched methods stay 405 instead of bouncing to the login page.
pub fn protected_routes() -> Router {
    let guard = || from_fn(require_authentication);
    Router::new()
        .route(
            "/snippet/create",
            get(handlers::snippet_create_form.layer(guard()))
                .post(handlers::snippet_create.layer(guard())),
        )
        .route("/user/logout", post(handlers::user_logout.layer(guard())))
        .route(
            "/account/password/update",
            get(handlers::password_update_form.layer(guard()))
                .post(handlers::password_update.layer(guard())),
        )
}
