use std::any::Any;

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

use snipbox::{SESSION_COOKIE_NAME, UserStore, load_session, verify_csrf_token};

use crate::config::{LOGIN_REQUIRED_FLASH, LOGIN_URL};
use crate::session::{AuthState, Session};

/// Largest form body the CSRF middleware will buffer.
const MAX_FORM_BYTES: usize = 1024 * 1024;

fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' fonts.googleapis.com; \
             font-src fonts.gstatic.com; frame-ancestors 'none'",
        ),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
}

/// Static security headers, applied to every response including errors.
pub(crate) async fn secure_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}

/// Converts a handler panic into a plain 500 and closes the connection,
/// mirroring what a crashed worker would force anyway.
///
/// A panic unwinds past `secure_headers`, so the recovery response sets the
/// security headers itself.
pub(crate) fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!("handler panicked: {detail}");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONNECTION, HeaderValue::from_static("close"))],
        "Internal Server Error",
    )
        .into_response();
    apply_security_headers(response.headers_mut());
    response
}

pub(crate) fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name == *SESSION_COOKIE_NAME).then(|| value.to_string())
            })
        })
}

/// Loads the session named by the request cookie (or starts a fresh one),
/// exposes it to downstream layers via extensions, and commits accumulated
/// mutations after the handler runs.
///
/// A load failure is a hard 500: proceeding without session state would turn
/// a storage outage into silent logouts. A commit failure after the handler
/// has produced its response is only logged.
pub(crate) async fn session_manager(mut request: Request, next: Next) -> Response {
    let session = match session_cookie(request.headers()) {
        Some(id) => match load_session(&id).await {
            Ok(Some(data)) => Session::new(Some(id), data),
            Ok(None) => match Session::fresh() {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!("failed to start session: {e}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            },
            Err(e) => {
                tracing::error!("failed to load session: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        None => match Session::fresh() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("failed to start session: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    match session.commit().await {
        Ok(Some(headers)) => {
            for (name, value) in headers.iter() {
                response.headers_mut().append(name, value.clone());
            }
        }
        Ok(None) => {}
        Err(e) => tracing::error!("failed to persist session: {e}"),
    }

    response
}

/// Rejects state-changing requests whose CSRF token does not match the
/// session's, before the handler ever sees them.
///
/// The token is taken from the `X-CSRF-Token` header, or from the
/// `csrf_token` field of a urlencoded form body. The body is buffered and
/// replayed so handlers can still deserialize the form.
pub(crate) async fn csrf_protect(request: Request, next: Next) -> Response {
    if !matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("csrf_protect ran without a session layer");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let expected = session.csrf_token();

    let header_token = request
        .headers()
        .get("x-csrf-token")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let (submitted, request) = match header_token {
        Some(token) => (Some(token), request),
        None => match token_from_form(request).await {
            Ok(pair) => pair,
            Err(response) => return response,
        },
    };

    match submitted {
        Some(token) if verify_csrf_token(&token, &expected) => next.run(request).await,
        _ => (StatusCode::BAD_REQUEST, "CSRF token mismatch").into_response(),
    }
}

/// Buffers a urlencoded body, pulls out `csrf_token`, and rebuilds the
/// request around the buffered bytes.
async fn token_from_form(request: Request) -> Result<(Option<String>, Request), Response> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok((None, request));
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to buffer form body: {e}");
            return Err((StatusCode::BAD_REQUEST, "Bad Request").into_response());
        }
    };

    let token = url::form_urlencoded::parse(&bytes)
        .find(|(name, _)| name == "csrf_token")
        .map(|(_, value)| value.into_owned());

    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

/// Resolves the session's claimed user id against the user store and records
/// the outcome as an [`AuthState`] extension.
///
/// A store failure is a hard 500: guessing `Anonymous` would quietly strip
/// privileges, guessing `Authenticated` would grant them.
pub(crate) async fn authenticate(mut request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("authenticate ran without a session layer");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let state = match session.user_id() {
        Some(user_id) => match UserStore::exists(user_id).await {
            Ok(true) => AuthState::Authenticated(user_id),
            Ok(false) => AuthState::Anonymous,
            Err(e) => {
                tracing::error!("failed to verify user {user_id}: {e}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        None => AuthState::Anonymous,
    };

    request.extensions_mut().insert(state);
    next.run(request).await
}

/// A post-login redirect target is only trusted when it is a same-origin
/// absolute path. A path with two leading slashes is scheme-relative to
/// browsers and would send the user off-site.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// Sends unauthenticated requests to the login page, remembering where they
/// were headed. Authenticated responses are marked uncacheable.
pub(crate) async fn require_authentication(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<AuthState>()
        .copied()
        .unwrap_or(AuthState::Unknown)
        .is_authenticated();

    if !authenticated {
        if let Some(session) = request.extensions().get::<Session>() {
            session.put_flash(LOGIN_REQUIRED_FLASH);
            let path = request.uri().path();
            if is_local_path(path) {
                session.set_redirect_to(path);
            }
        }
        return Redirect::to(&LOGIN_URL).into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!(
                "theme=dark; {}=abc123; lang=en",
                *SESSION_COOKIE_NAME
            ))
            .unwrap(),
        );

        assert_eq!(session_cookie(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_cookie_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);

        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_ignores_name_prefix_match() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}x=abc123", *SESSION_COOKIE_NAME)).unwrap(),
        );
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn test_handle_panic_closes_connection() {
        let response = handle_panic(Box::new("boom".to_string()));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONNECTION),
            Some(&HeaderValue::from_static("close"))
        );
    }

    /// The panic path never passes back through `secure_headers`.
    #[test]
    fn test_handle_panic_sets_security_headers() {
        let response = handle_panic(Box::new("boom"));

        let headers = response.headers();
        assert_eq!(
            headers.get(header::X_FRAME_OPTIONS),
            Some(&HeaderValue::from_static("deny"))
        );
        assert_eq!(
            headers.get(header::X_CONTENT_TYPE_OPTIONS),
            Some(&HeaderValue::from_static("nosniff"))
        );
        assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_some());
    }

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/snippet/create"));
        assert!(is_local_path("/"));

        // Scheme-relative and absolute URLs must not become redirect targets
        assert!(!is_local_path("//evil.example/x"));
        assert!(!is_local_path("https://evil.example/x"));
        assert!(!is_local_path(""));
        assert!(!is_local_path("snippet/create"));
    }
}
