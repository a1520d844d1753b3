//! Authentication middleware that validates sessions and bearer tokens, extends sessions, and handles redirects.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    extract::{PrivateCookieJar, cookie::Key},
    headers::{Authorization, authorization::Bearer},
};
use time::Duration;

use crate::{
    AppState,
    api_error::ApiError,
    auth::{
        TokenIssuer, UserID,
        cookie::{COOKIE_TOKEN, extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::build_log_in_redirect_url,
    },
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// Verifies bearer tokens on API routes.
    pub token_issuer: TokenIssuer,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            token_issuer: state.token_issuer.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Run `request` as `user_id` and add the extended session cookie from `jar` to the response.
async fn run_with_session(
    user_id: UserID,
    jar: PrivateCookieJar,
    cookie_duration: Duration,
    mut parts: Parts,
    body: axum::body::Body,
    next: Next,
) -> Response {
    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();

    // The handler replaced the session, e.g. by logging the user out.
    let session_cookie_prefix = format!("{COOKIE_TOKEN}=");
    let handler_set_session = parts
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| {
            value
                .to_str()
                .is_ok_and(|cookie| cookie.starts_with(&session_cookie_prefix))
        });
    if handler_set_session {
        return Response::from_parts(parts, body);
    }

    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), cookie_duration) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware function that checks for a valid session cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request);

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return Redirect::to(&log_in_redirect_url).into_response();
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return Redirect::to(&log_in_redirect_url).into_response(),
    };

    run_with_session(user_id, jar, state.cookie_duration, parts, body, next).await
}

/// Middleware function for the JSON API that accepts a bearer token or a session cookie.
///
/// A request with an `Authorization: Bearer` header is authenticated by the
/// token alone. Otherwise the session cookie is checked and extended like
/// [auth_guard] does. Unauthenticated requests get a `401` JSON error.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn api_auth_guard(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    match TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state).await {
        Ok(TypedHeader(Authorization(bearer))) => {
            return match state.token_issuer.verify(bearer.token()) {
                Ok(user_id) => {
                    parts.extensions.insert(user_id);
                    next.run(Request::from_parts(parts, body)).await
                }
                Err(_) => ApiError::unauthorized().into_response(),
            };
        }
        Err(rejection) if rejection.is_missing() => {}
        Err(rejection) => {
            tracing::debug!("Rejected authorization header: {rejection}");
            return ApiError::unauthorized().into_response();
        }
    }

    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}.");
            return ApiError::unauthorized().into_response();
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return ApiError::unauthorized().into_response(),
    };

    run_with_session(user_id, jar, state.cookie_duration, parts, body, next).await
}
