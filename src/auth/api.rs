//! JSON endpoints for registering users and issuing bearer tokens.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::{
        TokenIssuer,
        user::{Username, create_user, get_user_by_email},
    },
};

/// The state needed by the JSON auth endpoints.
#[derive(Debug, Clone)]
pub struct ApiAuthState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub token_issuer: TokenIssuer,
}

impl FromRef<AppState> for ApiAuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_issuer: state.token_issuer.clone(),
        }
    }
}

/// An error from the JSON auth endpoints, rendered as `{"detail": message}`.
#[derive(Debug, PartialEq)]
pub struct AuthApiError {
    status: StatusCode,
    detail: String,
}

impl AuthApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn invalid_credentials() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            detail: "Invalid credentials".to_owned(),
        }
    }

    fn internal(error: Error) -> Self {
        tracing::error!("An unexpected error occurred: {error}");

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "Internal server error".to_owned(),
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// The body of a JSON registration request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The body of a JSON log-in request.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
}

/// A bearer token for the JSON API.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Register a user with an email address.
///
/// # Errors
///
/// Responds with `400` and a detail message if the email is invalid or
/// taken, the username is invalid or taken, or the password is too weak.
pub async fn post_api_register(
    State(state): State<ApiAuthState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, AuthApiError> {
    let email = normalize_email(&request.email);
    if !EmailAddress::is_valid(&email) {
        return Err(AuthApiError::bad_request(Error::InvalidEmail(email).to_string()));
    }

    let username = Username::new(&request.username)
        .map_err(|error| AuthApiError::bad_request(error.to_string()))?;
    let password =
        ValidatedPassword::new(&request.password, &[username.as_str(), email.as_str()])
            .map_err(|error| AuthApiError::bad_request(error.to_string()))?;
    let password_hash =
        PasswordHash::new(password, PasswordHash::DEFAULT_COST).map_err(AuthApiError::internal)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| AuthApiError::internal(Error::DatabaseLockError))?;

    if get_user_by_email(&email, &connection)
        .map_err(AuthApiError::internal)?
        .is_some()
    {
        return Err(AuthApiError::bad_request("Email already registered"));
    }

    match create_user(username, Some(&email), password_hash, &connection) {
        Ok(user) => {
            tracing::info!("Registered user {} through the JSON API", user.id);

            Ok(Json(json!({ "message": "User registered successfully" })))
        }
        Err(Error::DuplicateEmail) => Err(AuthApiError::bad_request("Email already registered")),
        Err(Error::DuplicateUsername) => {
            Err(AuthApiError::bad_request("Username already registered"))
        }
        Err(error) => Err(AuthApiError::internal(error)),
    }
}

/// Email addresses are stored and looked up trimmed and in lower case.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Exchange an email and password for a bearer token.
///
/// # Errors
///
/// Responds with `401` if the email is unknown or the password is wrong.
pub async fn post_api_log_in(
    State(state): State<ApiAuthState>,
    Json(request): Json<LogInRequest>,
) -> Result<Json<TokenResponse>, AuthApiError> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| AuthApiError::internal(Error::DatabaseLockError))?;

        get_user_by_email(&normalize_email(&request.email), &connection)
            .map_err(AuthApiError::internal)?
    };

    let user = user.ok_or_else(AuthApiError::invalid_credentials)?;

    let is_password_valid = user
        .password_hash
        .verify(&request.password)
        .map_err(|error| AuthApiError::internal(Error::HashingError(error.to_string())))?;

    if !is_password_valid {
        return Err(AuthApiError::invalid_credentials());
    }

    let access_token = state
        .token_issuer
        .issue(user.id)
        .map_err(AuthApiError::internal)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_owned(),
    }))
}
