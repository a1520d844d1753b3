//! Expense Tracker is a web app that links bank accounts through Plaid and
//! collects the transactions Plaid reports for them.
//!
//! This library provides the HTML pages for registration, log-in and the
//! dashboard, a JSON API for linking bank accounts, and the webhook that
//! ingests transactions pushed by the aggregator.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod aggregator;
mod api_error;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod plaid_item;
mod routing;
mod status;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use aggregator::{
    AggregatorClient, AggregatorError, LinkTokenRequest, LinkTokenResponse, PlaidClient,
    PlaidConfig, PlaidEnvironment, PublicTokenExchange,
};
pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword};
pub use config::AppConfig;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The auth cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth cookie or bearer token could not be decoded, or it has expired.
    #[error("the session token is invalid or has expired")]
    InvalidToken,

    /// The username is empty or too long.
    #[error("{0}")]
    InvalidUsername(String),

    /// The email address is not a valid address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is already registered to another user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// The email address is already registered to another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The aggregator item has already been linked.
    ///
    /// Item IDs are unique across all users, so exchanging a public token
    /// for an item that is already stored is rejected instead of creating
    /// a second owner for the same bank connection.
    #[error("the item has already been linked")]
    DuplicateItemId,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// A bearer token could not be signed.
    #[error("could not create a bearer token: {0}")]
    TokenCreation(String),

    /// A secret in the configuration is empty or only whitespace.
    ///
    /// The string names the setting, e.g. "webhook_secret".
    #[error("the {0} must not be empty")]
    EmptySecret(&'static str),

    /// The configured token algorithm is unknown or cannot be used with a shared secret.
    #[error("unsupported token algorithm \"{0}\", expected one of HS256, HS384 or HS512")]
    UnsupportedAlgorithm(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("plaid_item.item_id") =>
            {
                Error::DuplicateItemId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use rusqlite::Connection;

    use crate::Error;

    fn unique_violation(table: &str, column: &str) -> rusqlite::Error {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute(
                &format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, {column} TEXT UNIQUE)"),
                (),
            )
            .unwrap();
        connection
            .execute(&format!("INSERT INTO {table} ({column}) VALUES ('a')"), ())
            .unwrap();

        connection
            .execute(&format!("INSERT INTO {table} ({column}) VALUES ('a')"), ())
            .unwrap_err()
    }

    #[test]
    fn maps_unique_username_violation() {
        let error: Error = unique_violation("user", "username").into();

        assert_eq!(error, Error::DuplicateUsername);
    }

    #[test]
    fn maps_unique_email_violation() {
        let error: Error = unique_violation("user", "email").into();

        assert_eq!(error, Error::DuplicateEmail);
    }

    #[test]
    fn maps_unique_item_id_violation() {
        let error: Error = unique_violation("plaid_item", "item_id").into();

        assert_eq!(error, Error::DuplicateItemId);
    }

    #[test]
    fn maps_no_rows_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn keeps_other_unique_violations_as_sql_errors() {
        let error: Error = unique_violation("other", "name").into();

        assert!(matches!(error, Error::SqlError(_)));
    }
}
