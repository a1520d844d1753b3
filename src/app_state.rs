//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    AppConfig, Error,
    aggregator::AggregatorClient,
    auth::{DEFAULT_COOKIE_DURATION, TokenIssuer},
    db::initialize,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The client for the financial-data aggregator.
    pub aggregator: Arc<dyn AggregatorClient>,

    /// Signs and verifies bearer tokens for the JSON API.
    pub token_issuer: TokenIssuer,

    /// The shared secret used to verify webhook signatures.
    pub webhook_secret: Arc<str>,

    /// The URL passed to the aggregator for webhooks about newly linked items.
    pub link_webhook_url: Option<String>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the secret key or webhook secret is blank, if the
    /// database cannot be initialized or if the configured token algorithm
    /// is not supported.
    pub fn new(
        db_connection: Connection,
        config: &AppConfig,
        aggregator: Arc<dyn AggregatorClient>,
    ) -> Result<Self, Error> {
        ensure_not_blank("secret_key", &config.secret_key)?;
        ensure_not_blank("webhook_secret", &config.webhook_secret)?;

        initialize(&db_connection)?;

        let token_issuer = TokenIssuer::new(
            &config.secret_key,
            &config.token_algorithm,
            config.access_token_duration,
        )?;

        Ok(Self {
            cookie_key: create_cookie_key(&config.secret_key),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(db_connection)),
            aggregator,
            token_issuer,
            webhook_secret: Arc::from(config.webhook_secret.as_str()),
            link_webhook_url: config.link_webhook_url.clone(),
        })
    }
}

fn ensure_not_blank(name: &'static str, secret: &str) -> Result<(), Error> {
    if secret.trim().is_empty() {
        return Err(Error::EmptySecret(name));
    }

    Ok(())
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

#[cfg(test)]
mod app_state_tests {
    use std::sync::Arc;

    use rusqlite::Connection;

    use crate::{AppConfig, AppState, Error, test_utils::StubAggregator};

    #[test]
    fn new_initializes_database() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            &AppConfig::new("foobar", "webhooksecret"),
            Arc::new(StubAggregator::new()),
        )
        .unwrap();

        let connection = state.db_connection.lock().unwrap();
        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                AND name IN ('user', 'plaid_item', 'transaction')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn new_rejects_unsupported_token_algorithm() {
        let mut config = AppConfig::new("foobar", "webhooksecret");
        config.token_algorithm = "RS256".to_owned();

        let result = AppState::new(
            Connection::open_in_memory().unwrap(),
            &config,
            Arc::new(StubAggregator::new()),
        );

        assert_eq!(
            result.err(),
            Some(Error::UnsupportedAlgorithm("RS256".to_owned()))
        );
    }

    #[test]
    fn new_rejects_empty_webhook_secret() {
        for webhook_secret in ["", "   "] {
            let result = AppState::new(
                Connection::open_in_memory().unwrap(),
                &AppConfig::new("foobar", webhook_secret),
                Arc::new(StubAggregator::new()),
            );

            assert_eq!(
                result.err(),
                Some(Error::EmptySecret("webhook_secret")),
                "accepted {webhook_secret:?}"
            );
        }
    }

    #[test]
    fn new_rejects_empty_secret_key() {
        for secret_key in ["", "\t\n"] {
            let result = AppState::new(
                Connection::open_in_memory().unwrap(),
                &AppConfig::new(secret_key, "webhooksecret"),
                Arc::new(StubAggregator::new()),
            );

            assert_eq!(
                result.err(),
                Some(Error::EmptySecret("secret_key")),
                "accepted {secret_key:?}"
            );
        }
    }
}
