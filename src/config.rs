//! Runtime settings that the server binary passes into the library.

use time::Duration;

/// Settings for sessions, bearer tokens and webhook verification.
///
/// The server binary builds this from command line arguments and
/// environment variables, the library never reads the environment itself.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secret used to derive the cookie key and to sign bearer tokens.
    pub secret_key: String,
    /// Shared secret the aggregator uses to sign webhook deliveries.
    pub webhook_secret: String,
    /// The URL the aggregator should send webhooks to for newly linked items.
    pub link_webhook_url: Option<String>,
    /// Name of the algorithm used to sign bearer tokens, e.g. "HS256".
    pub token_algorithm: String,
    /// How long a bearer token stays valid after it is issued.
    pub access_token_duration: Duration,
}

impl AppConfig {
    /// The algorithm used to sign bearer tokens when none is configured.
    pub const DEFAULT_TOKEN_ALGORITHM: &str = "HS256";

    /// The bearer token lifetime when none is configured.
    pub const DEFAULT_ACCESS_TOKEN_DURATION: Duration = Duration::minutes(30);

    /// Create a config with the default token algorithm and lifetime.
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            secret_key: secret_key.to_owned(),
            webhook_secret: webhook_secret.to_owned(),
            link_webhook_url: None,
            token_algorithm: Self::DEFAULT_TOKEN_ALGORITHM.to_owned(),
            access_token_duration: Self::DEFAULT_ACCESS_TOKEN_DURATION,
        }
    }
}
