//! A client for the Plaid HTTP API.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::aggregator::{
    AggregatorClient, AggregatorError, LinkTokenRequest, LinkTokenResponse, PublicTokenExchange,
};

/// How long to wait for Plaid before giving up on a request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The Plaid deployment to send requests to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PlaidEnvironment {
    /// Test institutions and fake credentials.
    #[default]
    Sandbox,
    /// Real institutions with a limited number of items.
    Development,
    /// Real institutions.
    Production,
}

impl PlaidEnvironment {
    /// The API host for the environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

/// The credentials and environment for the Plaid API.
#[derive(Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
}

impl Debug for PlaidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"********")
            .field("environment", &self.environment)
            .finish()
    }
}

/// Calls Plaid's link token and public token exchange endpoints.
#[derive(Debug)]
pub struct PlaidClient {
    http: reqwest::Client,
    config: PlaidConfig,
    base_url: String,
}

impl PlaidClient {
    /// Create a client for the environment in `config`.
    ///
    /// # Errors
    ///
    /// Returns [AggregatorError::Transport] if the HTTP client could not be built.
    pub fn new(config: PlaidConfig) -> Result<Self, AggregatorError> {
        let base_url = config.environment.base_url().to_owned();

        Self::with_base_url(config, &base_url)
    }

    /// Create a client that sends requests to `base_url` instead of the environment's host.
    ///
    /// # Errors
    ///
    /// Returns [AggregatorError::Transport] if the HTTP client could not be built.
    pub fn with_base_url(config: PlaidConfig, base_url: &str) -> Result<Self, AggregatorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: B) -> Result<R, AggregatorError>
    where
        B: Serialize + Send,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let body = Authenticated {
            client_id: &self.config.client_id,
            secret: &self.config.secret,
            body,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .inspect_err(|err| tracing::error!("error occurred in request to {url}: {err}"))?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let error: PlaidErrorBody = serde_json::from_slice(&bytes).map_err(|err| {
                AggregatorError::Decode(format!("{status} response from {path}: {err}"))
            })?;
            tracing::warn!(
                "Plaid rejected request to {path} (request ID {:?}): {} {}",
                error.request_id,
                error.error_type,
                error.error_code
            );

            return Err(AggregatorError::Api {
                status: status.as_u16(),
                error_type: error.error_type,
                error_code: error.error_code,
                error_message: error.error_message,
                request_id: error.request_id,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| AggregatorError::Decode(format!("response from {path}: {err}")))
    }
}

/// A request body with the API credentials added.
#[derive(Serialize)]
struct Authenticated<'a, B> {
    client_id: &'a str,
    secret: &'a str,
    #[serde(flatten)]
    body: B,
}

#[derive(Serialize)]
struct LinkTokenUser<'a> {
    client_user_id: &'a str,
}

#[derive(Serialize)]
struct LinkTokenCreateBody<'a> {
    client_name: &'a str,
    language: &'a str,
    country_codes: &'a [String],
    user: LinkTokenUser<'a>,
    products: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook: Option<&'a str>,
}

#[derive(Serialize)]
struct PublicTokenExchangeBody<'a> {
    public_token: &'a str,
}

#[derive(Deserialize)]
struct PlaidErrorBody {
    error_type: String,
    error_code: String,
    error_message: String,
    #[serde(default)]
    request_id: Option<String>,
}

#[async_trait]
impl AggregatorClient for PlaidClient {
    async fn create_link_token(
        &self,
        request: LinkTokenRequest,
    ) -> Result<LinkTokenResponse, AggregatorError> {
        let body = LinkTokenCreateBody {
            client_name: &request.client_name,
            language: &request.language,
            country_codes: &request.country_codes,
            user: LinkTokenUser {
                client_user_id: &request.client_user_id,
            },
            products: &request.products,
            webhook: request.webhook.as_deref(),
        };

        self.post("/link/token/create", body).await
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, AggregatorError> {
        self.post(
            "/item/public_token/exchange",
            PublicTokenExchangeBody { public_token },
        )
        .await
    }
}
