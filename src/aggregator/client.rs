//! The interface between the request handlers and the aggregator.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::UserID;

/// The name shown to users in the account linking widget.
pub const CLIENT_NAME: &str = "Expense Tracker App";

/// The parameters for creating a link token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenRequest {
    /// Identifies the user to the aggregator. Never shared between users.
    pub client_user_id: String,
    /// The application name shown in the linking widget.
    pub client_name: String,
    /// The aggregator products to enable for the item, e.g. "transactions".
    pub products: Vec<String>,
    /// ISO-3166-1 alpha-2 codes of the countries to show institutions from.
    pub country_codes: Vec<String>,
    /// The language of the linking widget.
    pub language: String,
    /// Where the aggregator sends webhooks for items linked with this token.
    pub webhook: Option<String>,
}

impl LinkTokenRequest {
    /// A request for linking a US bank account with transactions for `user_id`.
    pub fn for_user(user_id: UserID, webhook: Option<String>) -> Self {
        Self {
            client_user_id: user_id.to_string(),
            client_name: CLIENT_NAME.to_owned(),
            products: vec!["transactions".to_owned()],
            country_codes: vec!["US".to_owned()],
            language: "en".to_owned(),
            webhook,
        }
    }
}

/// A short-lived token that lets the client open the linking widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    /// The token passed to the linking widget.
    pub link_token: String,
    /// When the token expires, as an RFC 3339 timestamp.
    pub expiration: String,
    /// The aggregator's ID for the request.
    pub request_id: String,
}

/// The durable credentials for a linked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTokenExchange {
    /// The durable credential for reading the item's data.
    pub access_token: String,
    /// The aggregator's ID for the linked item.
    pub item_id: String,
    /// The aggregator's ID for the request.
    pub request_id: String,
}

/// The errors that may occur when calling the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// The aggregator rejected the request.
    #[error("{error_type} ({error_code}): {error_message}")]
    Api {
        /// The HTTP status code of the response.
        status: u16,
        /// The broad category of the error, e.g. "INVALID_INPUT".
        error_type: String,
        /// The specific error, e.g. "INVALID_PUBLIC_TOKEN".
        error_code: String,
        /// A developer-facing description of the error.
        error_message: String,
        /// The aggregator's ID for the failed request.
        request_id: Option<String>,
    },

    /// The request could not be sent or the response could not be read.
    #[error("could not reach the aggregator: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("could not decode the aggregator response: {0}")]
    Decode(String),
}

/// Creates link tokens and exchanges public tokens with the aggregator.
#[async_trait]
pub trait AggregatorClient: Debug + Send + Sync {
    /// Create a link token for opening the linking widget.
    async fn create_link_token(
        &self,
        request: LinkTokenRequest,
    ) -> Result<LinkTokenResponse, AggregatorError>;

    /// Exchange the public token from the linking widget for an access token and item ID.
    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, AggregatorError>;
}
