use std::sync::Mutex;

use async_trait::async_trait;

use crate::aggregator::{
    AggregatorClient, AggregatorError, LinkTokenRequest, LinkTokenResponse, PublicTokenExchange,
};

#[derive(Debug, Clone, Copy)]
enum StubFailure {
    Api,
    Decode,
}

/// An aggregator that answers without network access.
#[derive(Debug, Default)]
pub(crate) struct StubAggregator {
    item_id: Option<String>,
    failure: Option<StubFailure>,
    last_link_request: Mutex<Option<LinkTokenRequest>>,
}

impl StubAggregator {
    /// Succeeds, deriving the access token and item ID from the public token.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Succeeds, always returning `item_id` from the exchange.
    pub(crate) fn with_item_id(item_id: &str) -> Self {
        Self {
            item_id: Some(item_id.to_owned()),
            ..Self::default()
        }
    }

    /// Fails every call with an API error.
    pub(crate) fn failing() -> Self {
        Self {
            failure: Some(StubFailure::Api),
            ..Self::default()
        }
    }

    /// Fails every call as if the response could not be decoded.
    pub(crate) fn garbled() -> Self {
        Self {
            failure: Some(StubFailure::Decode),
            ..Self::default()
        }
    }

    /// The most recent link token request.
    pub(crate) fn last_link_request(&self) -> Option<LinkTokenRequest> {
        self.last_link_request.lock().unwrap().clone()
    }

    fn fail(&self) -> Result<(), AggregatorError> {
        match self.failure {
            None => Ok(()),
            Some(StubFailure::Api) => Err(AggregatorError::Api {
                status: 400,
                error_type: "INVALID_INPUT".to_owned(),
                error_code: "INVALID_PUBLIC_TOKEN".to_owned(),
                error_message: "provided public token is in an invalid format".to_owned(),
                request_id: Some("stub-request".to_owned()),
            }),
            Some(StubFailure::Decode) => {
                Err(AggregatorError::Decode("expected value at line 1".to_owned()))
            }
        }
    }
}

#[async_trait]
impl AggregatorClient for StubAggregator {
    async fn create_link_token(
        &self,
        request: LinkTokenRequest,
    ) -> Result<LinkTokenResponse, AggregatorError> {
        let client_user_id = request.client_user_id.clone();
        *self.last_link_request.lock().unwrap() = Some(request);
        self.fail()?;

        Ok(LinkTokenResponse {
            link_token: format!("link-sandbox-{client_user_id}"),
            expiration: "2025-01-01T00:00:00Z".to_owned(),
            request_id: "stub-request".to_owned(),
        })
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, AggregatorError> {
        self.fail()?;

        Ok(PublicTokenExchange {
            access_token: format!("access-{public_token}"),
            item_id: self
                .item_id
                .clone()
                .unwrap_or_else(|| format!("item-{public_token}")),
            request_id: "stub-request".to_owned(),
        })
    }
}
