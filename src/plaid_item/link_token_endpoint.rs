use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    aggregator::{AggregatorClient, AggregatorError, LinkTokenRequest},
    api_error::ApiError,
    auth::UserID,
};

/// The state needed to create link tokens.
#[derive(Debug, Clone)]
pub struct LinkTokenState {
    pub aggregator: Arc<dyn AggregatorClient>,
    pub link_webhook_url: Option<String>,
}

impl FromRef<AppState> for LinkTokenState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            aggregator: state.aggregator.clone(),
            link_webhook_url: state.link_webhook_url.clone(),
        }
    }
}

/// A route handler that asks the aggregator for a link token for the current user.
///
/// Every failure is reported as `400 Bad Request`.
pub async fn create_link_token_endpoint(
    State(state): State<LinkTokenState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let request = LinkTokenRequest::for_user(user_id, state.link_webhook_url);

    match state.aggregator.create_link_token(request).await {
        Ok(link_token) => Json(link_token).into_response(),
        Err(AggregatorError::Api { error_message, .. }) => {
            tracing::warn!("Aggregator rejected link token request for user {user_id}: {error_message}");
            ApiError::bad_request(error_message).into_response()
        }
        Err(error) => {
            tracing::error!("Could not create link token for user {user_id}: {error}");
            ApiError::bad_request("Could not create a link token").into_response()
        }
    }
}
