use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    aggregator::{AggregatorClient, AggregatorError},
    api_error::ApiError,
    auth::UserID,
    plaid_item::create_plaid_item,
};

const MISSING_PUBLIC_TOKEN_MSG: &str = "Missing public_token";

/// The state needed to exchange public tokens and store the linked item.
#[derive(Debug, Clone)]
pub struct ExchangeState {
    pub aggregator: Arc<dyn AggregatorClient>,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExchangeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            aggregator: state.aggregator.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body sent by the linking widget once the user has linked a bank.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub public_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

/// A route handler that swaps a public token for an access token and stores
/// the item for the current user.
pub async fn exchange_public_token_endpoint(
    State(state): State<ExchangeState>,
    Extension(user_id): Extension<UserID>,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Response {
    let public_token = match body {
        Ok(Json(ExchangeRequest {
            public_token: Some(token),
        })) if !token.trim().is_empty() => token,
        Ok(_) => return ApiError::bad_request(MISSING_PUBLIC_TOKEN_MSG).into_response(),
        Err(rejection) => {
            tracing::debug!("Rejected public token exchange body: {rejection}");
            return ApiError::bad_request(MISSING_PUBLIC_TOKEN_MSG).into_response();
        }
    };

    let exchange = match state.aggregator.exchange_public_token(&public_token).await {
        Ok(exchange) => exchange,
        Err(AggregatorError::Api { error_message, .. }) => {
            tracing::warn!("Aggregator rejected public token for user {user_id}: {error_message}");
            return ApiError::bad_request(error_message).into_response();
        }
        Err(error) => {
            tracing::error!("Could not exchange public token for user {user_id}: {error}");
            return ApiError::internal().into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return ApiError::from(Error::DatabaseLockError).into_response();
        }
    };

    match create_plaid_item(
        user_id,
        &exchange.access_token,
        &exchange.item_id,
        &connection,
    ) {
        Ok(item) => {
            tracing::info!("User {user_id} linked item {}", item.item_id);
            (
                StatusCode::OK,
                Json(ExchangeResponse {
                    access_token: exchange.access_token,
                    item_id: exchange.item_id,
                }),
            )
                .into_response()
        }
        Err(Error::NotFound) => {
            tracing::warn!("User {user_id} no longer exists, rejecting linked item");
            ApiError::unauthorized().into_response()
        }
        Err(error) => ApiError::from(error).into_response(),
    }
}
