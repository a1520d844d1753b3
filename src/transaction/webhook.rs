//! Receives transactions pushed by the aggregator.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error,
    api_error::ApiError,
    plaid_item::{PlaidItemId, get_plaid_item_by_item_id},
    transaction::{NewTransaction, insert_transaction_if_new},
};

type HmacSha256 = Hmac<Sha256>;

/// The header holding the hex encoded HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "Plaid-Signature";

/// The state needed to verify and store webhook deliveries.
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub webhook_secret: Arc<str>,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for WebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            webhook_secret: state.webhook_secret.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    item_id: Option<String>,
    #[serde(default)]
    transactions: Vec<WebhookTransaction>,
}

#[derive(Debug, Deserialize)]
struct WebhookTransaction {
    transaction_id: String,
    amount: f64,
    name: String,
    date: Option<String>,
}

impl WebhookTransaction {
    fn into_new_transaction(self) -> NewTransaction {
        let date = self.date.as_deref().and_then(|raw_date| {
            Date::parse(raw_date, format_description!("[year]-[month]-[day]"))
                .inspect_err(|error| {
                    tracing::warn!(
                        "Ignoring invalid date \"{raw_date}\" on transaction {}: {error}",
                        self.transaction_id
                    )
                })
                .ok()
        });

        NewTransaction {
            transaction_id: self.transaction_id,
            amount: self.amount,
            description: self.name,
            date,
        }
    }
}

/// Check `signature` against `body` in constant time.
fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// A route handler for webhook deliveries from the aggregator.
///
/// Each delivered transaction is stored once per item, replays are ignored.
/// A delivery is stored all at once or not at all.
/// Deliveries for unknown items are logged and dropped.
pub async fn webhook_endpoint(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match signature {
        Some(signature) if verify_signature(&state.webhook_secret, &body, signature) => {}
        Some(_) => {
            tracing::warn!("Rejected webhook with an invalid signature");
            return ApiError::new(StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
        }
        None => {
            tracing::warn!("Rejected webhook without a signature");
            return ApiError::new(StatusCode::UNAUTHORIZED, "Missing signature").into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!("Rejected webhook with an invalid body: {error}");
            return ApiError::bad_request("Invalid JSON").into_response();
        }
    };
    tracing::debug!("Received webhook: {payload:?}");

    let Some(item_id) = payload.item_id else {
        tracing::info!("Webhook did not name an item, nothing to store");
        return success();
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return ApiError::from(Error::DatabaseLockError).into_response();
        }
    };

    let item = match get_plaid_item_by_item_id(&item_id, &connection) {
        Ok(Some(item)) => item,
        Ok(None) => {
            tracing::warn!("Ignoring webhook for unknown item {item_id}");
            return success();
        }
        Err(error) => return ApiError::from(error).into_response(),
    };

    let received = payload.transactions.len();
    let stored = match store_transactions(item.id, payload.transactions, &connection) {
        Ok(stored) => stored,
        Err(error) => {
            tracing::error!("Could not store webhook transactions for item {item_id}: {error}");
            return ApiError::from(error).into_response();
        }
    };

    tracing::info!("Stored {stored} of {received} transactions for item {item_id}");

    success()
}

/// Insert the new transactions in one SQL transaction, returning how many were new.
fn store_transactions(
    plaid_item_id: PlaidItemId,
    transactions: Vec<WebhookTransaction>,
    connection: &Connection,
) -> Result<usize, Error> {
    // The MutexGuard only hands out a &Connection.
    let sql_transaction = connection.unchecked_transaction()?;
    let mut stored = 0;

    for transaction in transactions {
        if insert_transaction_if_new(
            plaid_item_id,
            &transaction.into_new_transaction(),
            &sql_transaction,
        )? {
            stored += 1;
        }
    }

    sql_transaction.commit()?;

    Ok(stored)
}

fn success() -> Response {
    (StatusCode::OK, Json(json!({"status": "success"}))).into_response()
}
