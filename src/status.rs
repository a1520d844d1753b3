//! Fixed JSON responses that report whether parts of the API are up.

use axum::Json;
use serde_json::{Value, json};

/// The root path '/' reports that the API is running.
pub async fn get_api_status() -> Json<Value> {
    Json(json!({"message": "Expense Tracker API is running"}))
}

pub async fn get_users_status() -> Json<Value> {
    Json(json!({"message": "Users endpoint is working"}))
}

pub async fn get_transactions_status() -> Json<Value> {
    Json(json!({"message": "Transactions endpoint is working"}))
}

#[cfg(test)]
mod status_tests {
    use serde_json::json;

    use super::{get_api_status, get_transactions_status, get_users_status};

    #[tokio::test]
    async fn status_messages() {
        assert_eq!(
            get_api_status().await.0,
            json!({"message": "Expense Tracker API is running"})
        );
        assert_eq!(
            get_users_status().await.0,
            json!({"message": "Users endpoint is working"})
        );
        assert_eq!(
            get_transactions_status().await.0,
            json!({"message": "Transactions endpoint is working"})
        );
    }
}
