use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, api_error::ApiError, auth::UserID, plaid_item::get_plaid_items_for_user,
};

/// The state needed to list linked items.
#[derive(Debug, Clone)]
pub struct ListPlaidItemsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListPlaidItemsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the items linked by the current user.
pub async fn list_plaid_items_endpoint(
    State(state): State<ListPlaidItemsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return ApiError::from(Error::DatabaseLockError).into_response();
        }
    };

    match get_plaid_items_for_user(user_id, &connection) {
        Ok(items) => Json(items).into_response(),
        Err(error) => ApiError::from(error).into_response(),
    }
}
