#![allow(missing_docs)]

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rusqlite::Connection;
use sha2::Sha256;

use crate::{
    AppConfig, AppState,
    aggregator::AggregatorClient,
    auth::{PasswordHash, User, Username, create_user},
};

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;
mod stub_aggregator;

pub(crate) use form::{
    assert_form_input, assert_form_submit_button, assert_form_submit_button_with_text,
    assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_document};
pub(crate) use http::{assert_content_type, assert_hx_redirect};
pub(crate) use stub_aggregator::StubAggregator;

pub(crate) const TEST_SECRET_KEY: &str = "42";
pub(crate) const TEST_WEBHOOK_SECRET: &str = "webhook-secret";

/// Insert a user with a placeholder password hash.
pub(crate) fn insert_test_user(username: &str, connection: &Connection) -> User {
    create_user(
        Username::new(username).unwrap(),
        None,
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .unwrap()
}

/// An [AppState] backed by an in-memory database.
pub(crate) fn get_test_app_state(aggregator: Arc<dyn AggregatorClient>) -> AppState {
    AppState::new(
        Connection::open_in_memory().unwrap(),
        &AppConfig::new(TEST_SECRET_KEY, TEST_WEBHOOK_SECRET),
        aggregator,
    )
    .unwrap()
}

/// Compute the `Plaid-Signature` header value for a webhook `body`.
pub(crate) fn sign_webhook_body(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
