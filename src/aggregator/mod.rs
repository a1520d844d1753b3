//! The financial-data aggregator that links bank accounts.
//!
//! Handlers only depend on [AggregatorClient]; [PlaidClient] implements it
//! against the Plaid HTTP API.

mod client;
mod plaid;

pub use client::{
    AggregatorClient, AggregatorError, CLIENT_NAME, LinkTokenRequest, LinkTokenResponse,
    PublicTokenExchange,
};
pub use plaid::{PlaidClient, PlaidConfig, PlaidEnvironment};
