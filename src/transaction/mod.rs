//! Transactions reported by the aggregator for linked items.

mod core;
mod list_endpoint;
mod webhook;

pub use core::{
    NewTransaction, Transaction, create_transaction_table, get_transactions_for_user,
    insert_transaction_if_new,
};
pub use list_endpoint::list_transactions_endpoint;
pub use webhook::webhook_endpoint;
