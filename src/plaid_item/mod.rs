//! Bank connections linked through the aggregator.

mod core;
mod exchange_endpoint;
mod link_page;
mod link_token_endpoint;
mod list_endpoint;

pub use core::{
    PlaidItem, PlaidItemId, create_plaid_item, create_plaid_item_table, get_plaid_item_by_item_id,
    get_plaid_items_for_user,
};
pub use exchange_endpoint::exchange_public_token_endpoint;
pub use link_page::get_plaid_link_page;
pub use link_token_endpoint::create_link_token_endpoint;
pub use list_endpoint::list_plaid_items_endpoint;
