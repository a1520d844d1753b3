//! The URIs of the pages and API endpoints.

/// The status endpoint.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page that links a bank account through Plaid Link.
pub const PLAID_LINK_VIEW: &str = "/plaid";
/// The route for the registration page and form.
pub const REGISTER_VIEW: &str = "/register";
/// The route for the log-in page and form.
pub const LOG_IN_VIEW: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";

/// The route for creating a Plaid Link token.
pub const CREATE_LINK_TOKEN: &str = "/api/create_link_token";
/// The route for exchanging a Plaid public token for an access token.
pub const EXCHANGE_PUBLIC_TOKEN: &str = "/api/exchange_public_token";
/// The route for listing the current user's linked items.
pub const PLAID_ITEMS_API: &str = "/api/plaid_items";
/// The route for listing the current user's transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route the aggregator posts webhooks to.
pub const WEBHOOK: &str = "/webhook";

/// The route for registering a user through the JSON API.
pub const AUTH_REGISTER: &str = "/auth/register";
/// The route for getting a bearer token through the JSON API.
pub const AUTH_LOG_IN: &str = "/auth/login";
/// Status endpoint for the users API.
pub const USERS_STATUS: &str = "/users/";
/// Status endpoint for the transactions API.
pub const TRANSACTIONS_STATUS: &str = "/transactions/";
