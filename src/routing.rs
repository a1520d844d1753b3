//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::{
        api_auth_guard, auth_guard, get_log_in_page, get_log_out, get_register_page,
        post_api_log_in, post_api_register, post_log_in, register_user,
    },
    dashboard::get_dashboard_page,
    endpoints,
    not_found::get_404_not_found,
    plaid_item::{
        create_link_token_endpoint, exchange_public_token_endpoint, get_plaid_link_page,
        list_plaid_items_endpoint,
    },
    status::{get_api_status, get_transactions_status, get_users_status},
    transaction::{list_transactions_endpoint, webhook_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_api_status))
        .route(
            endpoints::LOG_IN_VIEW,
            get(get_log_in_page).post(post_log_in),
        )
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(
            endpoints::REGISTER_VIEW,
            get(get_register_page).post(register_user),
        )
        .route(endpoints::WEBHOOK, post(webhook_endpoint))
        .route(endpoints::AUTH_REGISTER, post(post_api_register))
        .route(endpoints::AUTH_LOG_IN, post(post_api_log_in))
        .route(endpoints::USERS_STATUS, get(get_users_status))
        .route(endpoints::TRANSACTIONS_STATUS, get(get_transactions_status));

    let protected_pages = Router::new()
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::PLAID_LINK_VIEW, get(get_plaid_link_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // The JSON API answers unauthenticated requests with 401 instead of a redirect.
    let protected_api = Router::new()
        .route(
            endpoints::CREATE_LINK_TOKEN,
            post(create_link_token_endpoint),
        )
        .route(
            endpoints::EXCHANGE_PUBLIC_TOKEN,
            post(exchange_public_token_endpoint),
        )
        .route(endpoints::PLAID_ITEMS_API, get(list_plaid_items_endpoint))
        .route(endpoints::TRANSACTIONS_API, get(list_transactions_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), api_auth_guard));

    protected_pages
        .merge(protected_api)
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}
