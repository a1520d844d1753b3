//! The dashboard page with the user's linked banks and their transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{OffsetDateTime, macros::format_description};

use crate::{
    AppState, Error,
    auth::{User, UserID, get_user_by_id, invalidate_auth_cookie},
    endpoints,
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency, link,
    },
    navigation::nav_bar,
    plaid_item::{PlaidItem, get_plaid_items_for_user},
    transaction::{Transaction, get_transactions_for_user},
};

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<DashboardState> for Key {
    fn from_ref(state: &DashboardState) -> Self {
        state.cookie_key.clone()
    }
}

/// Display a page with the user's linked items and transactions.
///
/// A session for a user that no longer exists is cleared and the client is
/// sent to the log-in page.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::warn!("Session names user {user_id} who does not exist, logging out");
            return Ok((
                invalidate_auth_cookie(jar),
                Redirect::to(endpoints::LOG_IN_VIEW),
            )
                .into_response());
        }
        Err(error) => return Err(error),
    };

    let items = get_plaid_items_for_user(user_id, &connection)?;
    let transactions = get_transactions_for_user(user_id, &connection)?;

    Ok(dashboard_view(&user, &items, &transactions).into_response())
}

fn dashboard_view(user: &User, items: &[PlaidItem], transactions: &[Transaction]) -> Markup {
    let content = html!(
        (nav_bar(endpoints::DASHBOARD_VIEW))

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-8"
            {
                h1 class="text-2xl font-bold" { "Welcome, " (user.username.as_str()) }

                section
                {
                    h2 class="text-xl font-semibold mb-4" { "Linked Banks" }

                    @if items.is_empty() {
                        p
                        {
                            "You have not linked a bank yet. "
                            (link(endpoints::PLAID_LINK_VIEW, "Link a bank account"))
                            " to start collecting transactions."
                        }
                    } @else {
                        (items_table(items))
                    }
                }

                section
                {
                    h2 class="text-xl font-semibold mb-4" { "Transactions" }

                    @if transactions.is_empty() {
                        p { "No transactions have been received yet." }
                    } @else {
                        (transactions_table(transactions))
                    }
                }
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| timestamp.date().to_string())
}

fn items_table(items: &[PlaidItem]) -> Markup {
    html!(
        div class="relative overflow-x-auto rounded"
        {
            table id="items" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Item" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Linked" }
                    }
                }

                tbody
                {
                    @for item in items {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (item.item_id) }
                            td class=(TABLE_CELL_STYLE) { (format_timestamp(item.created_at)) }
                        }
                    }
                }
            }
        }
    )
}

fn transactions_table(transactions: &[Transaction]) -> Markup {
    html!(
        div class="relative overflow-x-auto rounded"
        {
            table id="transactions" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE)
                            {
                                @match transaction.date {
                                    Some(date) => { (date) }
                                    None => { "-" }
                                }
                            }
                            td class=(TABLE_CELL_STYLE) { (transaction.description) }
                            td class={(TABLE_CELL_STYLE) " text-right"}
                            {
                                (format_currency(transaction.amount))
                            }
                        }
                    }
                }
            }
        }
    )
}
