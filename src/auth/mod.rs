//! User accounts, browser sessions and bearer tokens.

mod api;
mod bearer;
mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register_user;
mod user;

pub use api::{post_api_log_in, post_api_register};
pub use bearer::TokenIssuer;
pub use cookie::DEFAULT_COOKIE_DURATION;
pub(crate) use cookie::invalidate_auth_cookie;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{api_auth_guard, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::{get_register_page, register_user};
pub use user::{User, UserID, create_user_table, get_user_by_id};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, set_auth_cookie};
#[cfg(test)]
pub(crate) use user::{Username, create_user};

#[cfg(test)]
pub use middleware::AuthState;
