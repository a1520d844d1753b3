//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, auth::create_user_table, plaid_item::create_plaid_item_table,
    transaction::create_transaction_table,
};

/// Create the tables for users, linked items and transactions.
///
/// Foreign key enforcement is switched on for `connection` since deleting a
/// user must cascade to their linked items and transactions. The tables are
/// created inside a single exclusive transaction, so a failure leaves the
/// database untouched.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_plaid_item_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
