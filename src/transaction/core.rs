//! Defines the transaction model and its database queries.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{Error, auth::UserID, plaid_item::PlaidItemId};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A transaction the aggregator reported for a linked item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction in the application database.
    pub id: i64,
    /// The linked item the transaction belongs to.
    pub plaid_item_id: PlaidItemId,
    /// The aggregator's ID for the transaction.
    pub transaction_id: String,
    /// The amount of money that moved in the transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened, if the aggregator said so.
    #[serde(with = "iso_date::option")]
    pub date: Option<Date>,
    /// When the transaction was received.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The fields of a transaction that come from the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub amount: f64,
    pub description: String,
    pub date: Option<Date>,
}

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                plaid_item_id INTEGER NOT NULL,
                transaction_id TEXT NOT NULL,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                date TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(plaid_item_id, transaction_id),
                FOREIGN KEY(plaid_item_id) REFERENCES plaid_item(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        plaid_item_id: row.get(1)?,
        transaction_id: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Store `transaction` for the item `plaid_item_id` unless the item already has a
/// transaction with the same aggregator ID.
///
/// Returns `true` if a row was written.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error, e.g. the item does not exist.
pub fn insert_transaction_if_new(
    plaid_item_id: PlaidItemId,
    transaction: &NewTransaction,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_changed = connection.execute(
        "INSERT INTO \"transaction\"
            (plaid_item_id, transaction_id, amount, description, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(plaid_item_id, transaction_id) DO NOTHING",
        (
            plaid_item_id,
            &transaction.transaction_id,
            transaction.amount,
            &transaction.description,
            transaction.date,
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(rows_changed == 1)
}

/// Get the transactions of every item linked by `user_id`, newest first.
///
/// Transactions without a date come last.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn get_transactions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.plaid_item_id, t.transaction_id, t.amount, t.description, t.date, t.created_at
            FROM \"transaction\" t
            INNER JOIN plaid_item p ON p.id = t.plaid_item_id
            WHERE p.user_id = :user_id
            ORDER BY t.date IS NULL, t.date DESC, t.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod transaction_core_tests {
    use rusqlite::Connection;
    use serde_json::json;
    use time::macros::date;

    use crate::{
        db::initialize,
        plaid_item::{PlaidItem, create_plaid_item},
        test_utils::insert_test_user,
    };

    use super::{NewTransaction, get_transactions_for_user, insert_transaction_if_new};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn insert_item(username: &str, item_id: &str, connection: &Connection) -> PlaidItem {
        let user = insert_test_user(username, connection);
        create_plaid_item(user.id, "access", item_id, connection).unwrap()
    }

    fn coffee(transaction_id: &str) -> NewTransaction {
        NewTransaction {
            transaction_id: transaction_id.to_owned(),
            amount: 4.5,
            description: "Coffee".to_owned(),
            date: Some(date!(2025 - 03 - 14)),
        }
    }

    #[test]
    fn replayed_transaction_is_not_duplicated() {
        let connection = get_test_connection();
        let item = insert_item("alice", "item-1", &connection);

        let first = insert_transaction_if_new(item.id, &coffee("txn-1"), &connection).unwrap();
        let second = insert_transaction_if_new(item.id, &coffee("txn-1"), &connection).unwrap();

        assert!(first);
        assert!(!second);
        let transactions = get_transactions_for_user(item.user_id, &connection).unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[test]
    fn same_transaction_id_is_allowed_on_different_items() {
        let connection = get_test_connection();
        let first_item = insert_item("alice", "item-1", &connection);
        let second_item = insert_item("bob", "item-2", &connection);

        assert!(insert_transaction_if_new(first_item.id, &coffee("txn-1"), &connection).unwrap());
        assert!(insert_transaction_if_new(second_item.id, &coffee("txn-1"), &connection).unwrap());
    }

    #[test]
    fn unknown_item_is_rejected() {
        let connection = get_test_connection();

        let result = insert_transaction_if_new(42, &coffee("txn-1"), &connection);

        assert!(result.is_err());
    }

    #[test]
    fn listing_is_scoped_to_user_and_sorted_by_date() {
        let connection = get_test_connection();
        let item = insert_item("alice", "item-1", &connection);
        let other_item = insert_item("bob", "item-2", &connection);
        let undated = NewTransaction {
            date: None,
            ..coffee("txn-undated")
        };
        let older = NewTransaction {
            date: Some(date!(2025 - 01 - 01)),
            ..coffee("txn-older")
        };
        insert_transaction_if_new(item.id, &undated, &connection).unwrap();
        insert_transaction_if_new(item.id, &older, &connection).unwrap();
        insert_transaction_if_new(item.id, &coffee("txn-newer"), &connection).unwrap();
        insert_transaction_if_new(other_item.id, &coffee("txn-bob"), &connection).unwrap();

        let transactions = get_transactions_for_user(item.user_id, &connection).unwrap();

        let ids: Vec<_> = transactions
            .iter()
            .map(|transaction| transaction.transaction_id.as_str())
            .collect();
        assert_eq!(ids, vec!["txn-newer", "txn-older", "txn-undated"]);
    }

    #[test]
    fn serializes_date_as_iso_string() {
        let connection = get_test_connection();
        let item = insert_item("alice", "item-1", &connection);
        insert_transaction_if_new(item.id, &coffee("txn-1"), &connection).unwrap();
        let transaction = get_transactions_for_user(item.user_id, &connection)
            .unwrap()
            .remove(0);

        let value = serde_json::to_value(&transaction).unwrap();

        assert_eq!(value["date"], json!("2025-03-14"));
        assert_eq!(value["plaid_item_id"], json!(item.id));
        assert_eq!(value["description"], json!("Coffee"));
    }
}
