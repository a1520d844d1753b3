use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

pub type PlaidItemId = i64;

/// A bank connection the user linked through the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaidItem {
    /// The id for the item in the application database.
    pub id: PlaidItemId,
    /// The user that linked the item.
    pub user_id: UserID,
    /// The credential for fetching the item's data from the aggregator.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// The aggregator's id for the item.
    pub item_id: String,
    /// When the item was linked.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn create_plaid_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS plaid_item (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            access_token TEXT NOT NULL,
            item_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_plaid_item_user_id ON plaid_item(user_id)",
        (),
    )?;

    Ok(())
}

fn map_row_to_plaid_item(row: &Row) -> Result<PlaidItem, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let access_token = row.get(2)?;
    let item_id = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(PlaidItem {
        id,
        user_id,
        access_token,
        item_id,
        created_at,
    })
}

/// Store a newly linked item for `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateItemId] if an item with `item_id` is already stored, for any user.
/// - [Error::NotFound] if `user_id` does not belong to a registered user.
/// - [Error::SqlError] if another SQL related error occurred.
pub fn create_plaid_item(
    user_id: UserID,
    access_token: &str,
    item_id: &str,
    connection: &Connection,
) -> Result<PlaidItem, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO plaid_item (user_id, access_token, item_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            (user_id.as_i64(), access_token, item_id, created_at),
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::NotFound
            }
            error => error.into(),
        })?;

    Ok(PlaidItem {
        id: connection.last_insert_rowid(),
        user_id,
        access_token: access_token.to_owned(),
        item_id: item_id.to_owned(),
        created_at,
    })
}

/// Get the items linked by `user_id`, oldest first.
///
/// # Errors
///
/// Returns [Error::SqlError] if the query failed.
pub fn get_plaid_items_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<PlaidItem>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, access_token, item_id, created_at FROM plaid_item
            WHERE user_id = :user_id ORDER BY created_at, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_plaid_item)?
        .map(|maybe_item| maybe_item.map_err(Error::from))
        .collect()
}

/// Find the item with the aggregator's id `item_id`.
///
/// # Errors
///
/// Returns [Error::SqlError] if the query failed.
pub fn get_plaid_item_by_item_id(
    item_id: &str,
    connection: &Connection,
) -> Result<Option<PlaidItem>, Error> {
    connection
        .query_row(
            "SELECT id, user_id, access_token, item_id, created_at FROM plaid_item
            WHERE item_id = :item_id",
            &[(":item_id", &item_id)],
            map_row_to_plaid_item,
        )
        .optional()
        .map_err(Error::from)
}

#[cfg(test)]
mod plaid_item_tests {
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        Error,
        auth::UserID,
        db::initialize,
        test_utils::insert_test_user,
    };

    use super::{create_plaid_item, get_plaid_item_by_item_id, get_plaid_items_for_user};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn create_and_find_item() {
        let connection = get_test_connection();
        let user = insert_test_user("alice", &connection);

        let item = create_plaid_item(user.id, "access-1", "item-1", &connection).unwrap();

        assert_eq!(
            get_plaid_item_by_item_id("item-1", &connection),
            Ok(Some(item))
        );
        assert_eq!(get_plaid_item_by_item_id("item-2", &connection), Ok(None));
    }

    #[test]
    fn create_item_for_unknown_user_is_not_found() {
        let connection = get_test_connection();

        let result = create_plaid_item(UserID::new(42), "access-1", "item-1", &connection);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(get_plaid_item_by_item_id("item-1", &connection), Ok(None));
    }

    #[test]
    fn duplicate_item_id_is_rejected_across_users() {
        let connection = get_test_connection();
        let alice = insert_test_user("alice", &connection);
        let bob = insert_test_user("bob", &connection);
        create_plaid_item(alice.id, "access-1", "item-1", &connection).unwrap();

        let result = create_plaid_item(bob.id, "access-2", "item-1", &connection);

        assert_eq!(result, Err(Error::DuplicateItemId));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let connection = get_test_connection();

        let result = create_plaid_item(UserID::new(42), "access-1", "item-1", &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn listing_is_scoped_to_user() {
        let connection = get_test_connection();
        let alice = insert_test_user("alice", &connection);
        let bob = insert_test_user("bob", &connection);
        let first = create_plaid_item(alice.id, "access-1", "item-1", &connection).unwrap();
        create_plaid_item(bob.id, "access-2", "item-2", &connection).unwrap();
        let second = create_plaid_item(alice.id, "access-3", "item-3", &connection).unwrap();

        let items = get_plaid_items_for_user(alice.id, &connection).unwrap();

        assert_eq!(items, vec![first, second]);
    }

    #[test]
    fn serialized_item_omits_access_token() {
        let connection = get_test_connection();
        let user = insert_test_user("alice", &connection);
        let item = create_plaid_item(user.id, "access-1", "item-1", &connection).unwrap();

        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value.get("access_token"), None);
        assert_eq!(value["item_id"], json!("item-1"));
        assert_eq!(value["user_id"], json!(user.id.as_i64()));
    }
}
