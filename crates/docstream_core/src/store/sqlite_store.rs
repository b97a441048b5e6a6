//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON text, one row per `(collection, _id)`.
//! - Evaluate `_id` filters in SQL and path filters over decoded bodies.
//!
//! # Invariants
//! - Upserts keep the row's `seq`, so scans return first-insert order.
//! - Connections must be migrated to `latest_version()` before use.
//! - Stored bodies always carry the `_id` they are keyed under.
//! - Bodies are read back at any nesting depth they were saved with.

use super::{
    resolve_document_id, with_document_id, DocumentCursor, DocumentStore, Filter, StoreError,
    StoreResult,
};
use crate::config::{StoreConfig, StoreLocation};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::document::Document;
use log::{debug, error, info};
use rusqlite::{params, Connection, Params};
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::time::Instant;

const SELECT_BY_ID_SQL: &str = "SELECT body
FROM documents
WHERE collection = ?1 AND doc_id = ?2
ORDER BY seq ASC;";

const SELECT_COLLECTION_SQL: &str = "SELECT body
FROM documents
WHERE collection = ?1
ORDER BY seq ASC;";

const UPSERT_SQL: &str = "INSERT INTO documents (collection, doc_id, body)
VALUES (?1, ?2, ?3)
ON CONFLICT (collection, doc_id) DO UPDATE SET
    body = excluded.body,
    updated_at = (strftime('%s', 'now') * 1000);";

/// Document store over one collection of a SQLite database.
pub struct SqliteDocumentStore {
    conn: RefCell<Option<Connection>>,
    collection: String,
}

impl SqliteDocumentStore {
    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not current.
    pub fn try_new(conn: Connection, collection: impl Into<String>) -> StoreResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        Ok(Self {
            conn: RefCell::new(Some(conn)),
            collection: collection.into(),
        })
    }

    /// Opens the database described by `config` and binds its collection.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = match &config.location {
            StoreLocation::Memory => open_db_in_memory()?,
            StoreLocation::File(path) => open_db(path)?,
        };
        Self::try_new(conn, config.collection.as_str())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_closed(&self) -> bool {
        self.conn.borrow().is_none()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn find(&self, filter: &Filter) -> StoreResult<DocumentCursor> {
        let started_at = Instant::now();
        let bodies = self.with_conn(|conn| match filter.id_value() {
            Some(id) => query_bodies(conn, SELECT_BY_ID_SQL, params![self.collection, id]),
            None => query_bodies(conn, SELECT_COLLECTION_SQL, params![self.collection]),
        })?;

        let mut matched = Vec::new();
        for body in &bodies {
            let document = parse_body(body)?;
            if filter.matches(&document) {
                matched.push(document);
            }
        }

        debug!(
            "event=store_find module=store status=ok backend=sqlite collection={} path={} scanned={} matched={} duration_ms={}",
            self.collection,
            filter.dotted_path(),
            bodies.len(),
            matched.len(),
            started_at.elapsed().as_millis()
        );
        Ok(DocumentCursor::new(matched))
    }

    fn save(&self, document: &Document) -> StoreResult<String> {
        let started_at = Instant::now();
        let (id, assigned) = resolve_document_id(document)?;
        let body = serde_json::to_string(&with_document_id(document, &id))?;

        let result = self.with_conn(|conn| {
            conn.execute(UPSERT_SQL, params![self.collection, id, body])?;
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(
                    "event=store_save module=store status=ok backend=sqlite collection={} doc_id={} assigned_id={} duration_ms={}",
                    self.collection,
                    id,
                    assigned,
                    started_at.elapsed().as_millis()
                );
                Ok(id)
            }
            Err(err) => {
                error!(
                    "event=store_save module=store status=error backend=sqlite collection={} doc_id={} duration_ms={} error={}",
                    self.collection,
                    id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn close(&self) -> StoreResult<()> {
        let Some(conn) = self.conn.borrow_mut().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| StoreError::from(err))?;
        info!(
            "event=store_close module=store status=ok backend=sqlite collection={}",
            self.collection
        );
        Ok(())
    }
}

fn query_bodies<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut bodies = Vec::new();
    while let Some(row) = rows.next()? {
        bodies.push(row.get::<_, String>(0)?);
    }
    Ok(bodies)
}

/// Parses a stored body without a nesting limit; the stack grows on demand.
fn parse_body(body: &str) -> StoreResult<Document> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;

    match value {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "stored body is not an object: `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_body, SqliteDocumentStore};
    use crate::db::open_db_in_memory;
    use crate::model::document::Document;
    use crate::store::{DocumentStore, Filter, StoreError};
    use rusqlite::Connection;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteDocumentStore::try_new(conn, "records")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn collections_are_isolated() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteDocumentStore::try_new(conn, "left").unwrap();
        store.save(&doc(json!({ "_id": "1", "data": [] }))).unwrap();

        assert_eq!(store.find(&Filter::by_id("1")).unwrap().len(), 1);

        let conn = store.conn.borrow_mut().take().unwrap();
        let other = SqliteDocumentStore::try_new(conn, "right").unwrap();
        assert_eq!(other.find(&Filter::by_id("1")).unwrap().len(), 0);
    }

    #[test]
    fn non_string_identifier_is_rejected() {
        let store = SqliteDocumentStore::try_new(open_db_in_memory().unwrap(), "records").unwrap();
        let err = store
            .save(&doc(json!({ "_id": 42, "data": [] })))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn corrupt_body_is_reported_on_find() {
        let store = SqliteDocumentStore::try_new(open_db_in_memory().unwrap(), "records").unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO documents (collection, doc_id, body) VALUES ('records', 'x', '[1]');",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let err = store.find(&Filter::by_path("data.#a", "v")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn parse_body_reads_bodies_nested_past_default_recursion_limit() {
        let depth = 300;
        let body = format!(
            "{{\"_id\":\"deep\",\"data\":{}\"leaf\"{}}}",
            "[{\"#x\":".repeat(depth),
            "}]".repeat(depth)
        );

        let document = parse_body(&body).unwrap();
        let mut level = &document["data"];
        for _ in 0..depth {
            level = &level[0]["#x"];
        }
        assert_eq!(level, "leaf");
    }

    #[test]
    fn parse_body_rejects_trailing_content() {
        assert!(matches!(
            parse_body("{\"_id\":\"1\",\"data\":[]} extra"),
            Err(StoreError::Json(_))
        ));
    }
}
