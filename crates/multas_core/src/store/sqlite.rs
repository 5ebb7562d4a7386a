//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON objects keyed by `(collection, id)`.
//! - Provide single-field updates and atomic batches via SQLite transactions.
//!
//! # Invariants
//! - `fields` always holds a JSON object.
//! - A batch either commits every update or rolls back entirely.
//! - Read paths reject malformed stored JSON instead of masking it.

use crate::store::{
    merge_fields, Document, Fields, RecordStore, StoreError, StoreResult, WriteBatch,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

/// SQLite document store owning its connection.
///
/// The connection must have been opened through `db::open_db*` so the
/// `documents` table exists.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Inserts a document with a store-assigned id and returns the id.
    ///
    /// Used by seeding and import paths; the scoreboard itself never creates
    /// documents.
    pub fn insert_document(&self, collection: &str, fields: &Fields) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.put_document(collection, &id, fields)?;
        Ok(id)
    }

    /// Inserts or replaces a document under a caller-provided id.
    pub fn put_document(&self, collection: &str, id: &str, fields: &Fields) -> StoreResult<()> {
        let payload = serde_json::to_string(fields)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, fields)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET
                fields = excluded.fields,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![collection, id, payload],
        )?;
        Ok(())
    }

    /// Reads one document by id.
    pub fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|text| parse_fields(id, &text).map(|fields| Document::new(id, fields)))
            .transpose()
    }
}

impl RecordStore for SqliteRecordStore {
    fn fetch_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fields
             FROM documents
             WHERE collection = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut documents = Vec::new();

        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let text: String = row.get("fields")?;
            let fields = parse_fields(&id, &text)?;
            documents.push(Document::new(id, fields));
        }

        Ok(documents)
    }

    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut patch = Fields::new();
        patch.insert(field.to_string(), value);

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        merge_into_document(&tx, collection, id, &patch)?;
        tx.commit()?;
        Ok(())
    }

    fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let started_at = Instant::now();
        let write_count = batch.len();

        let result = commit_in_transaction(&self.conn, &batch);
        match &result {
            Ok(()) => info!(
                "event=batch_commit module=store status=ok backend=sqlite writes={} duration_ms={}",
                write_count,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=batch_commit module=store status=error backend=sqlite writes={} duration_ms={} error={}",
                write_count,
                started_at.elapsed().as_millis(),
                err
            ),
        }

        result
    }
}

// Dropping `tx` on an early return rolls back every update already applied.
fn commit_in_transaction(conn: &Connection, batch: &WriteBatch) -> StoreResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for write in batch.writes() {
        merge_into_document(&tx, &write.collection, &write.id, &write.fields)?;
    }
    tx.commit()?;
    Ok(())
}

fn merge_into_document(
    conn: &Connection,
    collection: &str,
    id: &str,
    patch: &Fields,
) -> StoreResult<()> {
    let current: Option<String> = conn
        .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(text) = current else {
        return Err(StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    };

    let mut fields = parse_fields(id, &text)?;
    merge_fields(&mut fields, patch);
    conn.execute(
        "UPDATE documents
         SET
            fields = ?1,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE collection = ?2 AND id = ?3;",
        params![serde_json::to_string(&fields)?, collection, id],
    )?;
    Ok(())
}

fn parse_fields(id: &str, text: &str) -> StoreResult<Fields> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidData(format!(
            "documents.fields for `{id}` must be a JSON object, got {other}"
        ))),
    }
}
