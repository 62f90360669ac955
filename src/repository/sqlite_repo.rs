//! SQLite Store Implementation
//!
//! Treats SQLite as a JSON document store: one row per item holding the
//! serialized document plus the columns the contract queries on
//! (partition key, watermark, version).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult, Item};

use super::db;
use super::traits::{ItemStore, Stored};

pub struct SqliteItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteItemStore {
    pub fn open(path: &Path) -> DomainResult<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(db::open(path)?)),
        })
    }

    pub fn open_in_memory() -> DomainResult<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(db::open_in_memory()?)),
        })
    }
}

fn store_err(op: &str, e: rusqlite::Error) -> DomainError {
    DomainError::StoreUnavailable(format!("{}: {}", op, e))
}

fn decode_doc(doc: &str) -> DomainResult<Item> {
    serde_json::from_str(doc).map_err(|e| DomainError::Internal(format!("corrupt document: {}", e)))
}

fn encode_doc(item: &Item) -> DomainResult<String> {
    serde_json::to_string(item).map_err(|e| DomainError::Internal(format!("encode document: {}", e)))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn get(&self, id: &str, owner_id: &str) -> DomainResult<Option<Stored>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT doc, version FROM items WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(|e| store_err("get", e))?;
        match row {
            Some((doc, version)) => Ok(Some(Stored {
                item: decode_doc(&doc)?,
                version: version as u64,
            })),
            None => Ok(None),
        }
    }

    async fn create(&self, item: &Item) -> DomainResult<Item> {
        if item.id.trim().is_empty() || item.owner_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "id and owner_id are required".to_string(),
            ));
        }
        let doc = encode_doc(item)?;
        let conn = self.conn.lock().await;
        let result = conn.execute(
            "INSERT INTO items (id, owner_id, updated_at_ms, version, doc)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                item.id,
                item.owner_id,
                item.updated_at.timestamp_millis(),
                doc
            ],
        );
        match result {
            Ok(_) => {
                debug!("created item {}", item.id);
                Ok(item.clone())
            }
            Err(e) if is_constraint_violation(&e) => {
                Err(DomainError::AlreadyExists(format!("item {}", item.id)))
            }
            Err(e) => Err(store_err("create", e)),
        }
    }

    async fn replace(&self, item: &Item, expected_version: u64) -> DomainResult<Item> {
        let doc = encode_doc(item)?;
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE items SET doc = ?1, updated_at_ms = ?2, version = version + 1
                 WHERE id = ?3 AND owner_id = ?4 AND version = ?5",
                params![
                    doc,
                    item.updated_at.timestamp_millis(),
                    item.id,
                    item.owner_id,
                    expected_version as i64
                ],
            )
            .map_err(|e| store_err("replace", e))?;
        if changed > 0 {
            return Ok(item.clone());
        }
        // Row untouched: either gone or the version moved under us.
        let exists = conn
            .query_row(
                "SELECT version FROM items WHERE id = ?1 AND owner_id = ?2",
                params![item.id, item.owner_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| store_err("replace", e))?;
        match exists {
            Some(version) => Err(DomainError::Conflict(format!(
                "item {} version {} != expected {}",
                item.id, version, expected_version
            ))),
            None => Err(DomainError::NotFound(format!("item {}", item.id))),
        }
    }

    async fn delete(&self, id: &str, owner_id: &str) -> DomainResult<bool> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "DELETE FROM items WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .map_err(|e| store_err("delete", e))?;
        Ok(changed > 0)
    }

    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT doc FROM items WHERE owner_id = ?1")
            .map_err(|e| store_err("list_by_owner", e))?;
        let rows = stmt
            .query_map(params![owner_id], |row| row.get::<_, String>(0))
            .map_err(|e| store_err("list_by_owner", e))?;
        let mut items = Vec::new();
        for doc in rows {
            items.push(decode_doc(&doc.map_err(|e| store_err("list_by_owner", e))?)?);
        }
        Ok(items)
    }

    async fn changed_since(&self, owner_id: &str, since: DateTime<Utc>) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT doc FROM items WHERE owner_id = ?1 AND updated_at_ms > ?2")
            .map_err(|e| store_err("changed_since", e))?;
        let rows = stmt
            .query_map(params![owner_id, since.timestamp_millis()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| store_err("changed_since", e))?;
        let mut items = Vec::new();
        for doc in rows {
            items.push(decode_doc(&doc.map_err(|e| store_err("changed_since", e))?)?);
        }
        Ok(items)
    }
}
