//! Reconciliation Engine
//!
//! Applies an ordered batch of client changes against the store, then
//! computes the opposite-direction delta (items changed since the
//! client's watermark that the batch itself did not touch). The batch is
//! processed strictly in order and aborts at the first failure, carrying
//! the partial outbound set with the error so no acknowledged write is
//! ever silently dropped.
//!
//! The store is an injected dependency with an explicit lifecycle: build
//! it at startup, hand it to `SyncEngine::new`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::domain::{
    generate_id, utc_now_secs, DomainError, DomainResult, Item, ItemType, PriorityLabel, Status,
};
use crate::repository::ItemStore;

use super::change::{
    BulkUpdate, ChangeItem, Operation, SyncFailure, SyncRequest, SyncResponse, UserData,
};
use super::recurrence::{apply_status_change, StatusResolution};
use super::wire::FieldMapper;

/// Protocol cap on the bulk-update endpoint.
pub const MAX_BULK_UPDATES: usize = 100;

pub struct SyncEngine {
    store: Arc<dyn ItemStore>,
    mapper: FieldMapper,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            mapper: FieldMapper::default(),
        }
    }

    /// Override the wire mapper, e.g. to extend the value-conversion
    /// allow-list.
    pub fn with_mapper(store: Arc<dyn ItemStore>, mapper: FieldMapper) -> Self {
        Self { store, mapper }
    }

    /// Apply a client batch and return the outbound delta.
    ///
    /// Changes run in the order received. The first failure aborts the
    /// batch; the returned `SyncFailure` carries both the error and the
    /// `server_changes` echoed for changes applied before it.
    pub async fn sync(
        &self,
        owner_id: &str,
        request: SyncRequest,
    ) -> Result<SyncResponse, SyncFailure> {
        let mut server_changes: Vec<ChangeItem> = Vec::new();
        let last_sync = match parse_watermark(&request.client_last_sync) {
            Ok(watermark) => watermark,
            Err(error) => return Err(SyncFailure { error, server_changes }),
        };
        info!(
            "sync for {}: {} changes, watermark {}",
            owner_id,
            request.changes.len(),
            last_sync
        );

        for change in &request.changes {
            if let Err(error) = self.apply_change(owner_id, change, &mut server_changes).await {
                warn!(
                    "sync for {} aborted at {:?} {}: {}",
                    owner_id, change.operation, change.id, error
                );
                return Err(SyncFailure { error, server_changes });
            }
        }

        // Opposite-direction delta, excluding items the batch already echoed.
        let changed = match self.store.changed_since(owner_id, last_sync).await {
            Ok(items) => items,
            Err(error) => return Err(SyncFailure { error, server_changes }),
        };
        let seen: HashSet<String> = server_changes.iter().map(|c| c.id.clone()).collect();
        for item in changed {
            if seen.contains(&item.id) {
                continue;
            }
            match self.outbound(Operation::Update, &item) {
                Ok(change) => server_changes.push(change),
                Err(error) => return Err(SyncFailure { error, server_changes }),
            }
        }

        Ok(SyncResponse {
            server_changes,
            synced_at: utc_now_secs(),
        })
    }

    /// Companion bulk endpoint: merge-style updates, same recurrence
    /// routing as `sync`, hard-capped at [`MAX_BULK_UPDATES`] before any
    /// write happens.
    pub async fn bulk_update(
        &self,
        owner_id: &str,
        updates: Vec<BulkUpdate>,
    ) -> DomainResult<Vec<Item>> {
        if updates.len() > MAX_BULK_UPDATES {
            return Err(DomainError::Validation(format!(
                "maximum batch size is {} items",
                MAX_BULK_UPDATES
            )));
        }
        let mut applied = Vec::with_capacity(updates.len());
        for update in updates {
            if update.id.trim().is_empty() {
                return Err(DomainError::Validation(
                    "item id is required for update operation".to_string(),
                ));
            }
            let now = utc_now_secs();
            let mut fields = update.fields;
            normalize_status(&mut fields)?;
            normalize_priority(&mut fields)?;
            // Bulk payloads carry no envelope type; the stored type stays.
            fields.remove("type");
            fields.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
            applied.push(self.apply_update(owner_id, &update.id, fields, now).await?);
        }
        Ok(applied)
    }

    /// Full-state read: every item for the owner, grouped by type, in
    /// wire form.
    pub async fn snapshot(&self, owner_id: &str) -> DomainResult<UserData> {
        let items = self.store.list_by_owner(owner_id).await?;
        let mut tasks = Vec::new();
        let mut goals = Vec::new();
        let mut categories = Vec::new();
        let mut dashboard = None;
        for item in items {
            let wire = self.mapper.to_wire(&item.to_document()?);
            match item.item_type {
                ItemType::Task => tasks.push(wire),
                ItemType::Goal => goals.push(wire),
                ItemType::Category => categories.push(wire),
                ItemType::Dashboard => dashboard = Some(wire),
            }
        }
        Ok(UserData {
            tasks,
            goals,
            categories,
            dashboard,
            last_synced_at: utc_now_secs(),
        })
    }

    /// Direct single-item creation (the non-sync create path). The
    /// payload is wire-form and must carry `type` and a non-blank
    /// `title`; the id is always generated.
    pub async fn create_item(&self, owner_id: &str, payload: &Value) -> DomainResult<Item> {
        let mut fields = self.ingress_fields(Some(payload));
        let type_str = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::Validation("type is required".to_string()))?;
        let item_type = ItemType::parse(type_str)
            .ok_or_else(|| DomainError::Validation(format!("invalid type {:?}", type_str)))?;
        let blank_title = fields
            .get("title")
            .and_then(Value::as_str)
            .map_or(true, |t| t.trim().is_empty());
        if blank_title {
            return Err(DomainError::Validation("title is required".to_string()));
        }
        normalize_status(&mut fields)?;
        normalize_priority(&mut fields)?;
        // Unprioritized items sit mid-scale, not below "Very Low"
        if !fields.contains_key("priority") {
            fields.insert(
                "priority".to_string(),
                Value::from(PriorityLabel::Medium.score()),
            );
        }
        self.apply_create(owner_id, item_type, "", fields, utc_now_secs())
            .await
    }

    async fn apply_change(
        &self,
        owner_id: &str,
        change: &ChangeItem,
        out: &mut Vec<ChangeItem>,
    ) -> DomainResult<()> {
        let now = utc_now_secs();
        match change.operation {
            Operation::Create => {
                let mut fields = self.ingress_fields(change.data.as_ref());
                normalize_status(&mut fields)?;
                normalize_priority(&mut fields)?;
                let item = self
                    .apply_create(owner_id, change.item_type, &change.id, fields, now)
                    .await?;
                out.push(self.outbound(Operation::Create, &item)?);
            }
            Operation::Update => {
                if change.id.trim().is_empty() {
                    return Err(DomainError::Validation(
                        "item id is required for update operation".to_string(),
                    ));
                }
                let mut fields = self.ingress_fields(change.data.as_ref());
                normalize_status(&mut fields)?;
                normalize_priority(&mut fields)?;
                force_identity(&mut fields, owner_id, change.item_type, now);
                let item = self.apply_update(owner_id, &change.id, fields, now).await?;
                out.push(self.outbound(Operation::Update, &item)?);
            }
            Operation::Delete => {
                if change.id.trim().is_empty() {
                    return Err(DomainError::Validation(
                        "item id is required for delete operation".to_string(),
                    ));
                }
                // Idempotent: deleting an absent id succeeds with no echo.
                if self.store.delete(&change.id, owner_id).await? {
                    out.push(ChangeItem {
                        item_type: change.item_type,
                        operation: Operation::Delete,
                        id: change.id.clone(),
                        data: None,
                        timestamp: Some(now),
                    });
                }
            }
        }
        Ok(())
    }

    async fn apply_create(
        &self,
        owner_id: &str,
        item_type: ItemType,
        client_id: &str,
        mut fields: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> DomainResult<Item> {
        if fields.is_empty() {
            return Err(DomainError::Validation(
                "data is required for create operation".to_string(),
            ));
        }
        force_identity(&mut fields, owner_id, item_type, now);

        let id = if client_id.trim().is_empty() {
            let title = fields.get("title").and_then(Value::as_str).unwrap_or("");
            generate_id(owner_id, title, &now.to_rfc3339(), item_type)?
        } else {
            client_id.trim().to_string()
        };
        fields.insert("id".to_string(), Value::String(id));

        if !fields.contains_key("created_at") {
            fields.insert(
                "created_at".to_string(),
                Value::String(now.to_rfc3339()),
            );
        }
        // dynamic_priority starts at the creation priority when the
        // client does not set it.
        if !fields.contains_key("dynamic_priority") {
            if let Some(priority) = fields.get("priority").cloned() {
                fields.insert("dynamic_priority".to_string(), priority);
            }
        }

        let item = Item::from_document(Value::Object(fields))?;
        let created = self.store.create(&item).await?;
        debug!("created {} {}", created.item_type.as_str(), created.id);
        Ok(created)
    }

    /// Read-merge-replace with an optimistic version check, retried once
    /// on conflict. Completing a recurring task routes through the
    /// rollover instead of the merge.
    async fn apply_update(
        &self,
        owner_id: &str,
        id: &str,
        patch: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> DomainResult<Item> {
        let mut retried = false;
        loop {
            let stored = self
                .store
                .get(id, owner_id)
                .await?
                .ok_or_else(|| DomainError::NotFound(format!("item {}", id)))?;

            let requested = patch
                .get("status")
                .and_then(Value::as_str)
                .and_then(Status::parse);
            let next = match apply_status_change(&stored.item, requested, now) {
                // The rollover supersedes the rest of the patch.
                StatusResolution::RolledOver(rolled) => rolled,
                StatusResolution::Plain => {
                    let mut doc = stored.item.to_document()?;
                    let obj = doc.as_object_mut().ok_or_else(|| {
                        DomainError::Internal("item document is not an object".to_string())
                    })?;
                    for (key, value) in &patch {
                        // id comes from the change envelope; the history
                        // is append-only and only the rollover writes it;
                        // created_at never moves after creation.
                        if key == "id" || key == "completion_history" || key == "created_at" {
                            continue;
                        }
                        obj.insert(key.clone(), value.clone());
                    }
                    let mut item = Item::from_document(doc)?;
                    item.updated_at = now;
                    if item.status == Status::Complete && !item.is_recurring {
                        item.dynamic_priority = 0;
                    }
                    item
                }
            };

            match self.store.replace(&next, stored.version).await {
                Ok(item) => return Ok(item),
                Err(DomainError::Conflict(msg)) if !retried => {
                    debug!("replace conflict on {} ({}), retrying once", id, msg);
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn ingress_fields(&self, data: Option<&Value>) -> Map<String, Value> {
        match data.map(|v| self.mapper.to_internal(v)) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn outbound(&self, operation: Operation, item: &Item) -> DomainResult<ChangeItem> {
        let doc = item.to_document()?;
        Ok(ChangeItem {
            item_type: item.item_type,
            operation,
            id: item.id.clone(),
            data: Some(self.mapper.to_wire(&doc)),
            timestamp: Some(item.updated_at),
        })
    }
}

fn parse_watermark(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::Validation(format!("bad clientLastSync {:?}: {}", raw, e)))
}

/// Owner and type are stamped by the server regardless of client input,
/// so a payload can neither cross partitions nor change an item's type.
fn force_identity(
    fields: &mut Map<String, Value>,
    owner_id: &str,
    item_type: ItemType,
    now: DateTime<Utc>,
) {
    fields.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
    fields.insert(
        "type".to_string(),
        Value::String(item_type.as_str().to_string()),
    );
    fields.insert("updated_at".to_string(), Value::String(now.to_rfc3339()));
}

/// Canonicalize the status field: accepts storage form ("working_on_it")
/// and the display form the bulk endpoint historically accepted
/// ("Working On It").
fn normalize_status(fields: &mut Map<String, Value>) -> DomainResult<()> {
    let Some(value) = fields.get("status") else {
        return Ok(());
    };
    let raw = value.as_str().ok_or_else(|| {
        DomainError::Validation("status must be a string".to_string())
    })?;
    let status = Status::parse(raw)
        .or_else(|| Status::from_display(raw))
        .ok_or_else(|| DomainError::Validation(format!("invalid status value {:?}", raw)))?;
    fields.insert(
        "status".to_string(),
        Value::String(status.as_str().to_string()),
    );
    Ok(())
}

/// Map a discrete priority label ("High") onto the 0-100 scale; numeric
/// priorities pass through.
fn normalize_priority(fields: &mut Map<String, Value>) -> DomainResult<()> {
    let Some(value) = fields.get("priority") else {
        return Ok(());
    };
    match value {
        Value::Number(_) => Ok(()),
        Value::String(label) => {
            let label = PriorityLabel::parse(label).ok_or_else(|| {
                DomainError::Validation(format!("invalid priority value {:?}", label))
            })?;
            fields.insert("priority".to_string(), Value::from(label.score()));
            Ok(())
        }
        _ => Err(DomainError::Validation(
            "priority must be a number or a label".to_string(),
        )),
    }
}
