//! In-process table store
//!
//! Keeps rows in memory behind a `parking_lot::RwLock`. Primary keys are
//! enforced the way the remote store enforces them (`id` on `subscriptions`
//! and `transactions`), so duplicate deliveries behave the same as in
//! production: the parent insert conflicts, item rows pile up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use super::{EventStore, Filter, Table};
use crate::error::{StoreError, StoreResult};

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    writes: AtomicU64,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in a table
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.read().get(&table).cloned().unwrap_or_default()
    }

    /// Number of accepted writes (inserts plus rows updated)
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent insert and update fail with an HTTP 503
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a row directly, bypassing key checks and the write counter
    pub fn seed(&self, table: Table, row: Value) {
        self.tables.write().entry(table).or_default().push(row);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Http {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait::async_trait]
impl EventStore for InMemoryStore {
    async fn insert(&self, table: Table, row: Value) -> StoreResult<Vec<Value>> {
        self.check_writable()?;
        if !row.is_object() {
            return Err(StoreError::InvalidRow("row must be a JSON object".into()));
        }

        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();

        if let Some(key) = table.primary_key() {
            match row.get(key) {
                Some(Value::Null) | None => {
                    return Err(StoreError::Http {
                        status: 400,
                        message: format!("null value in column \"{key}\" of relation \"{table}\""),
                    })
                }
                Some(id) => {
                    if rows.iter().any(|existing| existing.get(key) == Some(id)) {
                        return Err(StoreError::Conflict {
                            table: table.as_str(),
                            id: id.as_str().map(str::to_owned).unwrap_or_else(|| id.to_string()),
                        });
                    }
                }
            }
        }

        rows.push(row.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(vec![row])
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> StoreResult<Vec<Value>> {
        self.check_writable()?;
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::InvalidRow("patch must be a JSON object".into())),
        };

        let mut tables = self.tables.write();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
                if let Value::Object(fields) = row {
                    for (k, v) in &patch {
                        fields.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        self.writes.fetch_add(updated.len() as u64, Ordering::SeqCst);
        Ok(updated)
    }

    async fn select(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        Ok(self
            .tables
            .read()
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_all(r, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
