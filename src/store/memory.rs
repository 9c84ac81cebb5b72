//! In-memory message store.
//!
//! Selected with a `memory://` connection string and used throughout the
//! tests. Clones share state, so a test can keep a handle to flip the store
//! "down" or make writes fail after handing it to the router.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::types::{validate_message, HelloMessage};
use super::MessageStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, String>,
    last_id: i64,
}

/// Message store held in process memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
    /// When false, `ping` and every other operation fail.
    available: Arc<AtomicBool>,
    /// When true, mutations fail with a backend error.
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty, reachable store.
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            available: Arc::new(AtomicBool::new(true)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the database going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make subsequent creates and deletes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn table(&self) -> StoreResult<std::sync::MutexGuard<'_, Table>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }
        self.table
            .lock()
            .map_err(|_| StoreError::Backend("table lock poisoned".to_string()))
    }

    fn writable_table(&self) -> StoreResult<std::sync::MutexGuard<'_, Table>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.table()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, text: &str) -> StoreResult<HelloMessage> {
        let text = validate_message(text)?;
        let mut table = self.writable_table()?;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, text.to_string());
        Ok(HelloMessage {
            id,
            message: text.to_string(),
        })
    }

    async fn list(&self) -> StoreResult<Vec<HelloMessage>> {
        let table = self.table()?;
        Ok(table
            .rows
            .iter()
            .map(|(id, message)| HelloMessage {
                id: *id,
                message: message.clone(),
            })
            .collect())
    }

    async fn get(&self, id: i64) -> StoreResult<HelloMessage> {
        let table = self.table()?;
        table
            .rows
            .get(&id)
            .map(|message| HelloMessage {
                id,
                message: message.clone(),
            })
            .ok_or(StoreError::NotFound { id })
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut table = self.writable_table()?;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }

    async fn count(&self) -> StoreResult<i64> {
        let table = self.table()?;
        Ok(table.rows.len() as i64)
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        self.table().map(|_| ())
    }
}
