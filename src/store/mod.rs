//! Record store for HelloWorld messages.
//!
//! This module handles:
//! - The [`MessageStore`] trait every backend implements
//! - PostgreSQL persistence
//! - An in-memory store for local runs and tests
//! - Selecting a backend from the connection string

pub mod memory;
pub mod postgres;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::StoreResult;

pub use memory::MemoryStore;
pub use postgres::PgMessageStore;
pub use types::{validate_message, HelloMessage, MAX_MESSAGE_LEN};

/// Connection string prefix selecting the in-memory backend.
pub const MEMORY_DSN_PREFIX: &str = "memory:";

/// Persistence of HelloWorld messages.
///
/// Every call goes to the backend; nothing is cached. Implementations must
/// reject invalid text in `create` before touching persistence (see
/// [`validate_message`]).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message and return it with its assigned id.
    async fn create(&self, text: &str) -> StoreResult<HelloMessage>;

    /// All messages in insertion order.
    async fn list(&self) -> StoreResult<Vec<HelloMessage>>;

    /// A single message by id.
    async fn get(&self, id: i64) -> StoreResult<HelloMessage>;

    /// Hard-delete a message by id; `NotFound` when nothing was removed.
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// Number of stored messages.
    async fn count(&self) -> StoreResult<i64>;

    /// Liveness check, independent of the schema.
    async fn ping(&self) -> StoreResult<()>;

    /// Create the backing table if it does not exist.
    async fn ensure_schema(&self) -> StoreResult<()>;
}

/// Shared store handle injected into handlers.
pub type SharedStore = Arc<dyn MessageStore>;

/// Open the store named by `dsn`.
///
/// `memory:` connection strings select [`MemoryStore`]; anything else is
/// handed to the PostgreSQL driver.
pub async fn connect(dsn: &str, connect_timeout: Duration) -> StoreResult<SharedStore> {
    if dsn.starts_with(MEMORY_DSN_PREFIX) {
        info!("Using in-memory message store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgMessageStore::connect(dsn, connect_timeout).await?;
    info!("Connected to PostgreSQL");
    Ok(Arc::new(store))
}
