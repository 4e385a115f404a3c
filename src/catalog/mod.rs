// restorechain/src/catalog/mod.rs
pub(crate) mod json_source;

use anyhow::Result;
use async_trait::async_trait;

use crate::chain::{BackupRecord, CatalogSnapshot, HeaderInfo};
use crate::errors::InspectError;

pub use json_source::{JsonCatalog, JsonHeaderSource};

/// Source of backup history rows for a database.
#[async_trait]
pub trait BackupCatalog: Send + Sync {
    /// All known history rows for `database_name`, in any order.
    async fn list(&self, database_name: &str) -> Result<Vec<BackupRecord>>;

    async fn snapshot(&self, database_name: &str) -> Result<CatalogSnapshot> {
        let records = self.list(database_name).await?;
        Ok(CatalogSnapshot::new(database_name, records))
    }
}

/// Reads fork and LSN facts from one backup media unit.
#[async_trait]
pub trait HeaderInspector: Send + Sync {
    async fn inspect(&self, media_id: &str) -> std::result::Result<HeaderInfo, InspectError>;
}
