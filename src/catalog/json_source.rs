// restorechain/src/catalog/json_source.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{BackupCatalog, HeaderInspector};
use crate::chain::{BackupRecord, ForkId, HeaderInfo, Lsn, lsn};
use crate::errors::InspectError;

/// Backup history exported to a JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonCatalog { path: path.into() }
    }
}

#[async_trait]
impl BackupCatalog for JsonCatalog {
    async fn list(&self, database_name: &str) -> Result<Vec<BackupRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read backup history at {}", self.path.display()))?;
        let records: Vec<BackupRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse backup history JSON at {}", self.path.display()))?;

        let total = records.len();
        let matching: Vec<BackupRecord> = records
            .into_iter()
            .filter(|r| r.database_name.eq_ignore_ascii_case(database_name))
            .filter(|r| {
                let ok = r.is_well_formed();
                if !ok {
                    warn!(media_id = %r.media_id, "Skipping malformed history row (inverted LSN range or backup window)");
                }
                ok
            })
            .collect();

        debug!(
            "Loaded {} of {} history rows for database '{}'",
            matching.len(),
            total,
            database_name
        );
        Ok(matching)
    }
}

/// One media header row. Accepts RESTORE HEADERONLY column names as well.
#[derive(Debug, Deserialize)]
struct RawHeaderRow {
    #[serde(default, alias = "RecoveryForkID")]
    recovery_fork_id: Option<String>,
    #[serde(default, alias = "FirstLSN", deserialize_with = "lsn::deserialize_optional")]
    first_lsn: Option<Lsn>,
    #[serde(default, alias = "LastLSN", deserialize_with = "lsn::deserialize_optional")]
    last_lsn: Option<Lsn>,
}

impl From<RawHeaderRow> for HeaderInfo {
    fn from(row: RawHeaderRow) -> Self {
        HeaderInfo {
            recovery_fork_id: row.recovery_fork_id.as_deref().and_then(ForkId::parse),
            first_lsn: row.first_lsn,
            last_lsn: row.last_lsn,
        }
    }
}

/// Header rows dumped to a JSON object keyed by media id.
///
/// The file is re-read on every lookup so a dump refreshed between
/// validations is picked up.
#[derive(Debug, Clone)]
pub struct JsonHeaderSource {
    path: PathBuf,
}

impl JsonHeaderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonHeaderSource { path: path.into() }
    }
}

#[async_trait]
impl HeaderInspector for JsonHeaderSource {
    async fn inspect(&self, media_id: &str) -> std::result::Result<HeaderInfo, InspectError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            InspectError::Unreachable(format!("{}: {}", self.path.display(), e))
        })?;
        let mut rows: HashMap<String, RawHeaderRow> = serde_json::from_str(&content).map_err(|e| {
            InspectError::Unreachable(format!("{}: malformed header dump: {}", self.path.display(), e))
        })?;

        rows.remove(media_id)
            .map(HeaderInfo::from)
            .ok_or(InspectError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> anyhow::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[tokio::test]
    async fn test_catalog_filters_by_database() -> anyhow::Result<()> {
        let file = write_json(
            r#"[
                {"database_name": "Sales", "media_id": "F1", "kind": "D",
                 "start_time": "2024-03-01T01:00:00", "finish_time": "2024-03-01T02:00:00",
                 "first_lsn": 100, "last_lsn": "200"},
                {"database_name": "Inventory", "media_id": "X1", "kind": "full",
                 "start_time": "2024-03-01T01:00:00", "finish_time": "2024-03-01T02:00:00"},
                {"database_name": "sales", "media_id": "L1", "kind": "L", "is_copy_only": false,
                 "start_time": "2024-03-01T03:00:00", "finish_time": "2024-03-01T03:05:00",
                 "first_lsn": 200, "last_lsn": 250}
            ]"#,
        )?;

        let catalog = JsonCatalog::new(file.path());
        let records = catalog.list("SALES").await?;
        let ids: Vec<&str> = records.iter().map(|r| r.media_id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "L1"]);
        assert_eq!(records[0].last_lsn, Some(Lsn::from(200u64)));
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_skips_malformed_rows() -> anyhow::Result<()> {
        let file = write_json(
            r#"[
                {"database_name": "Sales", "media_id": "BAD", "kind": "full",
                 "start_time": "2024-03-01T05:00:00", "finish_time": "2024-03-01T02:00:00"}
            ]"#,
        )?;
        let records = JsonCatalog::new(file.path()).list("Sales").await?;
        assert!(records.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_snapshot_generations_differ() -> anyhow::Result<()> {
        let file = write_json("[]")?;
        let catalog = JsonCatalog::new(file.path());
        let first = catalog.snapshot("Sales").await?;
        let second = catalog.snapshot("Sales").await?;
        assert_ne!(first.generation, second.generation);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_catalog_file_is_an_error() {
        let catalog = JsonCatalog::new("/nonexistent/restorechain/history.json");
        assert!(catalog.list("Sales").await.is_err());
    }

    #[tokio::test]
    async fn test_header_source_reads_headeronly_columns() -> anyhow::Result<()> {
        let file = write_json(
            r#"{
                "F1": {"RecoveryForkID": "{6F9619FF-8B86-D011-B42D-00C04FC964FF}", "FirstLSN": 100, "LastLSN": 200},
                "L1": {"recovery_fork_id": "", "first_lsn": "200", "last_lsn": "250"}
            }"#,
        )?;
        let source = JsonHeaderSource::new(file.path());

        let f1 = source.inspect("F1").await?;
        assert_eq!(f1.recovery_fork_id, ForkId::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
        assert_eq!(f1.last_lsn, Some(Lsn::from(200u64)));

        let l1 = source.inspect("L1").await?;
        assert_eq!(l1.recovery_fork_id, None);
        assert_eq!(l1.first_lsn, Some(Lsn::from(200u64)));
        Ok(())
    }

    #[tokio::test]
    async fn test_header_source_error_kinds() -> anyhow::Result<()> {
        let file = write_json(r#"{"F1": {"first_lsn": 1, "last_lsn": 2}}"#)?;
        let source = JsonHeaderSource::new(file.path());
        assert_eq!(source.inspect("MISSING").await, Err(InspectError::NoData));

        let unreachable = JsonHeaderSource::new("/nonexistent/restorechain/headers.json");
        assert!(matches!(
            unreachable.inspect("F1").await,
            Err(InspectError::Unreachable(_))
        ));
        Ok(())
    }
}
