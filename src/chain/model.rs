// restorechain/src/chain/model.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::lsn::Lsn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    // Single-letter aliases match the `type` column of msdb backup history.
    #[serde(alias = "D", alias = "FULL", alias = "database")]
    Full,
    #[serde(alias = "I", alias = "DIFFERENTIAL", alias = "diff")]
    Differential,
    #[serde(alias = "L", alias = "LOG")]
    Log,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Full => write!(f, "FULL"),
            BackupKind::Differential => write!(f, "DIFF"),
            BackupKind::Log => write!(f, "LOG"),
        }
    }
}

/// One row of backup history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub database_name: String,
    pub media_id: String,
    pub kind: BackupKind,
    #[serde(default)]
    pub is_copy_only: bool,
    pub start_time: NaiveDateTime,
    pub finish_time: NaiveDateTime,
    #[serde(default, deserialize_with = "crate::chain::lsn::deserialize_optional")]
    pub first_lsn: Option<Lsn>,
    #[serde(default, deserialize_with = "crate::chain::lsn::deserialize_optional")]
    pub last_lsn: Option<Lsn>,
    #[serde(default, deserialize_with = "crate::chain::lsn::deserialize_optional")]
    pub differential_base_lsn: Option<Lsn>,
}

impl BackupRecord {
    /// True when the record satisfies the history invariants
    /// (`first_lsn <= last_lsn`, `finish_time >= start_time`).
    pub fn is_well_formed(&self) -> bool {
        let lsn_ordered = match (&self.first_lsn, &self.last_lsn) {
            (Some(first), Some(last)) => !first.is_after(last),
            _ => true,
        };
        lsn_ordered && self.finish_time >= self.start_time
    }

    /// Whether `instant` falls inside the backup window and both window
    /// endpoints share its calendar day.
    pub fn spans_same_day(&self, instant: NaiveDateTime) -> bool {
        let day = instant.date();
        self.start_time <= instant
            && instant <= self.finish_time
            && self.start_time.date() == day
            && self.finish_time.date() == day
    }
}

/// Normalized recovery-fork identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkId(String);

impl ForkId {
    /// Normalizes a raw fork value. Empty or all-zero GUIDs are unknown.
    pub fn parse(raw: &str) -> Option<ForkId> {
        let trimmed = raw.trim().trim_start_matches('{').trim_end_matches('}').trim();
        if trimmed.is_empty() {
            return None;
        }
        match Uuid::parse_str(trimmed) {
            Ok(guid) if guid.is_nil() => None,
            Ok(guid) => Some(ForkId(guid.hyphenated().to_string())),
            Err(_) => Some(ForkId(trimmed.to_ascii_lowercase())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header facts read from a single backup media unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderInfo {
    pub recovery_fork_id: Option<ForkId>,
    pub first_lsn: Option<Lsn>,
    pub last_lsn: Option<Lsn>,
}

/// Point-in-time view of a database's backup history.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub database: String,
    /// Changes on every snapshot; plans carry it so staleness can be detected.
    pub generation: Uuid,
    pub taken_at: NaiveDateTime,
    pub records: Vec<BackupRecord>,
}

impl CatalogSnapshot {
    pub fn new(database: impl Into<String>, records: Vec<BackupRecord>) -> Self {
        CatalogSnapshot {
            database: database.into(),
            generation: Uuid::new_v4(),
            taken_at: chrono::Local::now().naive_local(),
            records,
        }
    }
}

/// Non-fatal conditions observed while resolving a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNote {
    NoDifferential,
    NoLogs,
    /// A target time was requested but no log spans it; recovery stops at
    /// the end of the last selected member.
    TargetNotCovered {
        target: NaiveDateTime,
        stops_at: NaiveDateTime,
    },
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNote::NoDifferential => write!(f, "no differential backup applies to the chosen base"),
            PlanNote::NoLogs => write!(f, "no log backups follow the base; recovery uses full/differential only"),
            PlanNote::TargetNotCovered { target, stops_at } => write!(
                f,
                "no log backup spans {}; recovery stops at nearest available point {}",
                target, stops_at
            ),
        }
    }
}

/// Resolved restore chain. Built once per resolution and immutable after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    base: BackupRecord,
    diff: Option<BackupRecord>,
    logs: Vec<BackupRecord>,
    target_time: Option<NaiveDateTime>,
    final_log_covers_target: bool,
    generation: Option<Uuid>,
    notes: Vec<PlanNote>,
}

impl RestorePlan {
    pub(crate) fn new(
        base: BackupRecord,
        diff: Option<BackupRecord>,
        logs: Vec<BackupRecord>,
        target_time: Option<NaiveDateTime>,
        final_log_covers_target: bool,
        notes: Vec<PlanNote>,
    ) -> Self {
        RestorePlan {
            base,
            diff,
            logs,
            target_time,
            final_log_covers_target,
            generation: None,
            notes,
        }
    }

    pub(crate) fn with_generation(mut self, generation: Uuid) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn base(&self) -> &BackupRecord {
        &self.base
    }

    pub fn diff(&self) -> Option<&BackupRecord> {
        self.diff.as_ref()
    }

    pub fn logs(&self) -> &[BackupRecord] {
        &self.logs
    }

    pub fn target_time(&self) -> Option<NaiveDateTime> {
        self.target_time
    }

    pub fn final_log_covers_target(&self) -> bool {
        self.final_log_covers_target
    }

    /// Generation of the catalog snapshot the plan was derived from.
    pub fn generation(&self) -> Option<Uuid> {
        self.generation
    }

    pub fn notes(&self) -> &[PlanNote] {
        &self.notes
    }

    pub fn source_database(&self) -> &str {
        &self.base.database_name
    }

    /// Chain members in restore order: base, diff, then logs.
    pub fn members(&self) -> impl Iterator<Item = &BackupRecord> {
        std::iter::once(&self.base)
            .chain(self.diff.iter())
            .chain(self.logs.iter())
    }

    pub fn member_count(&self) -> usize {
        1 + usize::from(self.diff.is_some()) + self.logs.len()
    }

    /// Instant the restored database will reflect.
    pub fn recovery_point(&self) -> NaiveDateTime {
        if self.final_log_covers_target {
            if let Some(target) = self.target_time {
                return target;
            }
        }
        self.members()
            .last()
            .map(|m| m.finish_time)
            .unwrap_or(self.base.finish_time)
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: base {} ({})",
            self.source_database(),
            self.base.media_id,
            self.base.finish_time
        );
        if let Some(diff) = &self.diff {
            summary.push_str(&format!(", diff {} ({})", diff.media_id, diff.finish_time));
        }
        summary.push_str(&format!(", {} log(s)", self.logs.len()));
        if self.final_log_covers_target {
            summary.push_str(&format!(", stop at {}", self.recovery_point()));
        } else {
            summary.push_str(&format!(", recovers to {}", self.recovery_point()));
        }
        summary
    }
}
