// restorechain/src/restore/planner.rs
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::chain::{BackupKind, BackupRecord, RestorePlan};

/// State the database is left in after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    NoRecovery,
    Recovery,
    RecoveryStopAt(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Data,
    Log,
}

/// A logical file of the source database as listed by FILELISTONLY.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogicalFile {
    pub logical_name: String,
    pub kind: FileKind,
}

/// Where relocated files should land.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilePaths {
    pub data_dir: String,
    pub log_dir: String,
    #[serde(default)]
    pub files: Vec<LogicalFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMove {
    pub logical_name: String,
    pub physical_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    pub overwrite: bool,
    pub relocate: Option<FilePaths>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRestore {
    pub media_id: String,
    pub kind: BackupKind,
    pub recovery: RecoveryState,
    pub relocations: Vec<FileMove>,
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOperation {
    SetExclusiveAccess { database: String },
    Restore(MediaRestore),
    RestoreSharedAccess { database: String },
}

/// Joins a directory and file name using whichever separator the directory
/// already uses; backslash wins for bare names.
fn join_dir(dir: &str, file_name: &str) -> String {
    let separator = if dir.contains('/') && !dir.contains('\\') { '/' } else { '\\' };
    let trimmed = dir.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return file_name.to_string();
    }
    format!("{}{}{}", trimmed, separator, file_name)
}

/// Physical targets for every logical file, named after `target_db`.
///
/// The first data file is `<db>.mdf`, further data files `<db>_<n>.ndf`;
/// the log file is `<db>_log.ldf`, further logs `<db>_log_<n>.ldf`.
pub fn relocation_moves(paths: &FilePaths, target_db: &str) -> Vec<FileMove> {
    let mut data_seen = 0;
    let mut log_seen = 0;

    paths
        .files
        .iter()
        .map(|file| {
            let physical_path = match file.kind {
                FileKind::Data => {
                    let name = match data_seen {
                        0 => format!("{}.mdf", target_db),
                        n => format!("{}_{}.ndf", target_db, n),
                    };
                    data_seen += 1;
                    join_dir(&paths.data_dir, &name)
                }
                FileKind::Log => {
                    let name = match log_seen {
                        0 => format!("{}_log.ldf", target_db),
                        n => format!("{}_log_{}.ldf", target_db, n),
                    };
                    log_seen += 1;
                    join_dir(&paths.log_dir, &name)
                }
            };
            FileMove {
                logical_name: file.logical_name.clone(),
                physical_path,
            }
        })
        .collect()
}

fn terminal_state(plan: &RestorePlan, member: &BackupRecord) -> RecoveryState {
    match (member.kind, plan.final_log_covers_target(), plan.target_time()) {
        (BackupKind::Log, true, Some(target)) => RecoveryState::RecoveryStopAt(target),
        _ => RecoveryState::Recovery,
    }
}

/// Turns a resolved chain into ordered restore operations for `target_db`.
///
/// Every member but the last is restored WITH NORECOVERY. The last takes
/// RECOVERY, or a stop-point when the boundary log covers the target time.
pub fn plan_operations(plan: &RestorePlan, target_db: &str, options: &RestoreOptions) -> Vec<RestoreOperation> {
    let same_database = plan.source_database().eq_ignore_ascii_case(target_db);
    let member_count = plan.member_count();
    let mut operations = Vec::with_capacity(member_count + 2);

    if same_database {
        operations.push(RestoreOperation::SetExclusiveAccess {
            database: target_db.to_string(),
        });
    }

    for (index, member) in plan.members().enumerate() {
        let is_base = index == 0;
        let recovery = if index + 1 == member_count {
            terminal_state(plan, member)
        } else {
            RecoveryState::NoRecovery
        };

        let relocations = match (&options.relocate, is_base && !same_database) {
            (Some(paths), true) => relocation_moves(paths, target_db),
            _ => Vec::new(),
        };

        operations.push(RestoreOperation::Restore(MediaRestore {
            media_id: member.media_id.clone(),
            kind: member.kind,
            recovery,
            relocations,
            replace: is_base && options.overwrite,
        }));
    }

    if same_database {
        operations.push(RestoreOperation::RestoreSharedAccess {
            database: target_db.to_string(),
        });
    }

    debug!("Planned {} restore operations for '{}'", operations.len(), target_db);
    operations
}
