// restorechain/src/restore/tsql.rs
//! Renders planned operations as a T-SQL script for review before execution.
use crate::chain::BackupKind;

use super::planner::{MediaRestore, RecoveryState, RestoreOperation};

const STOPAT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Bracket-quotes an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// N'...' string literal.
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

fn render_restore(restore: &MediaRestore, target_db: &str) -> String {
    let verb = match restore.kind {
        BackupKind::Log => "LOG",
        BackupKind::Full | BackupKind::Differential => "DATABASE",
    };

    let mut options = vec!["FILE = 1".to_string()];
    for mv in &restore.relocations {
        options.push(format!(
            "MOVE {} TO {}",
            quote_literal(&mv.logical_name),
            quote_literal(&mv.physical_path)
        ));
    }
    if restore.replace {
        options.push("REPLACE".to_string());
    }
    match restore.recovery {
        RecoveryState::NoRecovery => options.push("NORECOVERY".to_string()),
        RecoveryState::Recovery => options.push("RECOVERY".to_string()),
        RecoveryState::RecoveryStopAt(at) => {
            options.push("RECOVERY".to_string());
            options.push(format!("STOPAT = {}", quote_literal(&at.format(STOPAT_FORMAT).to_string())));
        }
    }
    options.push("STATS = 10".to_string());

    format!(
        "RESTORE {} {} FROM DISK = {}\n    WITH {};",
        verb,
        quote_ident(target_db),
        quote_literal(&restore.media_id),
        options.join(",\n         ")
    )
}

/// Renders each operation as one statement followed by a `GO` separator.
pub fn render_script(operations: &[RestoreOperation], target_db: &str) -> String {
    let mut script = String::new();
    for (step, op) in operations.iter().enumerate() {
        let statement = match op {
            RestoreOperation::SetExclusiveAccess { database } => format!(
                "ALTER DATABASE {} SET SINGLE_USER WITH ROLLBACK IMMEDIATE;",
                quote_ident(database)
            ),
            RestoreOperation::Restore(restore) => render_restore(restore, target_db),
            RestoreOperation::RestoreSharedAccess { database } => {
                format!("ALTER DATABASE {} SET MULTI_USER;", quote_ident(database))
            }
        };
        script.push_str(&format!("-- step {}\n{}\nGO\n\n", step + 1, statement));
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::fixtures::at;
    use crate::restore::planner::FileMove;

    fn media(media_id: &str, kind: BackupKind, recovery: RecoveryState) -> RestoreOperation {
        RestoreOperation::Restore(MediaRestore {
            media_id: media_id.to_string(),
            kind,
            recovery,
            relocations: Vec::new(),
            replace: false,
        })
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("odd]name"), "[odd]]name]");
        assert_eq!(quote_literal("C:\\O'Brien\\f.bak"), "N'C:\\O''Brien\\f.bak'");
    }

    #[test]
    fn test_render_guarded_point_in_time_script() {
        let ops = vec![
            RestoreOperation::SetExclusiveAccess { database: "Sales".to_string() },
            RestoreOperation::Restore(MediaRestore {
                media_id: "C:\\bak\\full.bak".to_string(),
                kind: BackupKind::Full,
                recovery: RecoveryState::NoRecovery,
                relocations: vec![FileMove {
                    logical_name: "Sales".to_string(),
                    physical_path: "D:\\data\\Sales.mdf".to_string(),
                }],
                replace: true,
            }),
            media("C:\\bak\\log1.trn", BackupKind::Log, RecoveryState::RecoveryStopAt(at(1, 5, 10))),
            RestoreOperation::RestoreSharedAccess { database: "Sales".to_string() },
        ];

        let script = render_script(&ops, "Sales");
        assert!(script.starts_with("-- step 1\nALTER DATABASE [Sales] SET SINGLE_USER WITH ROLLBACK IMMEDIATE;\nGO"));
        assert!(script.contains("RESTORE DATABASE [Sales] FROM DISK = N'C:\\bak\\full.bak'"));
        assert!(script.contains("MOVE N'Sales' TO N'D:\\data\\Sales.mdf'"));
        assert!(script.contains("REPLACE,\n         NORECOVERY"));
        assert!(script.contains("RESTORE LOG [Sales] FROM DISK = N'C:\\bak\\log1.trn'"));
        assert!(script.contains("STOPAT = N'2024-03-01T05:10:00.000'"));
        assert!(script.contains("-- step 4\nALTER DATABASE [Sales] SET MULTI_USER;"));
    }

    #[test]
    fn test_render_differential_recovery() {
        let ops = vec![media("diff.bak", BackupKind::Differential, RecoveryState::Recovery)];
        let script = render_script(&ops, "Sales_dev");
        assert!(script.contains("RESTORE DATABASE [Sales_dev] FROM DISK = N'diff.bak'"));
        assert!(script.contains("RECOVERY,\n         STATS = 10;"));
        assert!(!script.contains("NORECOVERY"));
    }
}
