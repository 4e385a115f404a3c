//! Restore-chain resolution and validation.
//!
//! Resolution and planning are pure; validation reaches out to a
//! [`HeaderInspector`](crate::catalog::HeaderInspector) once per chain member.
pub mod lsn;
pub mod model;
pub mod resolver;
pub mod validator;

pub use lsn::Lsn;
pub use model::{BackupKind, BackupRecord, CatalogSnapshot, ForkId, HeaderInfo, RestorePlan};
pub use resolver::{resolve, resolve_snapshot};
pub use validator::{ValidationVerdict, validate};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{BackupKind, BackupRecord, Lsn};

    pub const DB: &str = "Sales";

    /// 2024-03-`day` `hour`:`minute`:00
    pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixture timestamp")
    }

    fn record(
        media_id: &str,
        kind: BackupKind,
        start: NaiveDateTime,
        finish: NaiveDateTime,
        first: u64,
        last: u64,
    ) -> BackupRecord {
        BackupRecord {
            database_name: DB.to_string(),
            media_id: media_id.to_string(),
            kind,
            is_copy_only: false,
            start_time: start,
            finish_time: finish,
            first_lsn: Some(Lsn::from(first)),
            last_lsn: Some(Lsn::from(last)),
            differential_base_lsn: None,
        }
    }

    pub fn full(media_id: &str, start: NaiveDateTime, finish: NaiveDateTime, first: u64, last: u64) -> BackupRecord {
        record(media_id, BackupKind::Full, start, finish, first, last)
    }

    pub fn diff(
        media_id: &str,
        start: NaiveDateTime,
        finish: NaiveDateTime,
        first: u64,
        last: u64,
        base_lsn: u64,
    ) -> BackupRecord {
        let mut r = record(media_id, BackupKind::Differential, start, finish, first, last);
        r.differential_base_lsn = Some(Lsn::from(base_lsn));
        r
    }

    pub fn log(media_id: &str, start: NaiveDateTime, finish: NaiveDateTime, first: u64, last: u64) -> BackupRecord {
        record(media_id, BackupKind::Log, start, finish, first, last)
    }
}
