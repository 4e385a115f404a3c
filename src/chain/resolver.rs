// restorechain/src/chain/resolver.rs
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::lsn::Lsn;
use super::model::{BackupKind, BackupRecord, CatalogSnapshot, PlanNote, RestorePlan};
use crate::errors::ResolutionError;

/// `None` is the infinite future.
fn within_deadline(deadline: Option<NaiveDateTime>, instant: NaiveDateTime) -> bool {
    deadline.is_none_or(|d| instant <= d)
}

fn by_finish_then_start(a: &&BackupRecord, b: &&BackupRecord) -> Ordering {
    a.finish_time
        .cmp(&b.finish_time)
        .then(a.start_time.cmp(&b.start_time))
}

/// Latest non-copy-only full backup finishing by the deadline. Equal
/// candidates resolve to the one appearing last in the catalog.
fn select_base(records: &[BackupRecord], deadline: Option<NaiveDateTime>) -> Option<&BackupRecord> {
    records
        .iter()
        .filter(|r| r.kind == BackupKind::Full && !r.is_copy_only && within_deadline(deadline, r.finish_time))
        .max_by(by_finish_then_start)
}

/// Latest differential built on `base`. Differentials whose base LSN points
/// at another full belong to another chain and are skipped silently.
fn select_differential<'a>(
    records: &'a [BackupRecord],
    base: &BackupRecord,
    deadline: Option<NaiveDateTime>,
) -> Option<&'a BackupRecord> {
    records
        .iter()
        .filter(|r| {
            r.kind == BackupKind::Differential
                && within_deadline(deadline, r.finish_time)
                && r.start_time > base.start_time
                && matches!(
                    (&r.differential_base_lsn, &base.first_lsn),
                    (Some(diff_base), Some(base_first)) if diff_base.same_position(base_first)
                )
        })
        .max_by(by_finish_then_start)
}

/// Whether a log extends past the anchor. Without an anchor LSN the anchor's
/// finish time is used instead.
fn follows_anchor(log: &BackupRecord, anchor: &BackupRecord, anchor_lsn: Option<&Lsn>) -> bool {
    match (log.last_lsn.as_ref(), anchor_lsn) {
        (Some(last), Some(anchor_lsn)) => last.is_after(anchor_lsn),
        (_, None) => log.finish_time > anchor.finish_time,
        (None, Some(_)) => false,
    }
}

/// Resolves the minimal restore chain reaching `target_time`, or the latest
/// state when no target is given.
pub fn resolve(
    records: &[BackupRecord],
    target_time: Option<NaiveDateTime>,
) -> Result<RestorePlan, ResolutionError> {
    let deadline = target_time;

    let base = select_base(records, deadline)
        .ok_or(ResolutionError::NoBaseAvailable { target_time })?;
    debug!(media_id = %base.media_id, finish = %base.finish_time, "selected base");

    let diff = select_differential(records, base, deadline);
    if let Some(d) = diff {
        debug!(media_id = %d.media_id, finish = %d.finish_time, "selected differential");
    }

    let anchor = diff.unwrap_or(base);
    let anchor_lsn = anchor.last_lsn.as_ref();

    let candidates: Vec<&BackupRecord> = records
        .iter()
        .filter(|r| r.kind == BackupKind::Log && follows_anchor(r, anchor, anchor_lsn))
        .collect();

    let mut covering: Vec<&BackupRecord> = candidates
        .iter()
        .copied()
        .filter(|r| deadline.is_none_or(|d| r.finish_time < d))
        .collect();
    covering.sort_by(|a, b| by_finish_then_start(a, b).then_with(|| a.media_id.cmp(&b.media_id)));

    let boundary = target_time.and_then(|target| {
        candidates
            .iter()
            .copied()
            .filter(|r| r.spans_same_day(target))
            .min_by(by_finish_then_start)
    });

    let mut logs: Vec<BackupRecord> = covering.into_iter().cloned().collect();
    let final_log_covers_target = boundary.is_some();
    if let Some(b) = boundary {
        debug!(media_id = %b.media_id, "boundary log spans target time");
        logs.push(b.clone());
    }

    let mut notes = Vec::new();
    if diff.is_none() {
        notes.push(PlanNote::NoDifferential);
    }
    if logs.is_empty() {
        notes.push(PlanNote::NoLogs);
    }
    if let (Some(target), false) = (target_time, final_log_covers_target) {
        let stops_at = logs.last().unwrap_or(anchor).finish_time;
        notes.push(PlanNote::TargetNotCovered { target, stops_at });
    }

    let plan = RestorePlan::new(
        base.clone(),
        diff.cloned(),
        logs,
        target_time,
        final_log_covers_target,
        notes,
    );
    info!("Resolved restore chain: {}", plan.summary());
    Ok(plan)
}

/// Resolves against a catalog snapshot and stamps the plan with the
/// snapshot's generation.
pub fn resolve_snapshot(
    snapshot: &CatalogSnapshot,
    target_time: Option<NaiveDateTime>,
) -> Result<RestorePlan, ResolutionError> {
    let records: Vec<BackupRecord> = snapshot
        .records
        .iter()
        .filter(|r| r.database_name.eq_ignore_ascii_case(&snapshot.database))
        .cloned()
        .collect();
    resolve(&records, target_time).map(|plan| plan.with_generation(snapshot.generation))
}
