// restorechain/src/chain/validator.rs
use futures::future::join_all;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::lsn::Lsn;
use super::model::{BackupKind, BackupRecord, ForkId, HeaderInfo, RestorePlan};
use crate::catalog::HeaderInspector;
use crate::errors::{InspectError, ValidationFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub fork: Option<ForkId>,
    pub final_lsn: Option<Lsn>,
    pub logs_checked: usize,
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fork {}, final LSN {}, {} log(s) checked",
            self.fork.as_ref().map_or("unknown", |fork| fork.as_str()),
            self.final_lsn.as_ref().map_or("unknown", |lsn| lsn.as_str()),
            self.logs_checked
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Ok { summary: ValidationSummary },
    Failed { reason: ValidationFailure, offending_record: String },
}

impl ValidationVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationVerdict::Ok { .. })
    }

    fn failed(reason: ValidationFailure) -> Self {
        let offending_record = reason.media_id().to_string();
        ValidationVerdict::Failed { reason, offending_record }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationVerdict::Ok { summary } => write!(f, "chain valid: {}", summary),
            ValidationVerdict::Failed { reason, offending_record } => {
                write!(f, "chain invalid at {}: {}", offending_record, reason)
            }
        }
    }
}

async fn fetch_header<I>(inspector: &I, media_id: &str, limit: Duration) -> Result<HeaderInfo, InspectError>
where
    I: HeaderInspector + ?Sized,
{
    match timeout(limit, inspector.inspect(media_id)).await {
        Ok(result) => result,
        Err(_) => Err(InspectError::Unreachable(format!(
            "header fetch timed out after {}s",
            limit.as_secs_f64()
        ))),
    }
}

/// Fetches every member's header concurrently, then checks the chain in
/// restore order. Each fetch is bounded by `header_timeout`.
pub async fn validate<I>(plan: &RestorePlan, inspector: &I, header_timeout: Duration) -> ValidationVerdict
where
    I: HeaderInspector + ?Sized,
{
    let members: Vec<&BackupRecord> = plan.members().collect();
    debug!("Fetching {} media headers", members.len());

    let headers = join_all(
        members
            .iter()
            .map(|m| fetch_header(inspector, &m.media_id, header_timeout)),
    )
    .await;

    let verdict = fold_headers(members.into_iter().zip(headers));
    match &verdict {
        ValidationVerdict::Ok { summary } => info!("Restore chain validated: {}", summary),
        ValidationVerdict::Failed { reason, .. } => warn!("Restore chain rejected: {}", reason),
    }
    verdict
}

/// Checks fetched headers in the order given, stopping at the first failure.
///
/// The reference fork is the first known fork in the chain; unknown forks
/// never fail. Log members must satisfy `first_lsn <= current < last_lsn`
/// where `current` is the previous member's last LSN.
pub fn fold_headers<'a, T>(members: T) -> ValidationVerdict
where
    T: IntoIterator<Item = (&'a BackupRecord, Result<HeaderInfo, InspectError>)>,
{
    let mut fork: Option<ForkId> = None;
    let mut current: Option<Lsn> = None;
    let mut previous_media: Option<&str> = None;
    let mut logs_checked = 0;

    for (member, header) in members {
        let header = match header {
            Ok(h) => h,
            Err(e) => return ValidationVerdict::failed(ValidationFailure::header_unavailable(&member.media_id, e)),
        };

        match (&fork, &header.recovery_fork_id) {
            (Some(expected), Some(found)) if expected != found => {
                return ValidationVerdict::failed(ValidationFailure::ForkMismatch {
                    media_id: member.media_id.clone(),
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
            (None, Some(found)) => fork = Some(found.clone()),
            _ => {}
        }

        if member.kind == BackupKind::Log {
            let (first, last) = match (header.first_lsn, header.last_lsn) {
                (Some(first), Some(last)) => (first, last),
                _ => {
                    return ValidationVerdict::failed(ValidationFailure::MissingLsn {
                        media_id: member.media_id.clone(),
                    });
                }
            };
            // Continuity cannot be proven past a member without a last LSN.
            let Some(expected) = current.take() else {
                return ValidationVerdict::failed(ValidationFailure::MissingLsn {
                    media_id: previous_media.unwrap_or(member.media_id.as_str()).to_string(),
                });
            };

            if expected.is_before(&first) {
                return ValidationVerdict::failed(ValidationFailure::LsnGap {
                    media_id: member.media_id.clone(),
                    expected,
                    found: first,
                });
            }
            if !expected.is_before(&last) {
                return ValidationVerdict::failed(ValidationFailure::LsnGap {
                    media_id: member.media_id.clone(),
                    expected,
                    found: last,
                });
            }
            logs_checked += 1;
            current = Some(last);
        } else {
            current = header.last_lsn;
        }
        previous_media = Some(member.media_id.as_str());
    }

    ValidationVerdict::Ok {
        summary: ValidationSummary {
            fork,
            final_lsn: current,
            logs_checked,
        },
    }
}
