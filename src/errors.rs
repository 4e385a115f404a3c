use thiserror::Error;

use crate::chain::lsn::Lsn;
use crate::chain::model::ForkId;

/// Raised when no restore chain can be anchored for the requested point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No full backup available to anchor a restore chain{}", describe_deadline(.target_time))]
    NoBaseAvailable {
        target_time: Option<chrono::NaiveDateTime>,
    },
}

fn describe_deadline(target_time: &Option<chrono::NaiveDateTime>) -> String {
    match target_time {
        Some(t) => format!(" at or before {}", t),
        None => String::new(),
    }
}

/// Failure of a single header lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    /// Transport failure or timeout; the caller may retry.
    #[error("Header source unreachable: {0}")]
    Unreachable(String),

    /// The media exists in history but yields no header rows.
    #[error("No header data for media")]
    NoData,
}

impl InspectError {
    pub fn is_transient(&self) -> bool {
        matches!(self, InspectError::Unreachable(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("Recovery fork mismatch at {media_id}: chain is on {expected}, media is on {found}")]
    ForkMismatch {
        media_id: String,
        expected: ForkId,
        found: ForkId,
    },

    #[error("LSN gap at {media_id}: expected continuity from {expected}, found {found}")]
    LsnGap {
        media_id: String,
        expected: Lsn,
        found: Lsn,
    },

    #[error("Missing LSN bounds in header of {media_id}")]
    MissingLsn { media_id: String },

    #[error("Header unavailable for {media_id} ({}): {source}", persistence(.transient))]
    HeaderUnavailable {
        media_id: String,
        transient: bool,
        source: InspectError,
    },
}

fn persistence(transient: &bool) -> &'static str {
    if *transient { "transient" } else { "permanent" }
}

impl ValidationFailure {
    pub fn media_id(&self) -> &str {
        match self {
            ValidationFailure::ForkMismatch { media_id, .. }
            | ValidationFailure::LsnGap { media_id, .. }
            | ValidationFailure::MissingLsn { media_id }
            | ValidationFailure::HeaderUnavailable { media_id, .. } => media_id,
        }
    }

    pub(crate) fn header_unavailable(media_id: &str, source: InspectError) -> Self {
        ValidationFailure::HeaderUnavailable {
            media_id: media_id.to_string(),
            transient: source.is_transient(),
            source,
        }
    }
}
