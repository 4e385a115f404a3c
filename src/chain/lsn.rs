// restorechain/src/chain/lsn.rs
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A log sequence number as recorded in backup history or a media header.
///
/// History tables store LSNs as wide decimals; older exports sometimes carry
/// them as text. The original string form is kept so that values which do not
/// parse as integers can still be ordered deterministically.
///
/// `Lsn` deliberately does not implement `Ord`: mixing numeric and
/// lexicographic comparison is not transitive across arbitrary inputs. Use
/// [`Lsn::compare`] and the helpers built on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Lsn(String);

impl Lsn {
    pub fn new(raw: impl Into<String>) -> Self {
        Lsn(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u128> {
        self.0.parse::<u128>().ok()
    }

    /// Numeric comparison when both sides parse as integers, otherwise a
    /// byte-wise comparison of the original strings.
    pub fn compare(&self, other: &Lsn) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }

    pub fn same_position(&self, other: &Lsn) -> bool {
        self.compare(other) == Ordering::Equal
    }

    pub fn is_before(&self, other: &Lsn) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Lsn) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Lsn(value.to_string())
    }
}

impl From<&str> for Lsn {
    fn from(value: &str) -> Self {
        Lsn::new(value)
    }
}

impl<'de> Deserialize<'de> for Lsn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Exports disagree on whether numeric(25,0) columns are quoted. Unquoted
        // values keep their exact digits (serde_json `arbitrary_precision`).
        match Value::deserialize(deserializer)? {
            Value::Number(n) => {
                let digits = n.to_string();
                if digits.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(Lsn(digits))
                } else {
                    Err(D::Error::custom(format!("LSN {} is not a non-negative integer", digits)))
                }
            }
            Value::String(s) => Ok(Lsn::new(s)),
            other => Err(D::Error::custom(format!("expected an LSN, found {}", other))),
        }
    }
}

/// Reads an optional LSN field; blank text counts as absent.
pub fn deserialize_optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Lsn>, D::Error> {
    Ok(Option::<Lsn>::deserialize(deserializer)?.filter(|l| !l.as_str().is_empty()))
}
