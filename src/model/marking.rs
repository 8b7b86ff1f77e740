use serde::{Deserialize, Serialize};
use std::fmt;

use super::fields;
use super::record::Record;
use crate::error::{ErrorCode, JoinError};

/// Access-control classification of a submitted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Marking {
    /// Openly releasable
    Open,
    /// Restricted to authorized access
    Controlled,
    /// Open copy of a controlled record with sensitive alleles masked
    Masked,
}

impl Marking {
    pub fn tag(&self) -> &'static str {
        match self {
            Marking::Open => "OPEN",
            Marking::Controlled => "CONTROLLED",
            Marking::Masked => "MASKED",
        }
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self, Marking::Controlled)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Marking::Open),
            "CONTROLLED" => Some(Marking::Controlled),
            "MASKED" => Some(Marking::Masked),
            _ => None,
        }
    }

    /// Resolve the marking carried by a record; absence is an invariant violation
    pub fn resolve(record: &Record) -> Result<Self, JoinError> {
        let tag = record.text(fields::MARKING).ok_or_else(|| {
            JoinError::marking(
                ErrorCode::MARKING_MISSING,
                "record carries no marking",
                Some(record.canonical()),
            )
        })?;

        Self::from_tag(&tag).ok_or_else(|| {
            JoinError::marking(
                ErrorCode::MARKING_UNKNOWN,
                format!("unknown marking '{}'", tag),
                Some(record.canonical()),
            )
        })
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
