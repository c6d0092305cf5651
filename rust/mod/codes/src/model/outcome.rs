use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entry::CodeEntry;

/// Result of a redemption attempt. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RedeemOutcome {
    /// The code was unused and is now used. Carries the updated entry.
    Redeemed { entry: CodeEntry },

    /// The code had already been used; nothing changed.
    #[serde(rename_all = "camelCase")]
    AlreadyUsed { id: String, used_at: DateTime<Utc> },

    /// No such code; nothing changed.
    NotFound { id: String },
}

impl RedeemOutcome {
    /// The normalized code the outcome refers to.
    pub fn id(&self) -> &str {
        match self {
            RedeemOutcome::Redeemed { entry } => &entry.id,
            RedeemOutcome::AlreadyUsed { id, .. } => id,
            RedeemOutcome::NotFound { id } => id,
        }
    }

    pub fn is_redeemed(&self) -> bool {
        matches!(self, RedeemOutcome::Redeemed { .. })
    }

    /// Redemption time of the code, for `Redeemed` and `AlreadyUsed`.
    pub fn used_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RedeemOutcome::Redeemed { entry } => entry.used_at,
            RedeemOutcome::AlreadyUsed { used_at, .. } => Some(*used_at),
            RedeemOutcome::NotFound { .. } => None,
        }
    }
}

/// Which entries `count` should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountFilter {
    #[default]
    All,
    Unused,
    Used,
}

/// Aggregate counts over one snapshot of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CodeStats {
    pub total: usize,
    pub unused: usize,
    pub used: usize,
}

impl CodeStats {
    pub fn from_entries(entries: &[CodeEntry]) -> Self {
        let used = entries.iter().filter(|e| e.is_used()).count();
        Self {
            total: entries.len(),
            unused: entries.len() - used,
            used,
        }
    }

    pub fn get(&self, filter: CountFilter) -> usize {
        match filter {
            CountFilter::All => self.total,
            CountFilter::Unused => self.unused,
            CountFilter::Used => self.used,
        }
    }
}
