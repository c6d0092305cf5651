use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Code lifecycle status. Moves from `Unused` to `Used` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeStatus {
    Unused,
    Used,
}

impl CodeStatus {
    /// Lowercase form used in storage index keys and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeStatus::Unused => "unused",
            CodeStatus::Used => "used",
        }
    }
}

impl std::str::FromStr for CodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unused" => Ok(CodeStatus::Unused),
            "used" => Ok(CodeStatus::Used),
            other => Err(format!("unknown code status '{}'", other)),
        }
    }
}

impl std::fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One single-use code and its redemption state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeEntry {
    /// Canonical code text (uppercase, restricted alphabet).
    pub id: String,

    pub status: CodeStatus,

    pub created_at: DateTime<Utc>,

    /// Set exactly when `status` is `Used`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,

    /// Generation batch this code belongs to.
    pub batch_id: String,
}

impl CodeEntry {
    /// A fresh, unused entry.
    pub fn unused(id: String, batch_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: CodeStatus::Unused,
            created_at,
            used_at: None,
            batch_id,
        }
    }

    pub fn is_used(&self) -> bool {
        self.status == CodeStatus::Used
    }

    /// `status` and `used_at` agree with each other.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            CodeStatus::Unused => self.used_at.is_none(),
            CodeStatus::Used => self.used_at.is_some(),
        }
    }

    /// The same entry, marked used at `at`. Both fields change together.
    pub(crate) fn redeemed_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            status: CodeStatus::Used,
            used_at: Some(at),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeEntry {
        let created = DateTime::parse_from_rfc3339("2025-06-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        CodeEntry::unused("ABCD2345EF".into(), "B1".into(), created)
    }

    #[test]
    fn json_uses_camel_case_and_upper_status() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "ABCD2345EF");
        assert_eq!(json["status"], "UNUSED");
        assert_eq!(json["batchId"], "B1");
        assert_eq!(json["createdAt"], "2025-06-01T08:00:00Z");
        assert!(json.get("usedAt").is_none());
    }

    #[test]
    fn redeem_sets_status_and_time_together() {
        let entry = sample();
        assert!(entry.is_consistent());
        assert!(!entry.is_used());

        let at = Utc::now();
        let used = entry.redeemed_at(at);
        assert!(used.is_used());
        assert_eq!(used.used_at, Some(at));
        assert!(used.is_consistent());
        assert_eq!(used.id, entry.id);
        assert_eq!(used.created_at, entry.created_at);
        assert_eq!(used.batch_id, entry.batch_id);
    }

    #[test]
    fn inconsistent_pairs_are_detected() {
        let mut entry = sample();
        entry.status = CodeStatus::Used;
        assert!(!entry.is_consistent());

        let mut entry = sample();
        entry.used_at = Some(Utc::now());
        assert!(!entry.is_consistent());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("UNUSED".parse::<CodeStatus>().unwrap(), CodeStatus::Unused);
        assert_eq!(" used ".parse::<CodeStatus>().unwrap(), CodeStatus::Used);
        assert!("redeemed".parse::<CodeStatus>().is_err());
    }
}
