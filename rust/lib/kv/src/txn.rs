//! Conditional multi-key writes.
//!
//! A commit is a list of preconditions plus a list of write operations. The
//! backend evaluates every precondition and applies every operation inside a
//! single write transaction: either all operations land or none do.

/// A condition checked against the current value of a key before any write
/// in the same commit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition<'a> {
    /// The key must not exist.
    Absent(&'a str),
    /// The key must exist and hold exactly these bytes.
    Equals(&'a str, &'a [u8]),
}

impl<'a> Precondition<'a> {
    pub fn key(&self) -> &'a str {
        match *self {
            Precondition::Absent(key) => key,
            Precondition::Equals(key, _) => key,
        }
    }

    /// Whether the condition holds for the given current value.
    pub fn holds(&self, current: Option<&[u8]>) -> bool {
        match (self, current) {
            (Precondition::Absent(_), None) => true,
            (Precondition::Absent(_), Some(_)) => false,
            (Precondition::Equals(_, expected), Some(actual)) => *expected == actual,
            (Precondition::Equals(_, _), None) => false,
        }
    }
}

/// A write applied by a commit once all preconditions hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp<'a> {
    Put(&'a str, &'a [u8]),
    Delete(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_holds_only_for_missing_key() {
        let check = Precondition::Absent("a");
        assert!(check.holds(None));
        assert!(!check.holds(Some(b"x")));
        assert_eq!(check.key(), "a");
    }

    #[test]
    fn equals_compares_bytes() {
        let check = Precondition::Equals("a", b"v1");
        assert!(check.holds(Some(b"v1")));
        assert!(!check.holds(Some(b"v2")));
        assert!(!check.holds(None));
    }
}
