use crate::error::KVError;
use crate::txn::{Precondition, WriteOp};

/// KVStore provides a key-value storage interface with atomic conditional commits.
///
/// Keys follow a namespaced convention: `codes:entry:ABCD2345EF`,
/// `codes:status:unused:ABCD2345EF`, etc.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Get several keys from one read snapshot, in input order.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, KVError>;

    /// Set a key-value pair unconditionally.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;

    /// Delete every key matching a prefix in one transaction.
    /// Returns the number of keys removed.
    fn delete_prefix(&self, prefix: &str) -> Result<usize, KVError>;

    /// Check all `checks`, then apply all `ops`, in one write transaction.
    ///
    /// The first failing precondition aborts the transaction and is returned as
    /// `KVError::Conflict` carrying the value found under that key.
    fn commit(&self, checks: &[Precondition<'_>], ops: &[WriteOp<'_>]) -> Result<(), KVError>;
}
