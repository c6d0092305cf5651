use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::KVError;
use crate::traits::KVStore;
use crate::txn::{Precondition, WriteOp};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// RedbStore is a KVStore implementation backed by redb, a pure-Rust embedded
/// key-value database with ACID transactions. Write transactions are
/// serialized by redb, which is what makes `commit` atomic.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(KVError::storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(KVError::storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(KVError::storage)?;
        }
        write_txn.commit().map_err(KVError::storage)?;

        debug!("RedbStore: opened {:?}", path);
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(KVError::storage)?;
        let table = read_txn.open_table(TABLE).map_err(KVError::storage)?;

        match table.get(key) {
            Ok(Some(val)) => Ok(Some(val.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(KVError::storage(e)),
        }
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>, KVError> {
        let read_txn = self.db.begin_read().map_err(KVError::storage)?;
        let table = read_txn.open_table(TABLE).map_err(KVError::storage)?;

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let value = table
                .get(*key)
                .map_err(KVError::storage)?
                .map(|val| val.value().to_vec());
            results.push(value);
        }
        Ok(results)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(KVError::storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(KVError::storage)?;
            table.insert(key, value).map_err(KVError::storage)?;
        }
        write_txn.commit().map_err(KVError::storage)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(KVError::storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(KVError::storage)?;
            table.remove(key).map_err(KVError::storage)?;
        }
        write_txn.commit().map_err(KVError::storage)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(KVError::storage)?;
        let table = read_txn.open_table(TABLE).map_err(KVError::storage)?;

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(KVError::storage)?;

        for entry in iter {
            let entry = entry.map_err(KVError::storage)?;
            let key = entry.0.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            let value = entry.1.value().to_vec();
            results.push((key, value));
        }

        Ok(results)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize, KVError> {
        let write_txn = self.db.begin_write().map_err(KVError::storage)?;
        let removed;
        {
            let mut table = write_txn.open_table(TABLE).map_err(KVError::storage)?;

            // Collect first: the range borrows the table.
            let mut keys = Vec::new();
            for entry in table.range(prefix..).map_err(KVError::storage)? {
                let entry = entry.map_err(KVError::storage)?;
                let key = entry.0.value().to_string();
                if !key.starts_with(prefix) {
                    break;
                }
                keys.push(key);
            }

            for key in &keys {
                table.remove(key.as_str()).map_err(KVError::storage)?;
            }
            removed = keys.len();
        }
        write_txn.commit().map_err(KVError::storage)?;

        debug!("RedbStore: deleted {} keys with prefix {:?}", removed, prefix);
        Ok(removed)
    }

    fn commit(&self, checks: &[Precondition<'_>], ops: &[WriteOp<'_>]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(KVError::storage)?;
        let mut conflict = None;
        {
            let mut table = write_txn.open_table(TABLE).map_err(KVError::storage)?;

            for check in checks {
                let current = table
                    .get(check.key())
                    .map_err(KVError::storage)?
                    .map(|val| val.value().to_vec());
                if !check.holds(current.as_deref()) {
                    conflict = Some(KVError::Conflict {
                        key: check.key().to_string(),
                        current,
                    });
                    break;
                }
            }

            if conflict.is_none() {
                for op in ops {
                    match *op {
                        WriteOp::Put(key, value) => {
                            table.insert(key, value).map_err(KVError::storage)?;
                        }
                        WriteOp::Delete(key) => {
                            table.remove(key).map_err(KVError::storage)?;
                        }
                    }
                }
            }
        }

        if let Some(err) = conflict {
            write_txn.abort().map_err(KVError::storage)?;
            return Err(err);
        }

        write_txn.commit().map_err(KVError::storage)?;
        Ok(())
    }
}
