//! Registry store: durable code entries with atomic state transitions.
//!
//! Key layout in the KV backend:
//!
//! ```text
//! codes:entry:{id}              → JSON CodeEntry
//! codes:status:{unused|used}:{id} → ""   (status index)
//! codes:batch:{batch_id}:{id}   → ""   (batch index)
//! ```
//!
//! An entry and its status index key always change in the same commit.
//! Redemption is a compare-and-swap on the exact bytes read, so of any number
//! of concurrent redemptions of one code only one commit can succeed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use voucher_kv::{KVError, KVStore, Precondition, WriteOp};

use crate::code::alphabet::{is_canonical, normalize, validate_batch_id};
use crate::error::CodeError;
use crate::model::{CodeEntry, CodeStats, CodeStatus, CountFilter, RedeemOutcome};

const PREFIX: &str = "codes:";
const ENTRY_PREFIX: &str = "codes:entry:";

pub(crate) fn entry_key(id: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, id)
}

fn status_prefix(status: CodeStatus) -> String {
    format!("codes:status:{}:", status.as_str())
}

fn status_key(status: CodeStatus, id: &str) -> String {
    format!("{}{}", status_prefix(status), id)
}

fn batch_prefix(batch_id: &str) -> String {
    format!("codes:batch:{}:", batch_id)
}

fn batch_key(batch_id: &str, id: &str) -> String {
    format!("{}{}", batch_prefix(batch_id), id)
}

fn encode(entry: &CodeEntry) -> Result<Vec<u8>, CodeError> {
    serde_json::to_vec(entry)
        .map_err(|e| CodeError::StorageUnavailable(format!("encode entry {}: {}", entry.id, e)))
}

/// Decode a stored entry. Undecodable or self-contradicting records are
/// corruption, never "not found".
fn decode(key: &str, bytes: &[u8]) -> Result<CodeEntry, CodeError> {
    let entry: CodeEntry = serde_json::from_slice(bytes)
        .map_err(|e| CodeError::StorageUnavailable(format!("corrupt record {}: {}", key, e)))?;
    if !entry.is_consistent() {
        return Err(CodeError::StorageUnavailable(format!(
            "corrupt record {}: status {} disagrees with usedAt",
            key, entry.status
        )));
    }
    Ok(entry)
}

/// Newest first; ties broken by id so repeated reads are identical.
fn sort_entries(entries: &mut [CodeEntry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Persistent registry of code entries. Cheap to clone; clones share the
/// backend.
#[derive(Clone)]
pub struct RegistryStore {
    kv: Arc<dyn KVStore>,
}

impl RegistryStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    /// Run a storage closure on the blocking pool.
    ///
    /// If the caller drops the returned future, the closure still runs to
    /// completion, so a started transaction is never cut in half.
    async fn blocking<T, F>(&self, f: F) -> Result<T, CodeError>
    where
        F: FnOnce(&dyn KVStore) -> Result<T, CodeError> + Send + 'static,
        T: Send + 'static,
    {
        let kv = Arc::clone(&self.kv);
        tokio::task::spawn_blocking(move || f(kv.as_ref()))
            .await
            .map_err(|e| CodeError::StorageUnavailable(format!("storage task failed: {}", e)))?
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a batch of fresh entries: all of them or none.
    ///
    /// Fails with `DuplicateId` when any id is already stored or appears twice
    /// in `entries`; the error lists the offending ids.
    pub async fn insert_batch(&self, entries: Vec<CodeEntry>) -> Result<(), CodeError> {
        let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());
        let mut repeated = Vec::new();
        for entry in &entries {
            if !is_canonical(&entry.id) {
                return Err(CodeError::Validation(format!(
                    "'{}' is not a well-formed code",
                    entry.id
                )));
            }
            if entry.is_used() || !entry.is_consistent() {
                return Err(CodeError::Validation(format!(
                    "code '{}' must be inserted unused",
                    entry.id
                )));
            }
            validate_batch_id(&entry.batch_id).map_err(CodeError::Validation)?;
            if !seen.insert(entry.id.clone()) {
                repeated.push(entry.id.clone());
            }
        }
        if !repeated.is_empty() {
            return Err(CodeError::DuplicateId(repeated));
        }
        if entries.is_empty() {
            return Ok(());
        }

        self.blocking(move |kv| {
            let mut rows = Vec::with_capacity(entries.len());
            for entry in &entries {
                rows.push((
                    entry_key(&entry.id),
                    status_key(CodeStatus::Unused, &entry.id),
                    batch_key(&entry.batch_id, &entry.id),
                    encode(entry)?,
                ));
            }

            let checks: Vec<Precondition<'_>> = rows
                .iter()
                .map(|(key, _, _, _)| Precondition::Absent(key))
                .collect();
            let mut ops = Vec::with_capacity(rows.len() * 3);
            for (key, status, batch, bytes) in &rows {
                ops.push(WriteOp::Put(key, bytes));
                ops.push(WriteOp::Put(status, b""));
                ops.push(WriteOp::Put(batch, b""));
            }

            match kv.commit(&checks, &ops) {
                Ok(()) => {
                    info!("inserted {} codes", entries.len());
                    Ok(())
                }
                Err(KVError::Conflict { key, .. }) => {
                    let keys: Vec<&str> = rows.iter().map(|(key, _, _, _)| key.as_str()).collect();
                    let found = kv.get_many(&keys)?;
                    let mut ids: Vec<String> = entries
                        .iter()
                        .zip(found)
                        .filter(|(_, current)| current.is_some())
                        .map(|(entry, _)| entry.id.clone())
                        .collect();
                    if ids.is_empty() {
                        ids.push(key.trim_start_matches(ENTRY_PREFIX).to_string());
                    }
                    warn!("batch insert rejected, {} ids already exist", ids.len());
                    Err(CodeError::DuplicateId(ids))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Redeem a code: the one atomic UNUSED → USED transition.
    ///
    /// Exactly one of any number of concurrent calls for the same code gets
    /// `Redeemed`; every other call gets `AlreadyUsed` with the winner's time.
    /// A failed commit is never retried.
    pub async fn redeem(&self, input: &str) -> Result<RedeemOutcome, CodeError> {
        let id = normalize(input);
        if id.is_empty() {
            return Ok(RedeemOutcome::NotFound { id });
        }
        self.blocking(move |kv| redeem_in(kv, id)).await
    }

    /// Destroy every entry and index key.
    pub async fn clear_all(&self) -> Result<(), CodeError> {
        let removed = self.blocking(|kv| Ok(kv.delete_prefix(PREFIX)?)).await?;
        warn!("registry cleared, {} keys removed", removed);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current snapshot of a code, matched after normalization.
    pub async fn lookup(&self, input: &str) -> Result<Option<CodeEntry>, CodeError> {
        let id = normalize(input);
        if id.is_empty() {
            return Ok(None);
        }
        self.blocking(move |kv| {
            let key = entry_key(&id);
            match kv.get(&key)? {
                Some(bytes) => Ok(Some(decode(&key, &bytes)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Ids among `ids` that are already stored. Used by the generator.
    pub async fn existing(&self, ids: Vec<String>) -> Result<HashSet<String>, CodeError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.blocking(move |kv| {
            let keys: Vec<String> = ids.iter().map(|id| entry_key(id)).collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let found = kv.get_many(&key_refs)?;
            Ok(ids
                .into_iter()
                .zip(found)
                .filter(|(_, current)| current.is_some())
                .map(|(id, _)| id)
                .collect())
        })
        .await
    }

    /// All entries, newest first.
    pub async fn list_all(&self) -> Result<Vec<CodeEntry>, CodeError> {
        self.blocking(|kv| {
            let mut entries = kv
                .scan(ENTRY_PREFIX)?
                .into_iter()
                .map(|(key, bytes)| decode(&key, &bytes))
                .collect::<Result<Vec<_>, _>>()?;
            sort_entries(&mut entries);
            Ok(entries)
        })
        .await
    }

    /// Entries with the given status, newest first.
    pub async fn list_by_status(&self, status: CodeStatus) -> Result<Vec<CodeEntry>, CodeError> {
        self.list_indexed(status_prefix(status), move |e| e.status == status)
            .await
    }

    /// Entries of one generation batch, newest first.
    pub async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<CodeEntry>, CodeError> {
        validate_batch_id(batch_id).map_err(CodeError::Validation)?;
        let wanted = batch_id.to_string();
        self.list_indexed(batch_prefix(batch_id), move |e| e.batch_id == wanted)
            .await
    }

    /// Number of entries matching `filter`, derived from `list_all`.
    pub async fn count(&self, filter: CountFilter) -> Result<usize, CodeError> {
        Ok(self.stats().await?.get(filter))
    }

    /// Total / unused / used counts from one snapshot.
    pub async fn stats(&self) -> Result<CodeStats, CodeError> {
        let entries = self.list_all().await?;
        Ok(CodeStats::from_entries(&entries))
    }

    /// Resolve an index prefix to entries. The index and the entries are read
    /// separately, so entries are re-checked with `keep`.
    async fn list_indexed<F>(&self, prefix: String, keep: F) -> Result<Vec<CodeEntry>, CodeError>
    where
        F: Fn(&CodeEntry) -> bool + Send + 'static,
    {
        self.blocking(move |kv| {
            let keys: Vec<String> = kv
                .scan(&prefix)?
                .into_iter()
                .map(|(key, _)| entry_key(&key[prefix.len()..]))
                .collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let found = kv.get_many(&key_refs)?;

            let mut entries = Vec::with_capacity(found.len());
            for (key, bytes) in keys.iter().zip(found) {
                if let Some(bytes) = bytes {
                    let entry = decode(key, &bytes)?;
                    if keep(&entry) {
                        entries.push(entry);
                    }
                }
            }
            sort_entries(&mut entries);
            Ok(entries)
        })
        .await
    }
}

fn redeem_in(kv: &dyn KVStore, id: String) -> Result<RedeemOutcome, CodeError> {
    let key = entry_key(&id);
    let Some(raw) = kv.get(&key)? else {
        debug!("redeem {}: not found", id);
        return Ok(RedeemOutcome::NotFound { id });
    };

    let entry = decode(&key, &raw)?;
    if let Some(used_at) = entry.used_at {
        debug!("redeem {}: already used at {}", id, used_at);
        return Ok(RedeemOutcome::AlreadyUsed { id, used_at });
    }

    let redeemed = entry.redeemed_at(Utc::now());
    let bytes = encode(&redeemed)?;
    let unused_key = status_key(CodeStatus::Unused, &id);
    let used_key = status_key(CodeStatus::Used, &id);

    let result = kv.commit(
        &[Precondition::Equals(&key, &raw)],
        &[
            WriteOp::Put(&key, &bytes),
            WriteOp::Delete(&unused_key),
            WriteOp::Put(&used_key, b""),
        ],
    );

    match result {
        Ok(()) => {
            info!("code {} redeemed", id);
            Ok(RedeemOutcome::Redeemed { entry: redeemed })
        }
        // Another writer changed the entry between our read and our commit.
        // Nothing of ours was written; report what is there now.
        Err(KVError::Conflict { current, .. }) => match current {
            None => Ok(RedeemOutcome::NotFound { id }),
            Some(bytes) => match decode(&key, &bytes)?.used_at {
                Some(used_at) => {
                    debug!("redeem {}: lost race, used at {}", id, used_at);
                    Ok(RedeemOutcome::AlreadyUsed { id, used_at })
                }
                None => Err(CodeError::StorageUnavailable(format!(
                    "record {} changed concurrently but is still unused",
                    key
                ))),
            },
        },
        Err(e) => Err(e.into()),
    }
}
