use thiserror::Error;

#[derive(Error, Debug)]
pub enum KVError {
    #[error("storage error: {0}")]
    Storage(String),

    /// A commit precondition did not hold. Nothing was written.
    /// `current` is the value found under `key` at commit time.
    #[error("precondition failed for key: {key}")]
    Conflict {
        key: String,
        current: Option<Vec<u8>>,
    },
}

impl KVError {
    pub(crate) fn storage<E: std::fmt::Display>(e: E) -> Self {
        KVError::Storage(e.to_string())
    }
}
