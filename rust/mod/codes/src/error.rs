use thiserror::Error;

use voucher_core::ServiceError;
use voucher_kv::KVError;

/// Failures of registry and generator operations.
///
/// `NotFound` and `AlreadyUsed` are not errors: they are outcomes of
/// redemption, see [`crate::model::RedeemOutcome`].
#[derive(Error, Debug)]
pub enum CodeError {
    /// A batch insert collided with ids already present (or repeated in the
    /// batch). Nothing was written.
    #[error("duplicate code id(s): {}", .0.join(", "))]
    DuplicateId(Vec<String>),

    /// The generator ran out of draws before collecting enough unique ids.
    #[error("could not generate {requested} unique codes within {attempts} draws")]
    GenerationFailed { requested: usize, attempts: usize },

    #[error("invalid input: {0}")]
    Validation(String),

    /// The durable medium failed or returned data that cannot be decoded.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<KVError> for CodeError {
    fn from(err: KVError) -> Self {
        CodeError::StorageUnavailable(err.to_string())
    }
}

impl From<CodeError> for ServiceError {
    fn from(err: CodeError) -> Self {
        let msg = err.to_string();
        match err {
            CodeError::DuplicateId(_) => ServiceError::Conflict(msg),
            CodeError::GenerationFailed { .. } => ServiceError::Internal(msg),
            CodeError::Validation(_) => ServiceError::Validation(msg),
            CodeError::StorageUnavailable(_) => ServiceError::Storage(msg),
        }
    }
}
