pub mod error;
pub mod redb;
pub mod traits;
pub mod txn;

pub use crate::error::KVError;
pub use crate::redb::RedbStore;
pub use crate::traits::KVStore;
pub use crate::txn::{Precondition, WriteOp};
