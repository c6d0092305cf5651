pub mod entry;
pub mod outcome;

pub use entry::{CodeEntry, CodeStatus};
pub use outcome::{CodeStats, CountFilter, RedeemOutcome};
