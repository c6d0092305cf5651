//! Batch code generation.
//!
//! Candidates are drawn from a [`CandidateSource`], deduplicated within the
//! batch, checked against the registry, and committed as one atomic insert.
//! Every draw counts against a fixed budget, so a source that keeps producing
//! collisions ends in `GenerationFailed` instead of looping forever.

use std::collections::HashSet;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voucher_core::new_id;

use super::alphabet::{
    ALPHABET, DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, MIN_CODE_LENGTH, is_canonical,
    validate_batch_id,
};
use crate::error::CodeError;
use crate::model::CodeEntry;
use crate::store::RegistryStore;

/// Default number of codes per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Largest batch accepted in one request.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Default draw budget per requested code.
pub const DEFAULT_MAX_DRAWS_PER_CODE: usize = 16;

/// Produces candidate code strings.
pub trait CandidateSource: Send {
    /// Draw one candidate of `length` symbols.
    fn next_candidate(&mut self, length: usize) -> String;
}

/// Uniform random draws from [`ALPHABET`].
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source, for tests and reproducible fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSource for RandomSource {
    fn next_candidate(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Symbols per code (8..=12).
    pub code_length: usize,
    /// Batch size used when the caller does not give one.
    pub batch_size: usize,
    /// Draw budget per requested code.
    pub max_draws_per_code: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            max_draws_per_code: DEFAULT_MAX_DRAWS_PER_CODE,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), CodeError> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.code_length) {
            return Err(CodeError::Validation(format!(
                "code length must be between {} and {}, got {}",
                MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.code_length
            )));
        }
        validate_batch_size(self.batch_size)?;
        if self.max_draws_per_code == 0 {
            return Err(CodeError::Validation(
                "max draws per code must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn validate_batch_size(size: usize) -> Result<(), CodeError> {
    if size == 0 || size > MAX_BATCH_SIZE {
        return Err(CodeError::Validation(format!(
            "batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, size
        )));
    }
    Ok(())
}

/// Fresh batch id: `BATCH-<unix millis>-<6 hex>`.
pub fn new_batch_id() -> String {
    format!(
        "BATCH-{}-{}",
        Utc::now().timestamp_millis(),
        new_id()[..6].to_uppercase()
    )
}

/// Generates batches of unique codes and commits them to a registry.
pub struct CodeGenerator {
    config: GeneratorConfig,
    source: Mutex<Box<dyn CandidateSource>>,
}

impl CodeGenerator {
    /// Generator drawing from OS-seeded randomness.
    pub fn new(config: GeneratorConfig) -> Result<Self, CodeError> {
        Self::with_source(config, Box::new(RandomSource::new()))
    }

    pub fn with_source(
        config: GeneratorConfig,
        source: Box<dyn CandidateSource>,
    ) -> Result<Self, CodeError> {
        config.validate()?;
        Ok(Self {
            config,
            source: Mutex::new(source),
        })
    }

    /// Generate and commit one batch.
    ///
    /// `size` defaults to the configured batch size and `batch_id` to
    /// [`new_batch_id`]. Returns the committed entries in draw order.
    pub async fn generate(
        &self,
        store: &RegistryStore,
        size: Option<usize>,
        batch_id: Option<String>,
    ) -> Result<Vec<CodeEntry>, CodeError> {
        let size = size.unwrap_or(self.config.batch_size);
        validate_batch_size(size)?;
        let batch_id = batch_id.unwrap_or_else(new_batch_id);
        validate_batch_id(&batch_id).map_err(CodeError::Validation)?;

        let budget = size.saturating_mul(self.config.max_draws_per_code);
        let mut attempts = 0usize;
        // Every id ever drawn for this batch, kept or rejected.
        let mut drawn: HashSet<String> = HashSet::with_capacity(size);
        let mut codes: Vec<String> = Vec::with_capacity(size);

        // Held for the whole batch: batches are generated one at a time.
        let mut source = self.source.lock().await;

        loop {
            while codes.len() < size {
                if attempts >= budget {
                    warn!(
                        "generation of {} codes gave up after {} draws",
                        size, attempts
                    );
                    return Err(CodeError::GenerationFailed {
                        requested: size,
                        attempts,
                    });
                }
                attempts += 1;

                let candidate = source.next_candidate(self.config.code_length);
                if candidate.len() != self.config.code_length || !is_canonical(&candidate) {
                    debug!("discarding malformed candidate {:?}", candidate);
                    continue;
                }
                if drawn.insert(candidate.clone()) {
                    codes.push(candidate);
                }
            }

            let existing = store.existing(codes.clone()).await?;
            if !existing.is_empty() {
                debug!("{} candidates already in registry, redrawing", existing.len());
                codes.retain(|c| !existing.contains(c));
                continue;
            }

            let created_at = Utc::now();
            let entries: Vec<CodeEntry> = codes
                .iter()
                .map(|id| CodeEntry::unused(id.clone(), batch_id.clone(), created_at))
                .collect();

            match store.insert_batch(entries.clone()).await {
                Ok(()) => {
                    info!(
                        "generated batch {} with {} codes ({} draws)",
                        batch_id, size, attempts
                    );
                    return Ok(entries);
                }
                // Someone inserted one of our ids after the existence check.
                // Nothing was written; replace the colliding ids and commit again.
                Err(CodeError::DuplicateId(ids)) => {
                    warn!("{} ids collided at commit, redrawing", ids.len());
                    codes.retain(|c| !ids.contains(c));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
