//! Code alphabet and canonical form.
//!
//! Codes are read off paper and typed back by people, so the alphabet drops
//! the glyphs that are easy to confuse: `I`/`1` and `O`/`0`. That leaves 24
//! letters and 8 digits (32 symbols, 5 bits per character).

/// Code alphabet (32 symbols).
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Shortest accepted code length.
pub const MIN_CODE_LENGTH: usize = 8;

/// Longest accepted code length.
pub const MAX_CODE_LENGTH: usize = 12;

/// Default code length: 32^10 ≈ 1.1e15 possible codes.
pub const DEFAULT_CODE_LENGTH: usize = 10;

/// Longest accepted batch id.
pub const MAX_BATCH_ID_LEN: usize = 64;

/// Bring typed or scanned input to canonical form: surrounding whitespace
/// trimmed, letters upper-cased.
pub fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Whether `id` is a well-formed code: canonical, of an accepted length, and
/// made only of alphabet symbols.
pub fn is_canonical(id: &str) -> bool {
    (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&id.len())
        && id.bytes().all(|b| ALPHABET.contains(&b))
}

/// Check a batch id before it becomes part of storage keys.
pub fn validate_batch_id(batch_id: &str) -> Result<(), String> {
    if batch_id.is_empty() {
        return Err("batch id must not be empty".into());
    }
    if batch_id.len() > MAX_BATCH_ID_LEN {
        return Err(format!(
            "batch id must be at most {} characters",
            MAX_BATCH_ID_LEN
        ));
    }
    if batch_id.contains(':') || batch_id.chars().any(char::is_whitespace) {
        return Err(format!(
            "batch id '{}' must not contain ':' or whitespace",
            batch_id
        ));
    }
    Ok(())
}
