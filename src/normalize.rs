//! Code normalization
//!
//! Turns a raw decoded string or manual entry into a candidate lookup key.
//! Pure and deterministic; the only classification rule in the whole
//! pipeline for deciding whether a code is an item ID or a search keyword.

use crate::error::{AppError, AppResult};

/// Candidate lookup key produced from a raw scanned code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedKey {
    /// Positive integer strictly below the configured upper bound
    NumericId(i64),
    /// Anything else, used as a free-text search term
    Keyword(String),
}

impl NormalizedKey {
    /// The string form sent to the catalog keyword search
    pub fn as_search_term(&self) -> String {
        match self {
            NormalizedKey::NumericId(id) => id.to_string(),
            NormalizedKey::Keyword(s) => s.clone(),
        }
    }
}

/// Normalize a raw code into a lookup key.
///
/// Whitespace is trimmed; empty input is rejected. A positive integer
/// strictly below `id_upper_bound` classifies as `NumericId` (the bound
/// keeps pathological huge numbers from being treated as IDs), everything
/// else as `Keyword`.
pub fn normalize(raw: &str, id_upper_bound: i64) -> AppResult<NormalizedKey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyCode);
    }

    match trimmed.parse::<i64>() {
        Ok(n) if n > 0 && n < id_upper_bound => Ok(NormalizedKey::NumericId(n)),
        _ => Ok(NormalizedKey::Keyword(trimmed.to_string())),
    }
}
