//! Catalog item types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Immutable snapshot of a catalog record as returned by a lookup.
///
/// Resolved items are value objects: freely copied, never mutated, never
/// cached across scans (freshness over consistency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedItem {
    pub id: i32,
    pub name: String,
    pub isbn: Option<String>,
    #[serde(default)]
    pub available_copies: i32,
}

/// Typed result envelope for paged catalog responses.
///
/// The catalog adapter always normalizes backend responses to this one
/// shape; business logic never sees alternative response layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total: 0,
        }
    }
}
