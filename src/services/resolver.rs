//! Catalog resolution with deterministic tie-breaking
//!
//! Turns a scanned or typed code into exactly one catalog record. The
//! tie-break is a reproducibility contract: keyword search first, then the
//! first result in the page's returned order wins, with an ID fallback
//! only for numeric codes.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::ResolvedItem,
    normalize::{normalize, NormalizedKey},
    services::catalog::CatalogClient,
};

/// One resolved scan, with how many candidates the search page held
#[derive(Debug, Clone)]
pub struct Resolution {
    pub item: ResolvedItem,
    /// Number of results in the search page; > 1 means the first-in-page
    /// tie-break applied
    pub match_count: usize,
}

#[derive(Clone)]
pub struct CatalogResolver {
    catalog: Arc<dyn CatalogClient>,
    page_size: u32,
    id_upper_bound: i64,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>, page_size: u32, id_upper_bound: i64) -> Self {
        Self {
            catalog,
            page_size,
            id_upper_bound,
        }
    }

    pub fn id_upper_bound(&self) -> i64 {
        self.id_upper_bound
    }

    /// Resolve a raw code to one item.
    ///
    /// 1. Keyword search with the code as search term, one bounded page.
    /// 2. One result: return it. Several: return the first in page order.
    /// 3. Zero results: direct ID lookup, but only for a numeric code.
    ///
    /// `NotFound` and `LookupFailed` stay distinct so the mode engine can
    /// apply its SEARCH auto-resume policy.
    pub async fn resolve(&self, raw: &str) -> AppResult<Resolution> {
        let key = normalize(raw, self.id_upper_bound)?;
        let term = key.as_search_term();

        let page = self
            .catalog
            .search(&term, false, 0, self.page_size)
            .await?;
        let match_count = page.content.len();

        if let Some(first) = page.content.into_iter().next() {
            if match_count > 1 {
                tracing::debug!(
                    "Ambiguous code '{}': {} matches, picking first in page order",
                    term,
                    match_count
                );
            }
            return Ok(Resolution {
                item: first,
                match_count,
            });
        }

        match key {
            NormalizedKey::NumericId(id) => {
                tracing::debug!("No keyword match for '{}', falling back to id lookup", term);
                let item = self.catalog.get_by_id(id).await?;
                Ok(Resolution {
                    item,
                    match_count: 1,
                })
            }
            NormalizedKey::Keyword(_) => Err(AppError::NotFound(format!(
                "No item matches code '{}'",
                term
            ))),
        }
    }
}
