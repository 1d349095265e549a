//! Catalog Lookup Service adapter
//!
//! The `CatalogClient` port is the only way the scanner talks to the
//! catalog. Every backend response is normalized to the typed `Page`
//! envelope before it reaches business logic.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Page, ResolvedItem},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Keyword search over the catalog, bounded by `page_size`
    async fn search(
        &self,
        keyword: &str,
        available_only: bool,
        page: u32,
        page_size: u32,
    ) -> AppResult<Page<ResolvedItem>>;

    /// Direct lookup by item id
    async fn get_by_id(&self, id: i64) -> AppResult<ResolvedItem>;
}

/// Raw paged response as the catalog backend actually ships it
#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    content: Vec<ResolvedItem>,
    #[serde(default)]
    total: Option<i64>,
}

/// HTTP implementation over the catalog REST API
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search(
        &self,
        keyword: &str,
        available_only: bool,
        page: u32,
        page_size: u32,
    ) -> AppResult<Page<ResolvedItem>> {
        let url = format!("{}/items", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search", keyword),
                ("available", &available_only.to_string()),
                ("page", &page.to_string()),
                ("page_size", &page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::LookupFailed(format!("Catalog search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::LookupFailed(format!(
                "Catalog search returned {}",
                response.status()
            )));
        }

        let raw: RawPage = response
            .json()
            .await
            .map_err(|e| AppError::LookupFailed(format!("Invalid catalog response: {}", e)))?;

        let total = raw.total.unwrap_or(raw.content.len() as i64);
        Ok(Page {
            content: raw.content,
            total,
        })
    }

    async fn get_by_id(&self, id: i64) -> AppResult<ResolvedItem> {
        let url = format!("{}/items/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::LookupFailed(format!("Catalog lookup request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("No item with id {}", id)));
        }
        if !response.status().is_success() {
            return Err(AppError::LookupFailed(format!(
                "Catalog lookup returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::LookupFailed(format!("Invalid catalog response: {}", e)))
    }
}
