//! Catalog search endpoint client

use super::models::{CatalogNode, SearchPage};
use crate::error::{CatalogError, Result};
use crate::network::{HttpClient, Request};
use crate::query::CatalogQuery;
use tracing::debug;

/// Issues search requests and parses the node list
#[derive(Clone)]
pub struct CatalogSearchClient {
    client: HttpClient,
    search_url: String,
}

impl CatalogSearchClient {
    pub fn new(client: HttpClient, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    /// Run one search. An empty node list is a valid answer.
    pub async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogNode>> {
        let url = query.url(&self.search_url);
        let response = self
            .client
            .execute(Request::get(&url).header("Accept", "application/json"))
            .await?;

        if !response.is_success() {
            return Err(CatalogError::network(
                &url,
                format!("HTTP {}", response.status),
            ));
        }

        let page: SearchPage = response.json()?;
        debug!("Catalog returned {} nodes", page.nodes.len());

        Ok(page.nodes)
    }
}
