//! Host import endpoint client

use super::CHARACTER_CONTENT_TYPE;
use crate::catalog::DisplayEntity;
use crate::config::{CatalogSettings, Settings};
use crate::error::{CatalogError, Result};
use crate::metrics::Metrics;
use crate::network::{FallbackChain, HeaderProvider, HttpClient, Request};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

/// Label of the primary import endpoint
pub const IMPORT_ENDPOINT: &str = "import";
/// Label of the legacy import endpoint
pub const LEGACY_IMPORT_ENDPOINT: &str = "import-legacy";

/// A file returned by the host's import endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub name: String,
    /// MIME type of the body, when the host declared one
    pub mime_type: Option<String>,
    /// Host-specific content kind (`X-Custom-Content-Type`)
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The host's dropped-file processor
#[async_trait]
pub trait FileIngestor: Send + Sync {
    async fn ingest(&self, file: ImportedFile) -> anyhow::Result<()>;
}

/// Posts import requests to the host and forwards the result
pub struct ImportClient {
    client: HttpClient,
    primary: Url,
    legacy: Url,
    catalog: CatalogSettings,
    headers: Arc<dyn HeaderProvider>,
    metrics: Arc<Metrics>,
}

impl ImportClient {
    pub fn new(
        client: HttpClient,
        settings: &Settings,
        headers: Arc<dyn HeaderProvider>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            primary: settings.host.endpoint(&settings.host.import_path)?,
            legacy: settings.host.endpoint(&settings.host.legacy_import_path)?,
            catalog: settings.catalog.clone(),
            headers,
            metrics,
        })
    }

    /// Import the item behind a catalog URL (or `author/slug` path) and
    /// hand it to `ingestor`. Returns the imported file name.
    pub async fn import_by_url(&self, url: &str, ingestor: &dyn FileIngestor) -> Result<String> {
        let url = url.trim();
        let payload = serde_json::json!({ "url": url });
        let headers = self.headers.request_headers();

        let chain = FallbackChain::new()
            .then(
                IMPORT_ENDPOINT,
                Request::post(self.primary.as_str())
                    .headers(headers.clone())
                    .json(payload.clone()),
            )
            .then(
                LEGACY_IMPORT_ENDPOINT,
                Request::post(self.legacy.as_str())
                    .headers(headers)
                    .json(payload),
            );

        let success = match chain.run(&self.client).await {
            Ok(success) => success,
            Err(failures) => {
                for failure in &failures {
                    self.metrics.record_error(failure.label);
                }
                let catalog_link = self.catalog.page_url(url);
                error!("Import of {} failed; see {}", url, catalog_link);
                return Err(CatalogError::ImportFailed {
                    url: url.to_string(),
                    catalog_link,
                });
            }
        };

        for failure in &success.failures {
            self.metrics.record_error(failure.label);
        }
        self.metrics.record_success(success.label, success.elapsed);

        let response = success.response;
        let file_name = response
            .header("content-disposition")
            .and_then(parse_content_disposition)
            .unwrap_or_else(|| fallback_file_name(url));
        let content_type = response
            .header("x-custom-content-type")
            .unwrap_or_default()
            .to_string();
        let mime_type = response.header("content-type").map(String::from);

        if content_type != CHARACTER_CONTENT_TYPE {
            warn!("Unknown content type '{}' for {}", content_type, file_name);
            return Err(CatalogError::UnsupportedContentType {
                content_type,
                file_name,
            });
        }

        let file = ImportedFile {
            name: file_name.clone(),
            mime_type,
            content_type,
            bytes: response.body,
        };

        ingestor
            .ingest(file)
            .await
            .map_err(|e| CatalogError::IngestFailed {
                file_name: file_name.clone(),
                message: e.to_string(),
            })?;

        info!("Imported {} via {}", file_name, success.label);
        Ok(file_name)
    }

    /// Import an entity from a search result
    pub async fn import_entity(
        &self,
        entity: &DisplayEntity,
        ingestor: &dyn FileIngestor,
    ) -> Result<String> {
        let url = entity.catalog_url(&self.catalog.site_url);
        self.import_by_url(&url, ingestor).await
    }
}

/// Extract the file name from a `Content-Disposition` header value
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let name = value
        .split("filename=")
        .nth(1)?
        .split(';')
        .next()?
        .trim()
        .replace('"', "");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn fallback_file_name(url: &str) -> String {
    let slug = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("import");
    format!("{}.png", slug)
}
