//! Error types for catalog search, enrichment and import

use thiserror::Error;

/// Errors surfaced by the search and import pipeline
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure, or a non-success status from an endpoint
    /// that has no fallback
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The response could not be parsed into the expected shape
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// Both the primary and the backup per-item fetch failed
    #[error("could not fetch \"{full_path}\": {}", .attempts.join("; "))]
    EntityFetch {
        full_path: String,
        attempts: Vec<String>,
    },

    /// Both import endpoints failed
    #[error("import of \"{url}\" failed; view it at {catalog_link}")]
    ImportFailed { url: String, catalog_link: String },

    /// The import succeeded but declared a content type we don't handle
    #[error("unsupported content type \"{content_type}\" for {file_name}")]
    UnsupportedContentType {
        content_type: String,
        file_name: String,
    },

    /// The host ingestion callback rejected the imported file
    #[error("host could not ingest {file_name}: {message}")]
    IngestFailed { file_name: String, message: String },
}

impl CatalogError {
    pub(crate) fn network(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_fetch_message_lists_attempts() {
        let err = CatalogError::EntityFetch {
            full_path: "alice/elf".to_string(),
            attempts: vec!["download: HTTP 500".to_string(), "avatar: HTTP 404".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("alice/elf"));
        assert!(msg.contains("download: HTTP 500; avatar: HTTP 404"));
    }

    #[test]
    fn test_import_failed_carries_link() {
        let err = CatalogError::ImportFailed {
            url: "alice/elf".to_string(),
            catalog_link: "https://chub.ai/characters/alice/elf".to_string(),
        };
        assert!(err.to_string().contains("https://chub.ai/characters/alice/elf"));
    }
}
