//! Catalog nodes and display-ready entities

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shown when a node has no tagline
pub const DESCRIPTION_PLACEHOLDER: &str = "Description here";

/// Raw search result as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogNode {
    /// Unique catalog path, `author/slug`
    pub full_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Everything else the catalog sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogNode {
    /// Create a node with just a path and name
    pub fn new(full_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            name: name.into(),
            tagline: None,
            topics: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Author segment of the full path
    pub fn author(&self) -> &str {
        self.full_path.split('/').next().unwrap_or_default()
    }
}

/// Search endpoint payload
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub nodes: Vec<CatalogNode>,
}

/// A fetched image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// Inline `data:` URL for the payload
    pub fn data_url(&self) -> String {
        let mime = self
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A node enriched with its image, ready to render.
///
/// Clones share the image; it is released when the last clone is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEntity {
    pub image: Arc<ImageBlob>,
    pub description: String,
    pub name: String,
    pub full_path: String,
    pub tags: Vec<String>,
    pub author: String,
}

impl DisplayEntity {
    /// Assemble an entity from a node and its fetched image
    pub fn from_node(node: CatalogNode, image: ImageBlob) -> Self {
        let author = node.author().to_string();
        Self {
            image: Arc::new(image),
            description: node
                .tagline
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string()),
            name: node.name,
            full_path: node.full_path,
            tags: node.topics,
            author,
        }
    }

    /// Reference to the locally held image
    pub fn url(&self) -> String {
        self.image.data_url()
    }

    /// Page for this entity on the catalog website
    pub fn catalog_url(&self, site_url: &str) -> String {
        format!("{}/characters/{}", site_url.trim_end_matches('/'), self.full_path)
    }
}
