//! Search query building
//!
//! Turns a structured [`SearchRequest`] into the catalog's query string:
//! - Page size comes from the user's `findCount` preference
//! - Tag lists drop empty entries, are comma-joined and cut to 100 characters
//! - Fixed catalog flags are always sent

use crate::config::ExtensionSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest tag list, in characters, the catalog accepts
pub const MAX_TAGS_LEN: usize = 100;

/// Structured search filters from the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Free-text search term
    pub search_term: String,
    /// Tags results must carry
    pub include_tags: Vec<String>,
    /// Tags results must not carry
    pub exclude_tags: Vec<String>,
    /// Ask for NSFW results
    pub nsfw: bool,
    /// Sort order; `download_count` when unset
    pub sort: Option<SortKey>,
    /// Page number (1-indexed)
    pub page: u32,
}

impl SearchRequest {
    /// Create a request for a search term
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            search_term: term.into(),
            page: 1,
            ..Default::default()
        }
    }

    /// Require a tag
    pub fn include(mut self, tag: impl Into<String>) -> Self {
        self.include_tags.push(tag.into());
        self
    }

    /// Exclude a tag
    pub fn exclude(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.push(tag.into());
        self
    }

    /// Set sort order
    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set NSFW flag
    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Set page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }
}

/// Sort orders understood by the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DownloadCount,
    TrendingDownloads,
    Rating,
    RatingCount,
    StarCount,
    NFavorites,
    LastActivityAt,
    CreatedAt,
    Name,
    Random,
    Default,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        Self::DownloadCount,
        Self::TrendingDownloads,
        Self::Rating,
        Self::RatingCount,
        Self::StarCount,
        Self::NFavorites,
        Self::LastActivityAt,
        Self::CreatedAt,
        Self::Name,
        Self::Random,
        Self::Default,
    ];

    /// Wire name of the sort key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownloadCount => "download_count",
            Self::TrendingDownloads => "trending_downloads",
            Self::Rating => "rating",
            Self::RatingCount => "rating_count",
            Self::StarCount => "star_count",
            Self::NFavorites => "n_favorites",
            Self::LastActivityAt => "last_activity_at",
            Self::CreatedAt => "created_at",
            Self::Name => "name",
            Self::Random => "random",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown sort key: {}", s))
    }
}

/// Canonical catalog query: ordered parameters with unencoded values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    params: Vec<(&'static str, String)>,
}

impl CatalogQuery {
    /// Build the query for a request under the user's settings
    pub fn build(request: &SearchRequest, settings: &ExtensionSettings) -> Self {
        let sort = request.sort.unwrap_or_default();
        // A request can add NSFW but never remove a global opt-in
        let nsfw = request.nsfw || settings.nsfw;

        let mut params = vec![
            ("first", settings.find_count.to_string()),
            ("page", request.page.max(1).to_string()),
            ("sort", sort.as_str().to_string()),
            ("asc", "false".to_string()),
            ("include_forks", "true".to_string()),
            ("venus", "true".to_string()),
            ("require_images", "false".to_string()),
            ("require_custom_prompt", "false".to_string()),
            ("nsfw", nsfw.to_string()),
        ];

        if let Some(tags) = tag_list(&request.include_tags) {
            params.push(("tags", tags));
        }
        if let Some(tags) = tag_list(&request.exclude_tags) {
            params.push(("exclude_tags", tags));
        }
        if !request.search_term.is_empty() {
            params.push(("search", request.search_term.clone()));
        }

        Self { params }
    }

    /// Value of a parameter, before encoding
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters in transmission order
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// URL-encoded query string, without the leading `?`
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full request URL for an endpoint
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}?{}", endpoint, self.to_query_string())
    }
}

/// Comma-join non-empty tags and cut to [`MAX_TAGS_LEN`] characters
fn tag_list(tags: &[String]) -> Option<String> {
    let joined = tags
        .iter()
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");

    if joined.is_empty() {
        None
    } else {
        Some(joined.chars().take(MAX_TAGS_LEN).collect())
    }
}
