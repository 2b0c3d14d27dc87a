//! Batched enrichment of catalog nodes
//!
//! Nodes are split into fixed-size batches. Fetches inside a batch run
//! concurrently; batches run one after another, so at most `batch_size`
//! fetches are in flight and output order matches input order. After every
//! batch the stream yields everything enriched so far.

use super::models::{CatalogNode, DisplayEntity, ImageBlob};
use crate::config::CatalogSettings;
use crate::error::{CatalogError, Result};
use crate::metrics::Metrics;
use crate::network::{FallbackChain, HttpClient, Request};
use futures::future::join_all;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tracing::{debug, warn};

/// Label of the primary download endpoint
pub const DOWNLOAD_ENDPOINT: &str = "download";
/// Label of the backup image endpoint
pub const AVATAR_ENDPOINT: &str = "avatar";

/// Progress after one batch has settled
#[derive(Debug)]
pub struct EnrichedBatch {
    /// Zero-based batch number
    pub index: usize,
    /// Number of batches for this call
    pub total: usize,
    /// Every entity enriched so far, in node order
    pub entities: Vec<DisplayEntity>,
    /// How many of `entities` came from this batch
    pub added: usize,
    /// Nodes in this batch whose fetch failed on every endpoint
    pub failures: Vec<CatalogError>,
}

impl EnrichedBatch {
    /// Entities added by this batch
    pub fn new_entities(&self) -> &[DisplayEntity] {
        &self.entities[self.entities.len() - self.added..]
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Fetches per-node images and assembles display entities
#[derive(Clone)]
pub struct EntityEnricher {
    client: HttpClient,
    catalog: CatalogSettings,
    batch_size: usize,
    metrics: Arc<Metrics>,
}

impl EntityEnricher {
    pub fn new(
        client: HttpClient,
        catalog: CatalogSettings,
        batch_size: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            catalog,
            batch_size: batch_size.max(1),
            metrics,
        }
    }

    /// Enrich `nodes` batch by batch.
    ///
    /// The stream is lazy: nothing is fetched until it is polled. Calling
    /// this again fetches everything again.
    pub fn enrich(&self, nodes: Vec<CatalogNode>) -> impl Stream<Item = EnrichedBatch> + '_ {
        let batches = split_batches(nodes, self.batch_size);
        let total = batches.len();

        stream::unfold(
            (batches.into_iter().enumerate(), Vec::new()),
            move |(mut batches, mut entities)| async move {
                let (index, batch) = batches.next()?;
                debug!("Enriching batch {}/{} ({} nodes)", index + 1, total, batch.len());

                let results = join_all(batch.into_iter().map(|node| self.enrich_node(node))).await;

                let before = entities.len();
                let mut failures = Vec::new();
                for result in results {
                    match result {
                        Ok(entity) => entities.push(entity),
                        Err(e) => {
                            warn!("Dropping entity: {}", e);
                            failures.push(e);
                        }
                    }
                }

                let update = EnrichedBatch {
                    index,
                    total,
                    entities: entities.clone(),
                    added: entities.len() - before,
                    failures,
                };
                Some((update, (batches, entities)))
            },
        )
    }

    async fn enrich_node(&self, node: CatalogNode) -> Result<DisplayEntity> {
        let image = self.fetch_binary(&node.full_path).await?;
        Ok(DisplayEntity::from_node(node, image))
    }

    /// Fetch the image for one catalog path, trying the download endpoint
    /// first and the image host second
    pub async fn fetch_binary(&self, full_path: &str) -> Result<ImageBlob> {
        let chain = FallbackChain::new()
            .then(
                DOWNLOAD_ENDPOINT,
                Request::post(&self.catalog.download_url).json(serde_json::json!({
                    "fullPath": full_path,
                    "format": "tavern",
                    "version": "main",
                })),
            )
            .then(
                AVATAR_ENDPOINT,
                Request::get(self.catalog.avatar_url(full_path)),
            );

        match chain.run(&self.client).await {
            Ok(success) => {
                for failure in &success.failures {
                    self.metrics.record_error(failure.label);
                }
                self.metrics.record_success(success.label, success.elapsed);

                let content_type = success.response.header("content-type").map(String::from);
                Ok(ImageBlob::new(success.response.body, content_type))
            }
            Err(failures) => {
                for failure in &failures {
                    self.metrics.record_error(failure.label);
                }
                Err(CatalogError::EntityFetch {
                    full_path: full_path.to_string(),
                    attempts: failures.iter().map(ToString::to_string).collect(),
                })
            }
        }
    }
}

fn split_batches(nodes: Vec<CatalogNode>, size: usize) -> Vec<Vec<CatalogNode>> {
    let mut batches = Vec::with_capacity(nodes.len().div_ceil(size));
    let mut nodes = nodes.into_iter();
    loop {
        let batch: Vec<_> = nodes.by_ref().take(size).collect();
        if batch.is_empty() {
            break;
        }
        batches.push(batch);
    }
    batches
}
