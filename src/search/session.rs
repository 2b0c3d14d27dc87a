//! Search session: query building, catalog search, enrichment and
//! pagination behind one object owned by the presentation layer

use super::debounce::Debouncer;
use super::models::{SearchOutcome, SearchProgress};
use super::pagination::{PaginationController, PaginationState, SearchMode, SkipReason};
use crate::catalog::{CatalogSearchClient, DisplayEntity, EntityEnricher};
use crate::config::{ExtensionSettings, Settings};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::query::{CatalogQuery, SearchRequest};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info};

/// Owns the result set, the pagination state and the loading guard.
///
/// Share it by reference (or `Arc`) between the input handlers that start
/// searches and the view that renders [`SearchSession::entities`].
pub struct SearchSession {
    search_client: CatalogSearchClient,
    enricher: EntityEnricher,
    settings: ExtensionSettings,
    pagination: Mutex<PaginationController>,
    results: RwLock<Vec<DisplayEntity>>,
    input_debounce: Debouncer,
    scroll_debounce: Debouncer,
    metrics: Arc<Metrics>,
}

impl SearchSession {
    /// Create a session from settings
    pub fn new(client: HttpClient, settings: &Settings) -> Self {
        Self::with_metrics(client, settings, Arc::new(Metrics::new()))
    }

    /// Create a session that records into existing metrics
    pub fn with_metrics(client: HttpClient, settings: &Settings, metrics: Arc<Metrics>) -> Self {
        Self {
            search_client: CatalogSearchClient::new(client.clone(), &settings.catalog.search_url),
            enricher: EntityEnricher::new(
                client,
                settings.catalog.clone(),
                settings.search.batch_size,
                metrics.clone(),
            ),
            settings: settings.extension.clone(),
            pagination: Mutex::new(PaginationController::new()),
            results: RwLock::new(Vec::new()),
            input_debounce: Debouncer::new(settings.search.input_debounce()),
            scroll_debounce: Debouncer::new(settings.search.scroll_debounce()),
            metrics,
        }
    }

    /// Replace the user preferences, e.g. with ones read from a store
    pub fn with_extension_settings(mut self, settings: ExtensionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> PaginationState {
        self.pagination.lock().unwrap().state()
    }

    /// Snapshot of the current results
    pub fn entities(&self) -> Vec<DisplayEntity> {
        self.results.read().unwrap().clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Drop all results and start over. Refused while a search is running.
    pub fn clear(&self) -> bool {
        if !self.pagination.lock().unwrap().reset() {
            return false;
        }
        self.results.write().unwrap().clear();
        true
    }

    /// Start a new search, replacing the current results
    pub async fn search<F>(&self, request: &SearchRequest, on_batch: F) -> Result<SearchOutcome>
    where
        F: FnMut(&SearchProgress<'_>),
    {
        self.execute_search(request, SearchMode::Fresh, on_batch).await
    }

    /// Fetch the next page and append it to the current results
    pub async fn load_more<F>(&self, request: &SearchRequest, on_batch: F) -> Result<SearchOutcome>
    where
        F: FnMut(&SearchProgress<'_>),
    {
        self.execute_search(request, SearchMode::Append, on_batch).await
    }

    /// Fresh search after the input has been quiet for the debounce interval
    pub async fn search_debounced<F>(
        &self,
        request: &SearchRequest,
        on_batch: F,
    ) -> Result<SearchOutcome>
    where
        F: FnMut(&SearchProgress<'_>),
    {
        if !self.input_debounce.settle().await {
            return Ok(SearchOutcome::Superseded);
        }
        self.execute_search(request, SearchMode::Fresh, on_batch).await
    }

    /// "Load more" after scrolling has been quiet for the debounce interval
    pub async fn load_more_debounced<F>(
        &self,
        request: &SearchRequest,
        on_batch: F,
    ) -> Result<SearchOutcome>
    where
        F: FnMut(&SearchProgress<'_>),
    {
        if !self.scroll_debounce.settle().await {
            return Ok(SearchOutcome::Superseded);
        }

        let state = self.state();
        if state.is_loading {
            return Ok(SearchOutcome::Skipped(SkipReason::InFlight));
        }
        if !state.has_more_results {
            return Ok(SearchOutcome::Skipped(SkipReason::Exhausted));
        }

        self.execute_search(request, SearchMode::Append, on_batch).await
    }

    /// Run one search. `on_batch` sees the full result set after every
    /// enrichment batch.
    pub async fn execute_search<F>(
        &self,
        request: &SearchRequest,
        mode: SearchMode,
        mut on_batch: F,
    ) -> Result<SearchOutcome>
    where
        F: FnMut(&SearchProgress<'_>),
    {
        let begun = self.pagination.lock().unwrap().begin(mode);
        let page = match begun {
            Ok(page) => page,
            Err(reason) => {
                debug!("Search request ignored: {:?}", reason);
                return Ok(SearchOutcome::Skipped(reason));
            }
        };
        let guard = LoadingGuard::new(&self.pagination);

        self.metrics.inc_search();
        let query = CatalogQuery::build(&request.clone().with_page(page), &self.settings);
        info!(
            "Searching catalog for '{}' (page {}, {:?})",
            request.search_term, page, mode
        );

        let nodes = match self.search_client.search(&query).await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!("Catalog search failed: {}", e);
                return Err(e);
            }
        };
        let node_count = nodes.len();

        if mode == SearchMode::Fresh {
            self.results.write().unwrap().clear();
        }

        let mut added = 0;
        let mut failures = 0;
        let batches = self.enricher.enrich(nodes);
        futures::pin_mut!(batches);

        while let Some(batch) = batches.next().await {
            failures += batch.failures.len();

            let snapshot = {
                let mut results = self.results.write().unwrap();
                let mut known: HashSet<String> =
                    results.iter().map(|e| e.full_path.clone()).collect();
                for entity in batch.new_entities() {
                    if known.insert(entity.full_path.clone()) {
                        results.push(entity.clone());
                        added += 1;
                    }
                }
                results.clone()
            };

            on_batch(&SearchProgress {
                page,
                batch: batch.index,
                total_batches: batch.total,
                entities: &snapshot,
            });
        }

        guard.complete(node_count, self.settings.find_count);
        info!(
            "Page {} done: {} nodes, {} new entities, {} failed",
            page, node_count, added, failures
        );

        Ok(SearchOutcome::Completed {
            page,
            nodes: node_count,
            added,
            failures,
        })
    }
}

/// Clears the loading flag on every exit path. Unless completed, the exit
/// counts as a failure and the page advance is undone.
struct LoadingGuard<'a> {
    pagination: &'a Mutex<PaginationController>,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(pagination: &'a Mutex<PaginationController>) -> Self {
        Self {
            pagination,
            armed: true,
        }
    }

    fn complete(mut self, count: usize, find_count: u32) {
        self.pagination.lock().unwrap().finish(count, find_count);
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut pagination) = self.pagination.lock() {
                pagination.fail();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::search::Phase;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.catalog.search_url = format!("{}/search", server.uri());
        settings.catalog.download_url = format!("{}/download", server.uri());
        settings.catalog.image_host = server.uri();
        settings
    }

    fn nodes_json(prefix: &str, count: usize) -> serde_json::Value {
        let nodes: Vec<_> = (0..count)
            .map(|i| json!({"fullPath": format!("{}/card-{}", prefix, i), "name": format!("Card {}", i)}))
            .collect();
        json!({ "nodes": nodes })
    }

    async fn mount_search(server: &MockServer, page: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_download(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
            .mount(server)
            .await;
    }

    fn session_for(server: &MockServer) -> SearchSession {
        SearchSession::new(HttpClient::new().unwrap(), &settings_for(server))
    }

    #[tokio::test]
    async fn test_full_page_keeps_more_results() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 10)).await;
        mount_download(&server).await;

        let session = session_for(&server);
        let outcome = session
            .search(&SearchRequest::new("elf"), |_| {})
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SearchOutcome::Completed {
                page: 1,
                nodes: 10,
                added: 10,
                failures: 0
            }
        );
        let state = session.state();
        assert!(state.has_more_results);
        assert!(!state.is_loading);
        assert_eq!(session.entities().len(), 10);
    }

    #[tokio::test]
    async fn test_short_page_exhausts_and_blocks_append() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 10)).await;
        mount_search(&server, "2", nodes_json("b", 9)).await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nodes_json("c", 10)))
            .expect(0)
            .mount(&server)
            .await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");
        session.search(&request, |_| {}).await.unwrap();
        let outcome = session.load_more(&request, |_| {}).await.unwrap();

        assert!(matches!(outcome, SearchOutcome::Completed { page: 2, added: 9, .. }));
        assert_eq!(session.state().phase(), Phase::Exhausted);
        assert_eq!(session.entities().len(), 19);

        let outcome = session.load_more(&request, |_| {}).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Skipped(SkipReason::Exhausted));
    }

    #[tokio::test]
    async fn test_concurrent_fresh_search_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(nodes_json("a", 3))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");

        let (first, second) = tokio::join!(session.search(&request, |_| {}), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(session.state().is_loading);
            session.search(&SearchRequest::new("orc"), |_| {}).await
        });

        assert!(first.unwrap().is_completed());
        assert_eq!(second.unwrap(), SearchOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(session.entities().len(), 3);
        assert!(session.entities().iter().all(|e| e.author == "a"));
    }

    #[tokio::test]
    async fn test_failed_search_releases_guard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_search(&server, "1", nodes_json("a", 2)).await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");

        let err = session.search(&request, |_| {}).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }));
        assert!(!session.state().is_loading);

        let outcome = session.search(&request, |_| {}).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(session.entities().len(), 2);
    }

    #[tokio::test]
    async fn test_load_more_during_search_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(nodes_json("a", 10))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");

        let (first, more, more_debounced) = tokio::join!(
            session.search(&request, |_| {}),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                session.load_more(&request, |_| {}).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                session.load_more_debounced(&request, |_| {}).await
            },
        );

        assert!(first.unwrap().is_completed());
        assert_eq!(more.unwrap(), SearchOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(more_debounced.unwrap(), SearchOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(session.state().current_page, 1);
        assert_eq!(session.entities().len(), 10);
    }

    #[tokio::test]
    async fn test_failed_fresh_search_keeps_previous_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search", "elf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nodes_json("elf", 3)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search", "orc"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search", "orc"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nodes_json("orc", 10)))
            .expect(0)
            .mount(&server)
            .await;
        mount_download(&server).await;

        let session = session_for(&server);
        session.search(&SearchRequest::new("elf"), |_| {}).await.unwrap();
        let before = session.state();
        assert_eq!(before.phase(), Phase::Exhausted);

        let orc = SearchRequest::new("orc");
        let err = session.search(&orc, |_| {}).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }));
        assert_eq!(session.state(), before);

        let outcome = session.load_more(&orc, |_| {}).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Skipped(SkipReason::Exhausted));
        let entities = session.entities();
        assert_eq!(entities.len(), 3);
        assert!(entities.iter().all(|e| e.author == "elf"));
    }

    #[tokio::test]
    async fn test_failed_append_keeps_page_and_results() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 10)).await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");
        session.search(&request, |_| {}).await.unwrap();

        let err = session.load_more(&request, |_| {}).await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse { .. }));

        let state = session.state();
        assert_eq!(state.current_page, 1);
        assert!(state.has_more_results);
        assert_eq!(session.entities().len(), 10);
    }

    #[tokio::test]
    async fn test_append_skips_duplicates() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 10)).await;
        mount_search(
            &server,
            "2",
            json!({"nodes": [
                {"fullPath": "a/card-3", "name": "Again"},
                {"fullPath": "b/new", "name": "New"}
            ]}),
        )
        .await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");
        session.search(&request, |_| {}).await.unwrap();
        let outcome = session.load_more(&request, |_| {}).await.unwrap();

        assert!(matches!(outcome, SearchOutcome::Completed { nodes: 2, added: 1, .. }));
        let entities = session.entities();
        assert_eq!(entities.len(), 11);
        assert_eq!(entities[10].full_path, "b/new");
    }

    #[tokio::test]
    async fn test_progress_delivered_per_batch() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 45)).await;
        mount_download(&server).await;

        let mut settings = settings_for(&server);
        settings.extension.find_count = 45;
        let session = SearchSession::new(HttpClient::new().unwrap(), &settings);

        let mut seen = Vec::new();
        session
            .search(&SearchRequest::new("elf"), |progress| {
                seen.push((progress.batch, progress.total_batches, progress.entities.len(), progress.is_last()));
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![(0, 3, 20, false), (1, 3, 40, false), (2, 3, 45, true)]
        );
        assert!(session.state().has_more_results);
    }

    #[tokio::test]
    async fn test_fresh_search_replaces_results() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 4)).await;
        mount_download(&server).await;

        let session = session_for(&server);
        session.search(&SearchRequest::new("elf"), |_| {}).await.unwrap();
        session.search(&SearchRequest::new("elf"), |_| {}).await.unwrap();

        assert_eq!(session.entities().len(), 4);
        assert_eq!(session.metrics().total_searches(), 2);
        assert!(session.clear());
        assert!(session.entities().is_empty());
    }

    #[tokio::test]
    async fn test_debounced_burst_searches_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("search", "elf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nodes_json("a", 1)))
            .expect(1)
            .mount(&server)
            .await;
        mount_download(&server).await;

        let mut settings = settings_for(&server);
        settings.search.input_debounce_ms = 100;
        let session = SearchSession::new(HttpClient::new().unwrap(), &settings);

        let (e, el, elf) = (
            SearchRequest::new("e"),
            SearchRequest::new("el"),
            SearchRequest::new("elf"),
        );
        let (first, second, third) = tokio::join!(
            session.search_debounced(&e, |_| {}),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                session.search_debounced(&el, |_| {}).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                session.search_debounced(&elf, |_| {}).await
            },
        );

        assert_eq!(first.unwrap(), SearchOutcome::Superseded);
        assert_eq!(second.unwrap(), SearchOutcome::Superseded);
        assert!(third.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_debounced_load_more_gated_when_exhausted() {
        let server = MockServer::start().await;
        mount_search(&server, "1", nodes_json("a", 2)).await;
        mount_download(&server).await;

        let session = session_for(&server);
        let request = SearchRequest::new("elf");
        session.search(&request, |_| {}).await.unwrap();

        let outcome = session.load_more_debounced(&request, |_| {}).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Skipped(SkipReason::Exhausted));
    }
}
