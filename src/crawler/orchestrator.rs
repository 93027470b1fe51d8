//! Crawl orchestration
//!
//! A cycle selects every eligible seed article, claims it, and walks its
//! same-domain link graph depth-first up to the configured depth. Every page
//! seen for the first time is saved (owned by the seed) and forwarded to the
//! indexer.
//!
//! Failure policy:
//! - a fetch failure on the seed URL itself fails the seed
//! - a fetch failure on any deeper page is logged and that page is skipped
//! - a storage failure anywhere fails the seed
//! - an index failure is reported separately and never changes seed status

use crate::config::{ArticleEntry, SpiderConfig};
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::hasher::{ContentHasher, Sha256Hasher};
use crate::index::{IndexError, Indexer};
use crate::state::ArticleStatus;
use crate::storage::{
    claim_timestamp, ArticleRecord, ArticleStore, CrawledPage, PageStore, StorageError,
    StorageResult,
};
use crate::url::is_same_domain;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// How a single seed's crawl ended
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlOutcome {
    /// The traversal completed; the seed is now CRAWLED
    Crawled,

    /// The traversal failed; the seed is now FAILED with one more retry
    Failed { reason: String },

    /// The seed could not be claimed, so nothing was fetched
    Skipped,
}

/// A page that was saved but could not be indexed
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFailure {
    pub url: String,
    pub error: String,
}

/// Result of crawling one seed
///
/// `crawl` and `index_failures` are independent: a seed can be CRAWLED with
/// index failures, and a FAILED seed can have indexed pages.
#[derive(Debug, Clone)]
pub struct ArticleOutcome {
    /// The seed as last written to the store
    pub article: ArticleRecord,
    pub crawl: CrawlOutcome,
    /// Pages first discovered and saved by this traversal
    pub pages_saved: usize,
    pub index_failures: Vec<IndexFailure>,
}

impl ArticleOutcome {
    fn skipped(article: ArticleRecord) -> Self {
        Self {
            article,
            crawl: CrawlOutcome::Skipped,
            pages_saved: 0,
            index_failures: Vec::new(),
        }
    }
}

/// Summary of one `run_cycle` call
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<ArticleOutcome>,
}

impl CycleReport {
    /// True when the cycle had no eligible seeds
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn crawled(&self) -> usize {
        self.count(|o| matches!(o, CrawlOutcome::Crawled))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CrawlOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CrawlOutcome::Skipped))
    }

    pub fn pages_saved(&self) -> usize {
        self.outcomes.iter().map(|o| o.pages_saved).sum()
    }

    pub fn index_failures(&self) -> usize {
        self.outcomes.iter().map(|o| o.index_failures.len()).sum()
    }

    fn count(&self, pred: impl Fn(&CrawlOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.crawl)).count()
    }
}

/// Per-traversal counters, filled in as pages are saved
#[derive(Debug, Default)]
struct TraversalProgress {
    pages_saved: usize,
    index_failures: Vec<IndexFailure>,
}

/// Drives crawl cycles over seed articles
///
/// The store and indexer sit behind `std::sync::Mutex`; locks are only taken
/// for synchronous calls and never held across a fetch.
pub struct CrawlOrchestrator<S, F, I, H = Sha256Hasher> {
    settings: SpiderConfig,
    store: Arc<Mutex<S>>,
    fetcher: F,
    indexer: Arc<Mutex<I>>,
    hasher: H,
}

impl<S, F, I> CrawlOrchestrator<S, F, I, Sha256Hasher>
where
    S: ArticleStore + PageStore,
    F: Fetcher,
    I: Indexer,
{
    /// Creates an orchestrator that fingerprints pages with SHA-256
    pub fn new(
        settings: SpiderConfig,
        store: Arc<Mutex<S>>,
        fetcher: F,
        indexer: Arc<Mutex<I>>,
    ) -> Self {
        Self::with_hasher(settings, store, fetcher, indexer, Sha256Hasher)
    }
}

impl<S, F, I, H> CrawlOrchestrator<S, F, I, H>
where
    S: ArticleStore + PageStore,
    F: Fetcher,
    I: Indexer,
    H: ContentHasher,
{
    pub fn with_hasher(
        settings: SpiderConfig,
        store: Arc<Mutex<S>>,
        fetcher: F,
        indexer: Arc<Mutex<I>>,
        hasher: H,
    ) -> Self {
        Self {
            settings,
            store,
            fetcher,
            indexer,
            hasher,
        }
    }

    pub fn settings(&self) -> &SpiderConfig {
        &self.settings
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    pub fn indexer(&self) -> &Arc<Mutex<I>> {
        &self.indexer
    }

    /// Inserts configured seeds that are not in the store yet
    ///
    /// Existing articles keep their status and retry count.
    pub fn seed_articles(&self, entries: &[ArticleEntry]) -> StorageResult<usize> {
        self.with_store(|store| {
            for entry in entries {
                let id = store.insert_article(
                    &entry.url,
                    &entry.title,
                    entry.author.as_deref(),
                    entry.priority,
                )?;
                tracing::debug!("Seed {} -> article {}", entry.url, id);
            }
            Ok(entries.len())
        })
    }

    /// Fails seeds left IN_PROGRESS by an interrupted process
    ///
    /// Only claims older than `claim-lease-secs` are touched, so seeds a
    /// concurrently running process is still crawling keep their claim.
    /// Returns the number of recovered seeds.
    pub fn recover_interrupted(&self) -> StorageResult<usize> {
        let now = Utc::now();
        let cutoff = match chrono::Duration::from_std(self.settings.claim_lease())
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
        {
            Some(cutoff) => cutoff,
            None => return Ok(0),
        };

        let recovered = self.with_store(|store| {
            store.fail_stale_claims(&claim_timestamp(cutoff), &now.to_rfc3339())
        })?;
        for article in &recovered {
            tracing::warn!(
                "Seed {} was interrupted mid-crawl, marked failed (retries: {})",
                article.url,
                article.retries
            );
        }
        Ok(recovered.len())
    }

    /// Seeds the next cycle would pick up
    pub fn eligible_articles(&self) -> StorageResult<Vec<ArticleRecord>> {
        let max_retries = self.settings.max_retries;
        self.with_store(|store| store.get_eligible(max_retries))
    }

    /// Crawls every eligible seed once
    ///
    /// With `max-concurrent-seeds` of 1 seeds run one after another in
    /// eligibility order. An empty eligible set is a no-op.
    pub async fn run_cycle(&self) -> StorageResult<CycleReport> {
        let eligible = self.eligible_articles()?;
        if eligible.is_empty() {
            tracing::debug!("No eligible seeds, nothing to crawl");
            return Ok(CycleReport::default());
        }

        let concurrency = self.settings.max_concurrent_seeds.max(1);
        tracing::info!(
            "Starting crawl cycle: {} eligible seeds, concurrency {}",
            eligible.len(),
            concurrency
        );

        let outcomes = stream::iter(eligible)
            .map(|article| self.crawl_article(article))
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = CycleReport { outcomes };
        tracing::info!(
            "Crawl cycle finished: {} crawled, {} failed, {} skipped, {} pages saved, {} index failures",
            report.crawled(),
            report.failed(),
            report.skipped(),
            report.pages_saved(),
            report.index_failures()
        );

        Ok(report)
    }

    /// Claims one seed, traverses it, and persists its final status
    pub async fn crawl_article(&self, mut article: ArticleRecord) -> ArticleOutcome {
        let max_retries = self.settings.max_retries;
        match self.with_store(|store| store.claim_article(article.id, max_retries)) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Seed {} is no longer eligible, skipping", article.url);
                return ArticleOutcome::skipped(article);
            }
            Err(e) => {
                tracing::error!("Failed to claim seed {}: {}", article.url, e);
                return ArticleOutcome::skipped(article);
            }
        }
        article.status = ArticleStatus::InProgress;
        tracing::info!("Crawling seed {} (article {})", article.url, article.id);

        let mut progress = TraversalProgress::default();
        let crawl = match self.traverse(&article, &mut progress).await {
            Ok(()) => {
                article.status = ArticleStatus::Crawled;
                tracing::info!(
                    "Seed {} crawled, {} new pages",
                    article.url,
                    progress.pages_saved
                );
                CrawlOutcome::Crawled
            }
            Err(e) => {
                article.status = ArticleStatus::Failed;
                article.retries += 1;
                tracing::warn!(
                    "Seed {} failed (retries: {}/{}): {}",
                    article.url,
                    article.retries,
                    max_retries,
                    e
                );
                CrawlOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        article.last_crawled_at = Some(Utc::now().to_rfc3339());
        debug_assert!(ArticleStatus::InProgress.can_transition_to(article.status));

        // Left IN_PROGRESS on failure; recover_interrupted picks it up on the next start
        if let Err(e) = self.with_store(|store| store.save_article(&article)) {
            tracing::error!("Failed to persist final state of seed {}: {}", article.url, e);
        }

        ArticleOutcome {
            article,
            crawl,
            pages_saved: progress.pages_saved,
            index_failures: progress.index_failures,
        }
    }

    /// Depth-first walk from the seed URL over an explicit work stack
    async fn traverse(
        &self,
        article: &ArticleRecord,
        progress: &mut TraversalProgress,
    ) -> crate::Result<()> {
        let max_depth = self.settings.max_depth;
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<(String, u32)> = vec![(article.url.clone(), 0)];

        while let Some((url, depth)) = stack.pop() {
            if depth > max_depth {
                tracing::trace!("Depth {} exceeds limit, not fetching {}", depth, url);
                continue;
            }
            if visited.contains(&url) {
                continue;
            }
            if self.with_store(|store| store.get_page_by_url(&url))?.is_some() {
                tracing::debug!("Already crawled {}, skipping", url);
                continue;
            }

            let fetched = match self.fetch(&url).await {
                Ok(page) => page,
                Err(e) if depth == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping {} at depth {}: {}", url, depth, e);
                    continue;
                }
            };
            visited.insert(url.clone());

            let FetchedPage {
                title,
                content,
                links,
            } = fetched;
            let page = CrawledPage {
                url: url.clone(),
                parent_article_id: article.id,
                title,
                content_hash: self.hasher.hash(&content),
                content,
                last_crawled_at: Utc::now().to_rfc3339(),
            };

            if self.with_store(|store| store.save_page(&page))?.is_none() {
                tracing::debug!("{} was saved by another traversal, not expanding", url);
                continue;
            }
            progress.pages_saved += 1;
            tracing::debug!("Saved {} (depth {})", url, depth);

            if let Err(e) = self.index(&page) {
                tracing::warn!("Failed to index {}: {}", url, e);
                progress.index_failures.push(IndexFailure {
                    url: url.clone(),
                    error: e.to_string(),
                });
            }

            for link in links.into_iter().rev() {
                if link.is_empty() {
                    continue;
                }
                if !is_same_domain(&url, &link) {
                    tracing::trace!("Not following cross-domain link {}", link);
                    continue;
                }
                stack.push((link, depth.saturating_add(1)));
            }
        }

        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match tokio::time::timeout(self.settings.fetch_timeout(), self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    fn index(&self, page: &CrawledPage) -> Result<(), IndexError> {
        let mut indexer = self.indexer.lock().map_err(|_| IndexError::LockPoisoned)?;
        indexer.index_page(page)
    }

    fn with_store<T>(&self, op: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut store = self.store.lock().map_err(|_| StorageError::LockPoisoned)?;
        op(&mut store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageRecord, SqliteStorage};
    use std::collections::HashMap;
    use std::time::Duration;

    struct MockFetcher {
        pages: HashMap<String, FetchedPage>,
        log: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, url: &str, links: &[&str]) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    title: Some(format!("Title of {}", url)),
                    content: format!("content of {}", url),
                    links: links.iter().map(|l| l.to_string()).collect(),
                },
            );
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.log.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    /// Never answers within any sane timeout
    struct HangingFetcher;

    impl Fetcher for HangingFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedPage, FetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(FetchedPage {
                title: None,
                content: String::new(),
                links: Vec::new(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingIndexer {
        pages: Vec<CrawledPage>,
    }

    impl Indexer for RecordingIndexer {
        fn index_page(&mut self, page: &CrawledPage) -> Result<(), IndexError> {
            self.pages.push(page.clone());
            Ok(())
        }
    }

    struct FailingIndexer;

    impl Indexer for FailingIndexer {
        fn index_page(&mut self, _page: &CrawledPage) -> Result<(), IndexError> {
            Err(IndexError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    /// SQLite store whose `save_page` fails on the given call
    struct FlakyStore {
        inner: SqliteStorage,
        saves: usize,
        fail_on: usize,
    }

    impl FlakyStore {
        fn failing_save(fail_on: usize) -> Self {
            Self {
                inner: SqliteStorage::new_in_memory().unwrap(),
                saves: 0,
                fail_on,
            }
        }
    }

    impl ArticleStore for FlakyStore {
        fn insert_article(
            &mut self,
            url: &str,
            title: &str,
            author: Option<&str>,
            priority: i32,
        ) -> StorageResult<i64> {
            self.inner.insert_article(url, title, author, priority)
        }

        fn get_article(&self, id: i64) -> StorageResult<ArticleRecord> {
            self.inner.get_article(id)
        }

        fn get_article_by_url(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
            self.inner.get_article_by_url(url)
        }

        fn get_eligible(&self, max_retries: u32) -> StorageResult<Vec<ArticleRecord>> {
            self.inner.get_eligible(max_retries)
        }

        fn claim_article(&mut self, id: i64, max_retries: u32) -> StorageResult<bool> {
            self.inner.claim_article(id, max_retries)
        }

        fn fail_stale_claims(
            &mut self,
            claimed_before: &str,
            failed_at: &str,
        ) -> StorageResult<Vec<ArticleRecord>> {
            self.inner.fail_stale_claims(claimed_before, failed_at)
        }

        fn save_article(&mut self, article: &ArticleRecord) -> StorageResult<()> {
            self.inner.save_article(article)
        }

        fn count_articles_by_status(&self, status: ArticleStatus) -> StorageResult<u64> {
            self.inner.count_articles_by_status(status)
        }
    }

    impl PageStore for FlakyStore {
        fn get_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
            self.inner.get_page_by_url(url)
        }

        fn save_page(&mut self, page: &CrawledPage) -> StorageResult<Option<i64>> {
            self.saves += 1;
            if self.saves == self.fail_on {
                return Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.save_page(page)
        }

        fn get_pages_for_article(&self, article_id: i64) -> StorageResult<Vec<PageRecord>> {
            self.inner.get_pages_for_article(article_id)
        }

        fn count_pages(&self) -> StorageResult<u64> {
            self.inner.count_pages()
        }
    }

    fn settings(max_depth: u32, max_retries: u32) -> SpiderConfig {
        SpiderConfig {
            max_depth,
            max_retries,
            fetch_timeout_secs: 5,
            max_concurrent_seeds: 1,
            claim_lease_secs: 3600,
        }
    }

    fn orchestrator<F: Fetcher, I: Indexer>(
        settings: SpiderConfig,
        fetcher: F,
        indexer: I,
    ) -> CrawlOrchestrator<SqliteStorage, F, I> {
        let store = SqliteStorage::new_in_memory().unwrap();
        CrawlOrchestrator::new(
            settings,
            Arc::new(Mutex::new(store)),
            fetcher,
            Arc::new(Mutex::new(indexer)),
        )
    }

    fn seed<F: Fetcher, I: Indexer>(
        orch: &CrawlOrchestrator<SqliteStorage, F, I>,
        url: &str,
    ) -> i64 {
        orch.store()
            .lock()
            .unwrap()
            .insert_article(url, "Seed", None, 0)
            .unwrap()
    }

    fn page_urls<F: Fetcher, I: Indexer>(
        orch: &CrawlOrchestrator<SqliteStorage, F, I>,
        article_id: i64,
    ) -> Vec<String> {
        orch.store()
            .lock()
            .unwrap()
            .get_pages_for_article(article_id)
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect()
    }

    fn article<F: Fetcher, I: Indexer>(
        orch: &CrawlOrchestrator<SqliteStorage, F, I>,
        id: i64,
    ) -> ArticleRecord {
        orch.store().lock().unwrap().get_article(id).unwrap()
    }

    #[tokio::test]
    async fn test_cross_domain_link_not_followed() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x", "http://other.test/y"])
            .page("http://a.test/x", &[])
            .page("http://other.test/y", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        let report = orch.run_cycle().await.unwrap();

        assert_eq!(report.crawled(), 1);
        assert_eq!(page_urls(&orch, id), vec!["http://a.test/", "http://a.test/x"]);
        assert!(!orch.fetcher.fetched().contains(&"http://other.test/y".to_string()));
        assert_eq!(article(&orch, id).status, ArticleStatus::Crawled);
    }

    #[tokio::test]
    async fn test_previously_crawled_page_is_not_refetched() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x"])
            .page("http://a.test/x", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.store()
            .lock()
            .unwrap()
            .save_page(&CrawledPage {
                url: "http://a.test/x".to_string(),
                parent_article_id: id,
                title: None,
                content_hash: "earlier".to_string(),
                content: String::new(),
                last_crawled_at: "2024-01-01T00:00:00+00:00".to_string(),
            })
            .unwrap();

        let outcome = orch.crawl_article(article(&orch, id)).await;

        assert_eq!(outcome.crawl, CrawlOutcome::Crawled);
        assert_eq!(outcome.pages_saved, 1);
        assert_eq!(orch.fetcher.fetched(), vec!["http://a.test/"]);
    }

    #[tokio::test]
    async fn test_root_fetch_failure_fails_seed() {
        let orch = orchestrator(settings(2, 3), MockFetcher::new(), RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        let outcome = orch.crawl_article(article(&orch, id)).await;

        assert!(matches!(outcome.crawl, CrawlOutcome::Failed { .. }));
        let stored = article(&orch, id);
        assert_eq!(stored.status, ArticleStatus::Failed);
        assert_eq!(stored.retries, 1);
        assert!(stored.last_crawled_at.is_some());
        assert!(page_urls(&orch, id).is_empty());
    }

    #[tokio::test]
    async fn test_child_fetch_failure_does_not_fail_seed() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/broken", "http://a.test/ok"])
            .page("http://a.test/ok", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        let outcome = orch.crawl_article(article(&orch, id)).await;

        assert_eq!(outcome.crawl, CrawlOutcome::Crawled);
        assert_eq!(page_urls(&orch, id), vec!["http://a.test/", "http://a.test/ok"]);
        let stored = article(&orch, id);
        assert_eq!(stored.status, ArticleStatus::Crawled);
        assert_eq!(stored.retries, 0);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/1"])
            .page("http://a.test/1", &["http://a.test/2"])
            .page("http://a.test/2", &["http://a.test/3"])
            .page("http://a.test/3", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();

        assert_eq!(
            page_urls(&orch, id),
            vec!["http://a.test/", "http://a.test/1", "http://a.test/2"]
        );
        assert!(!orch.fetcher.fetched().contains(&"http://a.test/3".to_string()));
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_only_seed() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/1"])
            .page("http://a.test/1", &[]);
        let orch = orchestrator(settings(0, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();

        assert_eq!(orch.fetcher.fetched(), vec!["http://a.test/"]);
        assert_eq!(page_urls(&orch, id), vec!["http://a.test/"]);
    }

    #[tokio::test]
    async fn test_link_cycle_fetches_each_url_once() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/b", "http://a.test/"])
            .page("http://a.test/b", &["http://a.test/", "http://a.test/b"]);
        let orch = orchestrator(settings(10, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();

        assert_eq!(orch.fetcher.fetched(), vec!["http://a.test/", "http://a.test/b"]);
        assert_eq!(page_urls(&orch, id).len(), 2);
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/a", "http://a.test/b"])
            .page("http://a.test/a", &["http://a.test/a/1"])
            .page("http://a.test/a/1", &[])
            .page("http://a.test/b", &[]);
        let orch = orchestrator(settings(3, 3), fetcher, RecordingIndexer::default());
        seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();

        assert_eq!(
            orch.fetcher.fetched(),
            vec![
                "http://a.test/",
                "http://a.test/a",
                "http://a.test/a/1",
                "http://a.test/b"
            ]
        );
    }

    #[tokio::test]
    async fn test_back_to_back_cycles_do_not_duplicate_pages() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x"])
            .page("http://a.test/x", &[])
            .page("http://b.test/", &["http://b.test/y"])
            .page("http://b.test/y", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        seed(&orch, "http://a.test/");
        let failing = seed(&orch, "http://c.test/");

        let first = orch.run_cycle().await.unwrap();
        assert_eq!(first.crawled(), 1);
        assert_eq!(first.failed(), 1);

        // The failed seed is retried; the crawled one is not re-offered
        orch.store()
            .lock()
            .unwrap()
            .insert_article("http://b.test/", "Second", None, 0)
            .unwrap();
        let second = orch.run_cycle().await.unwrap();
        assert_eq!(second.outcomes.len(), 2);
        assert_eq!(article(&orch, failing).retries, 2);

        let fetched = orch.fetcher.fetched();
        let unique: HashSet<&String> = fetched.iter().collect();
        assert_eq!(orch.store().lock().unwrap().count_pages().unwrap(), 4);
        // Only the failing seed is fetched twice
        assert_eq!(fetched.len(), unique.len() + 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_seed_not_eligible() {
        let orch = orchestrator(settings(1, 2), MockFetcher::new(), RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();
        orch.run_cycle().await.unwrap();
        let third = orch.run_cycle().await.unwrap();

        assert!(third.is_empty());
        let stored = article(&orch, id);
        assert_eq!(stored.status, ArticleStatus::Failed);
        assert_eq!(stored.retries, 2);
        assert_eq!(orch.fetcher.fetched().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cycle_is_noop() {
        let orch = orchestrator(settings(2, 3), MockFetcher::new(), RecordingIndexer::default());
        let report = orch.run_cycle().await.unwrap();
        assert!(report.is_empty());
        assert!(orch.fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_pages_forwarded_to_indexer() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x"])
            .page("http://a.test/x", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        orch.run_cycle().await.unwrap();

        let indexer = orch.indexer().lock().unwrap();
        assert_eq!(indexer.pages.len(), 2);
        assert_eq!(indexer.pages[0].content, "content of http://a.test/");
        assert_eq!(indexer.pages[0].parent_article_id, id);
        assert_eq!(
            indexer.pages[0].content_hash,
            Sha256Hasher.hash("content of http://a.test/")
        );
    }

    #[tokio::test]
    async fn test_index_failure_keeps_page_and_status() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x"])
            .page("http://a.test/x", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, FailingIndexer);
        let id = seed(&orch, "http://a.test/");

        let outcome = orch.crawl_article(article(&orch, id)).await;

        assert_eq!(outcome.crawl, CrawlOutcome::Crawled);
        assert_eq!(outcome.pages_saved, 2);
        assert_eq!(outcome.index_failures.len(), 2);
        assert_eq!(outcome.index_failures[0].url, "http://a.test/");
        assert_eq!(page_urls(&orch, id).len(), 2);
        assert_eq!(article(&orch, id).retries, 0);
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped() {
        let fetcher = MockFetcher::new().page("http://a.test/", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");
        let stale = article(&orch, id);

        assert!(orch.store().lock().unwrap().claim_article(id, 3).unwrap());
        let outcome = orch.crawl_article(stale).await;

        assert_eq!(outcome.crawl, CrawlOutcome::Skipped);
        assert!(orch.fetcher.fetched().is_empty());
        assert_eq!(article(&orch, id).status, ArticleStatus::InProgress);
    }

    #[tokio::test]
    async fn test_store_failure_fails_seed_and_keeps_saved_pages() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/x", "http://a.test/y"])
            .page("http://a.test/x", &[])
            .page("http://a.test/y", &[]);
        // Second save is the first depth-1 child
        let orch = CrawlOrchestrator::new(
            settings(2, 3),
            Arc::new(Mutex::new(FlakyStore::failing_save(2))),
            fetcher,
            Arc::new(Mutex::new(RecordingIndexer::default())),
        );
        let id = orch
            .store()
            .lock()
            .unwrap()
            .insert_article("http://a.test/", "Seed", None, 0)
            .unwrap();
        let seed_record = orch.store().lock().unwrap().get_article(id).unwrap();

        let outcome = orch.crawl_article(seed_record).await;

        assert!(matches!(outcome.crawl, CrawlOutcome::Failed { .. }));
        assert_eq!(outcome.pages_saved, 1);
        assert_eq!(orch.fetcher.fetched(), vec!["http://a.test/", "http://a.test/x"]);

        let store = orch.store().lock().unwrap();
        let stored = store.get_article(id).unwrap();
        assert_eq!(stored.status, ArticleStatus::Failed);
        assert_eq!(stored.retries, 1);
        let pages: Vec<String> = store
            .get_pages_for_article(id)
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(pages, vec!["http://a.test/"]);
    }

    #[tokio::test]
    async fn test_fresh_claim_is_not_recovered() {
        let fetcher = MockFetcher::new().page("http://a.test/", &[]);
        let orch = orchestrator(settings(2, 3), fetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");
        let record = article(&orch, id);

        // Another process holds the claim and is still crawling
        assert!(orch.store().lock().unwrap().claim_article(id, 3).unwrap());

        assert_eq!(orch.recover_interrupted().unwrap(), 0);
        let stored = article(&orch, id);
        assert_eq!(stored.status, ArticleStatus::InProgress);
        assert_eq!(stored.retries, 0);

        assert!(orch.eligible_articles().unwrap().is_empty());
        let outcome = orch.crawl_article(record).await;
        assert_eq!(outcome.crawl, CrawlOutcome::Skipped);
        assert!(orch.fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_recover_interrupted() {
        let mut config = settings(2, 3);
        config.claim_lease_secs = 0;
        let orch = orchestrator(config, MockFetcher::new(), RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");
        seed(&orch, "http://b.test/");
        orch.store().lock().unwrap().claim_article(id, 3).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(orch.recover_interrupted().unwrap(), 1);

        let stored = article(&orch, id);
        assert_eq!(stored.status, ArticleStatus::Failed);
        assert_eq!(stored.retries, 1);
        assert_eq!(orch.eligible_articles().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_timeout_fails_seed() {
        let mut config = settings(2, 3);
        config.fetch_timeout_secs = 1;
        let orch = orchestrator(config, HangingFetcher, RecordingIndexer::default());
        let id = seed(&orch, "http://a.test/");

        let outcome = orch.crawl_article(article(&orch, id)).await;

        match outcome.crawl {
            CrawlOutcome::Failed { reason } => assert!(reason.contains("timeout")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_seed_articles_is_idempotent() {
        let orch = orchestrator(settings(2, 3), MockFetcher::new(), RecordingIndexer::default());
        let entries = vec![
            ArticleEntry {
                url: "http://a.test/".to_string(),
                title: "A".to_string(),
                author: Some("Ann".to_string()),
                priority: 1,
            },
            ArticleEntry {
                url: "http://b.test/".to_string(),
                title: "B".to_string(),
                author: None,
                priority: 5,
            },
        ];

        orch.seed_articles(&entries).unwrap();
        orch.seed_articles(&entries).unwrap();

        let eligible = orch.eligible_articles().unwrap();
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].url, "http://b.test/");
        assert_eq!(eligible[1].author, Some("Ann".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_seeds() {
        let fetcher = MockFetcher::new()
            .page("http://a.test/", &["http://a.test/1"])
            .page("http://a.test/1", &[])
            .page("http://b.test/", &["http://b.test/1"])
            .page("http://b.test/1", &[]);
        let mut config = settings(2, 3);
        config.max_concurrent_seeds = 4;
        let orch = orchestrator(config, fetcher, RecordingIndexer::default());
        let a = seed(&orch, "http://a.test/");
        let b = seed(&orch, "http://b.test/");

        let report = orch.run_cycle().await.unwrap();

        assert_eq!(report.crawled(), 2);
        assert_eq!(report.pages_saved(), 4);
        assert_eq!(page_urls(&orch, a).len(), 2);
        assert_eq!(page_urls(&orch, b).len(), 2);
    }
}
