use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Spider-Index
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub spider: SpiderConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "article")]
    pub articles: Vec<ArticleEntry>,
}

/// Crawl bounds applied to every seed traversal
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Maximum link depth followed from a seed URL (the seed itself is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Failed seeds stay eligible while their retry count is below this value
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Upper bound on a single page fetch, in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Number of seeds crawled at the same time within one cycle
    #[serde(rename = "max-concurrent-seeds", default = "default_max_concurrent_seeds")]
    pub max_concurrent_seeds: usize,

    /// Seeds in progress for longer than this, in seconds, are treated as
    /// abandoned by a crashed process and failed on the next start
    #[serde(rename = "claim-lease-secs", default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,
}

impl SpiderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn claim_lease(&self) -> Duration {
        Duration::from_secs(self.claim_lease_secs)
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_seeds() -> usize {
    1
}

fn default_claim_lease_secs() -> u64 {
    3600
}

/// When crawl cycles are triggered
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first)
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Run one cycle immediately when the scheduler starts
    #[serde(rename = "run-on-start", default = "default_run_on_start")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_start: default_run_on_start(),
        }
    }
}

fn default_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_run_on_start() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding articles and crawled pages
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the SQLite database holding the full-text index
    #[serde(rename = "index-path")]
    pub index_path: String,
}

/// A seed article declared in the configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleEntry {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub priority: i32,
}
