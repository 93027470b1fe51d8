use crate::config::types::{
    ArticleEntry, Config, OutputConfig, ScheduleConfig, SpiderConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Longest accepted article title, matching the `articles.title` column
const MAX_TITLE_LEN: usize = 50;

/// Deepest link chain a seed may follow
const MAX_DEPTH_LIMIT: u32 = 64;

/// Longest accepted claim lease (one week)
const MAX_CLAIM_LEASE_SECS: u64 = 7 * 24 * 3600;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_spider_config(&config.spider)?;
    validate_schedule_config(&config.schedule)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_articles(&config.articles)?;
    Ok(())
}

/// Validates crawl bounds
fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_depth must be <= {}, got {}",
            MAX_DEPTH_LIMIT, config.max_depth
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if !(1..=32).contains(&config.max_concurrent_seeds) {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_seeds must be between 1 and 32, got {}",
            config.max_concurrent_seeds
        )));
    }

    // A lease shorter than one fetch would fail seeds that are still running
    if config.claim_lease_secs < config.fetch_timeout_secs
        || config.claim_lease_secs > MAX_CLAIM_LEASE_SECS
    {
        return Err(ConfigError::Validation(format!(
            "claim_lease_secs must be between fetch_timeout_secs ({}) and {}, got {}",
            config.fetch_timeout_secs, MAX_CLAIM_LEASE_SECS, config.claim_lease_secs
        )));
    }

    Ok(())
}

/// Validates the schedule section
///
/// The cron expression itself is parsed by the scheduler when the job is
/// registered; here we only reject obviously unusable values.
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    let fields = config.cron.split_whitespace().count();
    if !(6..=7).contains(&fields) {
        return Err(ConfigError::Validation(format!(
            "cron must have 6 or 7 fields (seconds first), got '{}'",
            config.cron
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.index_path.is_empty() {
        return Err(ConfigError::Validation(
            "index_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed article entries
fn validate_articles(articles: &[ArticleEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in articles {
        let url = Url::parse(&entry.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid article URL '{}': {}", entry.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Article URL '{}' must use HTTP or HTTPS",
                entry.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Article URL '{}' has no host",
                entry.url
            )));
        }

        if !seen.insert(entry.url.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Article URL '{}' is declared more than once",
                entry.url
            )));
        }

        let title = entry.title.trim();
        if title.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Article '{}' must have a title",
                entry.url
            )));
        }

        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ConfigError::Validation(format!(
                "Article title for '{}' exceeds {} characters",
                entry.url, MAX_TITLE_LEN
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
