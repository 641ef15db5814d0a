use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::SearchFilters;

/// Environment variable that overrides `corpus.base_url`.
pub const CORPUS_URL_ENV: &str = "STACKHELP_CORPUS_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default = "default_tagged")]
    pub tagged: String,
    #[serde(default = "default_pagesize")]
    pub pagesize: u32,
    #[serde(default = "default_answer_filter")]
    pub answer_filter: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional Stack Exchange app key; raises the daily quota.
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site: default_site(),
            tagged: default_tagged(),
            pagesize: default_pagesize(),
            answer_filter: default_answer_filter(),
            timeout_secs: default_timeout_secs(),
            key: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.stackexchange.com/2.3".to_string()
}
fn default_site() -> String {
    "stackoverflow".to_string()
}
fn default_tagged() -> String {
    "debugging".to_string()
}
fn default_pagesize() -> u32 {
    30
}
fn default_answer_filter() -> String {
    "!xR5eaP-zsOwr)EDJdT".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl CorpusConfig {
    /// Base filter set shared by every stage.
    pub fn default_filters(&self) -> SearchFilters {
        let filters = SearchFilters::new()
            .with("page", 1)
            .with("pagesize", self.pagesize)
            .with("order", "desc")
            .with("sort", "relevance")
            .with("site", &self.site)
            .with("tagged", &self.tagged);
        match &self.key {
            Some(key) => filters.with("key", key),
            None => filters,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DialogueConfig {
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_query_url")]
    pub query_url: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: default_typing_delay_ms(),
            history_limit: default_history_limit(),
            greeting: default_greeting(),
            query_url: default_query_url(),
        }
    }
}

fn default_typing_delay_ms() -> u64 {
    3000
}
fn default_history_limit() -> usize {
    12
}
fn default_greeting() -> String {
    "How can I help?".to_string()
}
fn default_query_url() -> String {
    "http://localhost:8000/query".to_string()
}

/// Loads the configuration file, falling back to defaults when the file is
/// absent and `required` is false.
pub fn load_config(path: &Path, required: bool) -> Result<Config> {
    let mut config = if path.exists() || required {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    if let Ok(url) = std::env::var(CORPUS_URL_ENV) {
        if !url.trim().is_empty() {
            config.corpus.base_url = url.trim().to_string();
        }
    }

    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    if !(1..=100).contains(&config.corpus.pagesize) {
        anyhow::bail!("corpus.pagesize must be in [1, 100]");
    }

    if config.corpus.site.trim().is_empty() {
        anyhow::bail!("corpus.site must not be empty");
    }

    if !config.corpus.base_url.starts_with("http://")
        && !config.corpus.base_url.starts_with("https://")
    {
        anyhow::bail!(
            "corpus.base_url must be an http(s) URL, got '{}'",
            config.corpus.base_url
        );
    }

    if config.dialogue.history_limit < 2 {
        anyhow::bail!("dialogue.history_limit must be >= 2");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.corpus.site, "stackoverflow");
        assert_eq!(config.dialogue.typing_delay_ms, 3000);
        assert_eq!(config.dialogue.history_limit, 12);
    }

    #[test]
    fn test_default_filters_order() {
        let filters = CorpusConfig::default().default_filters();
        let keys: Vec<_> = filters.pairs().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["page", "pagesize", "order", "sort", "site", "tagged"]
        );
        assert_eq!(filters.get("pagesize"), Some("30"));
        assert_eq!(filters.get("tagged"), Some("debugging"));
    }

    #[test]
    fn test_key_is_appended_when_set() {
        let corpus = CorpusConfig {
            key: Some("abc".to_string()),
            ..CorpusConfig::default()
        };
        assert_eq!(corpus.default_filters().get("key"), Some("abc"));
    }

    #[test]
    fn test_rejects_bad_pagesize() {
        let config = parse_config("[corpus]\npagesize = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = parse_config("[corpus]\nbase_url = \"ftp://example\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_optional_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(config.corpus.tagged, "debugging");
    }

    #[test]
    fn test_missing_required_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml"), true).is_err());
    }
}
