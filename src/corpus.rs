//! Corpus client: read-only queries against the Stack Exchange API.
//!
//! [`Corpus`] is the seam the resolver depends on. [`StackExchangeClient`]
//! is the production implementation; tests substitute in-memory fakes.
//!
//! Each call is a single GET. There are no retries: a failure surfaces to the
//! caller immediately as [`ResolveError::Upstream`] when the service answered
//! with JSON (an error status or an `error_id` payload), or as
//! [`ResolveError::Transport`] when there was no JSON body to forward.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::CorpusConfig;
use crate::error::ResolveError;
use crate::models::{ResultSet, SearchFilters};

/// The three fixed route templates of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusRoute {
    AdvancedSearch,
    QuestionAnswers(u64),
    Answer(u64),
}

impl CorpusRoute {
    pub fn path(&self) -> String {
        match self {
            CorpusRoute::AdvancedSearch => "/search/advanced".to_string(),
            CorpusRoute::QuestionAnswers(id) => format!("/questions/{}/answers", id),
            CorpusRoute::Answer(id) => format!("/answers/{}", id),
        }
    }
}

#[async_trait]
pub trait Corpus: Send + Sync {
    /// Runs one query and returns the raw JSON result set.
    async fn search(&self, route: CorpusRoute, filters: &SearchFilters)
        -> Result<Value, ResolveError>;
}

/// Runs a query and decodes the result set into typed items.
pub async fn search_items<T: DeserializeOwned>(
    corpus: &dyn Corpus,
    route: CorpusRoute,
    filters: &SearchFilters,
) -> Result<ResultSet<T>, ResolveError> {
    let raw = corpus.search(route, filters).await?;
    serde_json::from_value(raw).map_err(|e| {
        ResolveError::Transport(format!("malformed result set from {}: {}", route.path(), e))
    })
}

/// HTTP client for `api.stackexchange.com`-compatible services.
pub struct StackExchangeClient {
    base_url: String,
    http: reqwest::Client,
}

impl StackExchangeClient {
    pub fn new(config: &CorpusConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("stackhelp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Full request URL with every filter appended in insertion order.
    pub fn request_url(
        &self,
        route: CorpusRoute,
        filters: &SearchFilters,
    ) -> Result<Url, ResolveError> {
        let raw = format!("{}{}", self.base_url, route.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| ResolveError::Transport(format!("invalid corpus URL {}: {}", raw, e)))?;
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters.pairs() {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Corpus for StackExchangeClient {
    async fn search(
        &self,
        route: CorpusRoute,
        filters: &SearchFilters,
    ) -> Result<Value, ResolveError> {
        let url = self.request_url(route, filters)?;
        debug!(url = %url, "corpus request");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let payload: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            return Err(match payload {
                Some(payload) => ResolveError::Upstream {
                    status: status.as_u16(),
                    payload,
                },
                None => ResolveError::Transport(format!(
                    "corpus returned HTTP {} without a JSON body",
                    status
                )),
            });
        }

        match payload {
            Some(payload) if payload.get("error_id").is_some() => Err(ResolveError::Upstream {
                status: status.as_u16(),
                payload,
            }),
            Some(payload) => Ok(payload),
            None => Err(ResolveError::Transport(format!(
                "corpus returned a non-JSON body for {}",
                route.path()
            ))),
        }
    }
}
