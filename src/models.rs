//! Core data models used throughout Stack Help.
//!
//! These types represent the query, the filter set sent to the corpus, and
//! the question/answer records that flow through the resolution pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// A trimmed, non-empty user query.
///
/// The only way to build one is [`Query::parse`], so every `Query` that
/// reaches the resolver is already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::Validation("query is required".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace-delimited tokens, exact and case-sensitive.
    pub fn tokens(&self) -> Vec<&str> {
        self.0.split_whitespace().collect()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered parameter mapping sent to the corpus as a query string.
///
/// Insertion order is preserved. [`SearchFilters::with`] replaces an existing
/// key where it stands and appends new keys at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pairs: Vec<(String, String)>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Stack Exchange response wrapper.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultSet<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub quota_max: Option<i64>,
    #[serde(default)]
    pub quota_remaining: Option<i64>,
}

/// A question returned by the advanced-search stage.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CandidateQuestion {
    pub question_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub is_answered: bool,
}

/// An answer returned by the answers-of-question stage.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CandidateAnswer {
    pub answer_id: u64,
    #[serde(default)]
    pub question_id: u64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub is_accepted: bool,
}

/// Terminal output of the pipeline: the selected answer with its markup body.
///
/// Fields not modelled here are kept in `extra` and serialized back out, so
/// the HTTP response forwards the upstream payload unchanged.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AnswerBody {
    pub answer_id: u64,
    #[serde(default)]
    pub question_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub is_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnswerBody {
    /// The markup body, if present and not blank.
    pub fn markup(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.trim().is_empty())
    }
}
