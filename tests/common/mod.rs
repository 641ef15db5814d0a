#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use stackhelp::config::CorpusConfig;
use stackhelp::corpus::{Corpus, CorpusRoute};
use stackhelp::error::ResolveError;
use stackhelp::models::SearchFilters;
use stackhelp::resolver::Resolver;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What the fake corpus returns for one route.
#[derive(Clone)]
pub enum Reply {
    Items(Vec<Value>),
    Upstream(u16, Value),
    Transport(String),
}

/// In-memory corpus keyed by route path; records every call it receives.
#[derive(Default)]
pub struct FakeCorpus {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(CorpusRoute, SearchFilters)>>,
}

impl FakeCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, route: CorpusRoute, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(route.path(), reply);
        self
    }

    pub fn calls(&self) -> Vec<(CorpusRoute, SearchFilters)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn routes_called(&self) -> Vec<CorpusRoute> {
        self.calls().into_iter().map(|(route, _)| route).collect()
    }
}

#[async_trait]
impl Corpus for FakeCorpus {
    async fn search(
        &self,
        route: CorpusRoute,
        filters: &SearchFilters,
    ) -> Result<Value, ResolveError> {
        self.calls.lock().unwrap().push((route, filters.clone()));
        let reply = self.replies.lock().unwrap().get(&route.path()).cloned();
        match reply {
            Some(Reply::Items(items)) => Ok(json!({
                "items": items,
                "has_more": false,
                "quota_max": 300,
                "quota_remaining": 299,
            })),
            Some(Reply::Upstream(status, payload)) => Err(ResolveError::Upstream { status, payload }),
            Some(Reply::Transport(msg)) => Err(ResolveError::Transport(msg)),
            None => Ok(json!({ "items": [] })),
        }
    }
}

pub fn question(id: u64, title: &str, tags: &[&str], score: i64) -> Value {
    json!({
        "question_id": id,
        "title": title,
        "tags": tags,
        "score": score,
        "is_answered": true,
        "owner": { "display_name": "asker", "reputation": 10 },
        "link": format!("https://stackoverflow.com/q/{}", id),
    })
}

pub fn answer(id: u64, question_id: u64, score: i64, accepted: bool) -> Value {
    json!({
        "answer_id": id,
        "question_id": question_id,
        "score": score,
        "is_accepted": accepted,
    })
}

pub fn answer_body(id: u64, question_id: u64, body: &str) -> Value {
    json!({
        "answer_id": id,
        "question_id": question_id,
        "score": 1,
        "is_accepted": true,
        "body": body,
        "owner": { "display_name": "helper" },
    })
}

/// The corpus from the "segfault pointer" scenario: one matching question,
/// an unaccepted answer with score 3 and an accepted answer with score 1.
pub fn segfault_corpus() -> FakeCorpus {
    FakeCorpus::new()
        .on(
            CorpusRoute::AdvancedSearch,
            Reply::Items(vec![
                question(1, "Why does my loop never end", &["java"], 0),
                question(42, "Segfault when dereferencing", &["segfault", "pointer"], 10),
            ]),
        )
        .on(
            CorpusRoute::QuestionAnswers(42),
            Reply::Items(vec![answer(100, 42, 3, false), answer(101, 42, 1, true)]),
        )
        .on(
            CorpusRoute::Answer(101),
            Reply::Items(vec![answer_body(
                101,
                42,
                "<p>Check for <code>NULL</code> before dereferencing.</p>",
            )]),
        )
        .on(
            CorpusRoute::Answer(100),
            Reply::Items(vec![answer_body(100, 42, "<p>wrong answer</p>")]),
        )
}

pub fn resolver_for(corpus: Arc<FakeCorpus>) -> Resolver {
    Resolver::new(corpus, &CorpusConfig::default())
}
