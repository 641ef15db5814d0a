//! Three-stage resolution pipeline.
//!
//! ```text
//! query ──▶ A: /search/advanced ──▶ best_question
//!                                       │
//!           B: /questions/{id}/answers ◀┘──▶ best_answer
//!                                                │
//!           C: /answers/{id} (body filter) ◀─────┘──▶ AnswerBody
//! ```
//!
//! Stages run strictly in order because each one needs the id chosen by the
//! previous one. Any stage that yields nothing usable ends the pipeline with
//! [`ResolveError::NotFound`]; transport and upstream failures propagate
//! unchanged.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CorpusConfig;
use crate::corpus::{search_items, Corpus, CorpusRoute};
use crate::error::ResolveError;
use crate::heuristics::{best_answer, best_question};
use crate::models::{AnswerBody, CandidateAnswer, CandidateQuestion, Query, SearchFilters};

pub struct Resolver {
    corpus: Arc<dyn Corpus>,
    defaults: SearchFilters,
    answer_filter: String,
}

impl Resolver {
    pub fn new(corpus: Arc<dyn Corpus>, config: &CorpusConfig) -> Self {
        Self {
            corpus,
            defaults: config.default_filters(),
            answer_filter: config.answer_filter.clone(),
        }
    }

    pub async fn resolve(&self, query: &Query) -> Result<AnswerBody, ResolveError> {
        let result = self.run_stages(query).await;
        match &result {
            Ok(answer) => info!(
                query = %query,
                question_id = answer.question_id,
                answer_id = answer.answer_id,
                "resolved"
            ),
            Err(ResolveError::NotFound) => info!(query = %query, "no result found"),
            Err(e) => warn!(query = %query, error = %e, "resolution failed"),
        }
        result
    }

    async fn run_stages(&self, query: &Query) -> Result<AnswerBody, ResolveError> {
        // Stage A
        let filters = self.defaults.clone().with("title", query.as_str());
        let questions =
            search_items::<CandidateQuestion>(&*self.corpus, CorpusRoute::AdvancedSearch, &filters)
                .await?;
        debug!(candidates = questions.items.len(), "stage A: search");
        if questions.items.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let question =
            best_question(query.as_str(), &questions.items).ok_or(ResolveError::NotFound)?;
        debug!(question_id = question.question_id, title = %question.title, "best question");

        // Stage B
        let filters = self.defaults.clone().with("sort", "votes");
        let answers = search_items::<CandidateAnswer>(
            &*self.corpus,
            CorpusRoute::QuestionAnswers(question.question_id),
            &filters,
        )
        .await?;
        debug!(candidates = answers.items.len(), "stage B: answers");

        let answer_id = best_answer(&answers.items).ok_or(ResolveError::NotFound)?;
        debug!(answer_id, "best answer");

        // Stage C
        let filters = self
            .defaults
            .clone()
            .with("sort", "votes")
            .with("filter", &self.answer_filter);
        let bodies =
            search_items::<AnswerBody>(&*self.corpus, CorpusRoute::Answer(answer_id), &filters)
                .await?;
        debug!(items = bodies.items.len(), "stage C: answer body");

        bodies.items.into_iter().next().ok_or(ResolveError::NotFound)
    }
}
