//! Selection heuristics applied between resolver stages.
//!
//! Both are lexical and popularity based: exact, case-sensitive token
//! overlap plus the corpus score. No stemming, no semantic matching.

use crate::models::{CandidateAnswer, CandidateQuestion};

const TAG_WEIGHT: i64 = 3;
const TITLE_WEIGHT: i64 = 2;
const SCORE_WEIGHT: i64 = 1;

/// Weighted overlap score of one question against the query tokens.
///
/// Every tag and every title token found among the query tokens counts once
/// per occurrence, so a title repeating a query word scores it twice.
pub fn question_score(query_tokens: &[&str], question: &CandidateQuestion) -> i64 {
    let matching_tags = question
        .tags
        .iter()
        .filter(|tag| query_tokens.contains(&tag.as_str()))
        .count() as i64;
    let matching_title = question
        .title
        .split_whitespace()
        .filter(|word| query_tokens.contains(word))
        .count() as i64;

    // Saturates so an extreme upstream score cannot overflow.
    TAG_WEIGHT
        .saturating_mul(matching_tags)
        .saturating_add(TITLE_WEIGHT.saturating_mul(matching_title))
        .saturating_add(SCORE_WEIGHT.saturating_mul(question.score))
}

/// Picks the question with the highest positive score.
///
/// The running best starts at zero and is replaced only on strict
/// improvement, so ties keep the earliest candidate and nothing is selected
/// when every candidate scores `<= 0`.
pub fn best_question<'a>(
    query: &str,
    candidates: &'a [CandidateQuestion],
) -> Option<&'a CandidateQuestion> {
    let tokens: Vec<&str> = query.split_whitespace().collect();

    let mut best_score = 0;
    let mut best = None;
    for candidate in candidates {
        let score = question_score(&tokens, candidate);
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    best
}

/// Picks the answer id to fetch, or `None` for an empty list.
///
/// An accepted answer always wins. Otherwise the strictly highest positive
/// score wins (first on ties), and when no score beats zero the first
/// answer is used.
pub fn best_answer(answers: &[CandidateAnswer]) -> Option<u64> {
    let first = answers.first()?;

    if let Some(accepted) = answers.iter().find(|a| a.is_accepted) {
        return Some(accepted.answer_id);
    }

    let mut best_score = 0;
    let mut best_id = None;
    for answer in answers {
        if answer.score > best_score {
            best_score = answer.score;
            best_id = Some(answer.answer_id);
        }
    }

    Some(best_id.unwrap_or(first.answer_id))
}
