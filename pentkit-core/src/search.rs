//! Fuzzy search over commands
//!
//! A field scores 100 on an exact (case-insensitive) match, 80 when it
//! contains the query, and up to 60 when the query is a subsequence of it.
//! A command takes the best weighted score across its fields.

use serde::Serialize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::CatalogResult;
use crate::models::ResolvedCommand;

const NAME_WEIGHT: f64 = 1.0;
const TAG_WEIGHT: f64 = 0.8;
const DESCRIPTION_WEIGHT: f64 = 0.7;
const COMMAND_WEIGHT: f64 = 0.5;

/// Scores one field against the query
pub fn score_field(query: &str, text: &str) -> f64 {
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    let query = query.to_lowercase();
    let text = text.to_lowercase();

    if text.contains(&query) {
        return if text == query { 100.0 } else { 80.0 };
    }

    let query_chars: Vec<char> = query.chars().collect();
    let mut matched = 0;
    for c in text.chars() {
        if matched < query_chars.len() && c == query_chars[matched] {
            matched += 1;
        }
    }

    if matched == query_chars.len() {
        (matched as f64 / query_chars.len() as f64) * 60.0
    } else {
        0.0
    }
}

/// Best weighted score over name, tags, description and template
pub fn score_command(query: &str, command: &ResolvedCommand) -> f64 {
    let best_tag = command
        .tags
        .iter()
        .map(|tag| score_field(query, tag))
        .fold(0.0, f64::max);

    [
        score_field(query, &command.name) * NAME_WEIGHT,
        best_tag * TAG_WEIGHT,
        score_field(query, &command.description) * DESCRIPTION_WEIGHT,
        score_field(query, &command.command) * COMMAND_WEIGHT,
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    #[serde(flatten)]
    pub command: ResolvedCommand,
    pub score: f64,
}

/// Ranks commands by score, dropping non-matches; ties keep input order
pub fn search(query: &str, commands: Vec<ResolvedCommand>) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = commands
        .into_iter()
        .filter_map(|command| {
            let score = score_command(query, &command);
            (score > 0.0).then_some(SearchHit { command, score })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

impl Catalog {
    pub fn search(&self, query: &str) -> CatalogResult<Vec<SearchHit>> {
        let hits = search(query.trim(), self.commands()?);
        debug!(query, hits = hits.len(), "searched commands");
        Ok(hits)
    }
}
