//! Optional bot filter. A single batched lookup per run yields either a partial
//! author -> probability map or an explicit `Unavailable` outcome; the rest of the
//! pipeline treats `Unavailable` exactly like an empty map.

use crate::table::PostTable;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type BotScores = AHashMap<String, f64>;

#[derive(Debug, Error)]
pub enum BotScoreError {
    #[error("bot scoring credentials are not configured")]
    MissingCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BotScoreError {
    fn from(err: reqwest::Error) -> Self {
        BotScoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BotScoreError {
    fn from(err: serde_json::Error) -> Self {
        BotScoreError::Parse(err.to_string())
    }
}

/// External bot-probability estimator. Receives each distinct author exactly once per run.
pub trait BotScorer {
    fn score_authors(&self, authors: &[String]) -> Result<BotScores, BotScoreError>;
}

/// Outcome of the lookup stage.
#[derive(Clone, Debug)]
pub enum BotLookup {
    Scored(BotScores),
    Unavailable { reason: String },
}

impl BotLookup {
    pub fn scores(&self) -> Option<&BotScores> {
        match self {
            BotLookup::Scored(m) => Some(m),
            BotLookup::Unavailable { .. } => None,
        }
    }
}

/// What the bot stage did, for the run summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BotStage {
    Applied { scored_authors: usize, removed_rows: usize },
    Skipped { reason: String },
}

/// Distinct author ids in first-seen order.
pub fn distinct_authors(table: &PostTable) -> Vec<String> {
    let mut seen = AHashSet::new();
    table
        .rows
        .iter()
        .filter(|r| seen.insert(r.post.author_id.as_str()))
        .map(|r| r.post.author_id.clone())
        .collect()
}

/// Run the lookup once. A missing scorer or any scorer error becomes `Unavailable`.
pub fn lookup_bot_scores(table: &PostTable, scorer: Result<&dyn BotScorer, BotScoreError>) -> BotLookup {
    let scorer = match scorer {
        Ok(s) => s,
        Err(e) => return BotLookup::Unavailable { reason: e.to_string() },
    };
    let authors = distinct_authors(table);
    if authors.is_empty() {
        return BotLookup::Scored(BotScores::default());
    }
    tracing::info!(authors = authors.len(), "requesting bot scores");
    match scorer.score_authors(&authors) {
        Ok(mut scores) => {
            scores.retain(|_, p| p.is_finite());
            BotLookup::Scored(scores)
        }
        Err(e) => BotLookup::Unavailable { reason: e.to_string() },
    }
}

/// Merge probabilities onto rows and drop rows strictly above `threshold`.
/// Rows whose author has no estimate are kept. `Unavailable` leaves the table untouched.
pub fn apply_bot_filter(table: &mut PostTable, lookup: &BotLookup, threshold: f64) -> BotStage {
    let scores = match lookup {
        BotLookup::Scored(m) => m,
        BotLookup::Unavailable { reason } => {
            tracing::warn!(%reason, "bot scoring unavailable; continuing without bot filter");
            return BotStage::Skipped { reason: reason.clone() };
        }
    };

    for row in table.rows.iter_mut() {
        row.prob_bot = scores.get(&row.post.author_id).copied();
    }
    table.stages.bot_scored = true;

    let before = table.rows.len();
    table.rows.retain(|row| !matches!(row.prob_bot, Some(p) if p > threshold));
    let removed = before - table.rows.len();
    tracing::info!(scored_authors = scores.len(), threshold, before, removed, "bot filter applied");
    BotStage::Applied { scored_authors: scores.len(), removed_rows: removed }
}

// ----------------------------- HTTP scorer ------------------------------------

#[derive(Serialize)]
struct ScoreRequest<'a> {
    author_ids: &'a [String],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorKey {
    Text(String),
    Int(i64),
}

#[derive(Deserialize)]
struct ScoreEntry {
    author_id: AuthorKey,
    prob_bot: Option<f64>,
}

/// Bot scorer backed by an HTTP endpoint:
/// `POST {endpoint}` with `{"author_ids": [...]}` and a bearer token, answering
/// `[{"author_id": "...", "prob_bot": 0.93}, ...]`. Authors are sent in batches.
pub struct HttpBotScorer {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    batch_size: usize,
}

impl HttpBotScorer {
    pub fn new(endpoint: String, token: String, timeout: Duration, batch_size: usize) -> Result<Self, BotScoreError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint, token, batch_size: batch_size.max(1) })
    }

    /// Both endpoint and token must be present and non-blank.
    pub fn from_credentials(
        endpoint: Option<&str>,
        token: Option<&str>,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self, BotScoreError> {
        match (endpoint.map(str::trim), token.map(str::trim)) {
            (Some(e), Some(t)) if !e.is_empty() && !t.is_empty() => {
                Self::new(e.to_string(), t.to_string(), timeout, batch_size)
            }
            _ => Err(BotScoreError::MissingCredentials),
        }
    }

    fn score_batch(&self, batch: &[String], out: &mut BotScores) -> Result<(), BotScoreError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&ScoreRequest { author_ids: batch })
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BotScoreError::Api { status: status.as_u16(), message: body });
        }

        let body = resp.text()?;
        let entries: Vec<ScoreEntry> = serde_json::from_str(&body)?;
        for e in entries {
            let Some(p) = e.prob_bot else { continue };
            let id = match e.author_id {
                AuthorKey::Text(s) => s,
                AuthorKey::Int(n) => n.to_string(),
            };
            out.insert(id, p);
        }
        Ok(())
    }
}

impl BotScorer for HttpBotScorer {
    fn score_authors(&self, authors: &[String]) -> Result<BotScores, BotScoreError> {
        let mut out = BotScores::default();
        for (i, batch) in authors.chunks(self.batch_size).enumerate() {
            tracing::debug!(batch = i, size = batch.len(), "bot score request");
            self.score_batch(batch, &mut out)?;
        }
        Ok(out)
    }
}
