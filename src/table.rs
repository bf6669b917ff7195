//! The in-memory working table. Rows are built once by the loader; each later stage
//! either removes rows (filters) or fills one more group of columns, never both.

use crate::cohort::CityGroup;
use crate::lexicon::{EmotionScores, SCORE_COLUMNS};
use crate::record::PostRecord;
use serde_json::Value;

/// Post columns every row carries, in output order.
pub const POST_COLUMNS: [&str; 3] = ["text", "author_id", "user_location"];

/// Largest integer magnitude an `f64` represents exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

/// One output cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            // integers past 2^53 (tweet ids) would round through f64; keep their digits
            Value::Number(n) if n.is_i64() || n.is_u64() => match n.as_i64() {
                Some(i) if i.unsigned_abs() <= MAX_EXACT_INT => Cell::Number(i as f64),
                _ => Cell::Text(n.to_string()),
            },
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or_else(|| Cell::Text(n.to_string())),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Plain-text rendering (CSV). Integral numbers drop the trailing `.0`.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

#[derive(Clone, Debug)]
pub struct PostRow {
    pub post: PostRecord,
    pub prob_bot: Option<f64>,
    pub city_group: Option<CityGroup>,
    pub scores: Option<EmotionScores>,
    pub satisfaction_valence: Option<u8>,
}

impl PostRow {
    pub fn new(post: PostRecord) -> Self {
        Self { post, prob_bot: None, city_group: None, scores: None, satisfaction_valence: None }
    }
}

/// Which column groups have been appended so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stages {
    pub bot_scored: bool,
    pub cohorts: bool,
    pub scored: bool,
    pub labeled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PostTable {
    pub metadata_fields: Vec<String>,
    pub rows: Vec<PostRow>,
    pub stages: Stages,
}

impl PostTable {
    pub fn new(metadata_fields: Vec<String>, rows: Vec<PostRow>) -> Self {
        Self { metadata_fields, rows, stages: Stages::default() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in output order for the stages applied so far.
    pub fn columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = POST_COLUMNS.iter().map(|s| s.to_string()).collect();
        cols.extend(self.metadata_fields.iter().map(|f| f.trim_start_matches('/').to_string()));
        if self.stages.bot_scored {
            cols.push("prob_bot".into());
        }
        if self.stages.cohorts {
            cols.push("city_group".into());
        }
        if self.stages.scored {
            cols.extend(SCORE_COLUMNS.iter().map(|s| s.to_string()));
        }
        if self.stages.labeled {
            cols.push("satisfaction_valence".into());
        }
        cols
    }

    /// Cells of `row`, aligned with `columns()`.
    pub fn row_cells(&self, row: &PostRow) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(POST_COLUMNS.len() + self.metadata_fields.len() + 13);
        cells.push(Cell::Text(row.post.text.clone()));
        cells.push(Cell::Text(row.post.author_id.clone()));
        cells.push(row.post.user_location.clone().map(Cell::Text).unwrap_or(Cell::Empty));
        for i in 0..self.metadata_fields.len() {
            cells.push(row.post.metadata.get(i).cloned().unwrap_or(Cell::Empty));
        }
        if self.stages.bot_scored {
            cells.push(row.prob_bot.into());
        }
        if self.stages.cohorts {
            cells.push(row.city_group.map(|g| g.number() as f64).into());
        }
        if self.stages.scored {
            match &row.scores {
                Some(s) => cells.extend(s.values().iter().map(|v| Cell::Number(*v))),
                None => cells.extend(std::iter::repeat(Cell::Empty).take(SCORE_COLUMNS.len())),
            }
        }
        if self.stages.labeled {
            cells.push(row.satisfaction_valence.map(f64::from).into());
        }
        cells
    }
}
