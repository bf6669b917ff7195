//! NRC-style word-level emotion lexicon and the per-text scorer.
//!
//! File layout is one association per line: `word<TAB>category<TAB>value`. Lines starting
//! with `#`, unknown categories and zero values are ignored. A token contributes the value
//! of every category it is associated with, once per occurrence, so scores are weighted
//! hit counts.

use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Spanish seed lexicon shipped with the crate; used when no lexicon file is configured.
const BUILTIN_ES: &str = include_str!("../data/lexicon_es.tsv");

/// Score columns in output order: eight emotions, then the two polarities.
pub const SCORE_COLUMNS: [&str; 10] = [
    "anger", "anticipation", "disgust", "fear", "joy", "sadness", "surprise", "trust",
    "positive", "negative",
];

const N: usize = SCORE_COLUMNS.len();

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EmotionScores {
    pub anger: f64,
    pub anticipation: f64,
    pub disgust: f64,
    pub fear: f64,
    pub joy: f64,
    pub sadness: f64,
    pub surprise: f64,
    pub trust: f64,
    pub positive: f64,
    pub negative: f64,
}

impl EmotionScores {
    /// Values in `SCORE_COLUMNS` order.
    pub fn values(&self) -> [f64; N] {
        [
            self.anger, self.anticipation, self.disgust, self.fear, self.joy,
            self.sadness, self.surprise, self.trust, self.positive, self.negative,
        ]
    }

    fn from_values(v: [f64; N]) -> Self {
        Self {
            anger: v[0], anticipation: v[1], disgust: v[2], fear: v[3], joy: v[4],
            sadness: v[5], surprise: v[6], trust: v[7], positive: v[8], negative: v[9],
        }
    }
}

fn category_index(name: &str) -> Option<usize> {
    SCORE_COLUMNS.iter().position(|c| c.eq_ignore_ascii_case(name))
}

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\W+").expect("static tokenizer pattern"))
}

/// Lowercase and split on runs of non-word characters (Unicode-aware, so `ñ`/`é` stay in words).
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    non_word_re()
        .split(&lower)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct Lexicon {
    words: AHashMap<String, [f64; N]>,
    ignored: usize,
}

impl Lexicon {
    /// The embedded Spanish seed lexicon.
    pub fn builtin_spanish() -> Self {
        match Self::parse(BUILTIN_ES) {
            Ok(lex) => lex,
            Err(e) => {
                tracing::error!(error = %e, "bundled lexicon is corrupt; every text will score zero");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read lexicon {}", path.display()))?;
        let lex = Self::parse(&raw).with_context(|| format!("parse lexicon {}", path.display()))?;
        if lex.is_empty() {
            bail!("lexicon {} has no usable entries", path.display());
        }
        tracing::info!(words = lex.len(), path = %path.display(), "lexicon loaded");
        Ok(lex)
    }

    /// Parse the tab-separated word-level layout.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut words: AHashMap<String, [f64; N]> = AHashMap::new();
        let mut ignored = 0usize;
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split('\t');
            let (word, cat, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(w), Some(c), Some(v)) => (w.trim(), c.trim(), v.trim()),
                _ => bail!("line {}: expected word<TAB>category<TAB>value", lineno + 1),
            };
            let value: f64 = match value.parse() {
                Ok(v) => v,
                Err(_) if lineno == 0 => continue, // header row
                Err(e) => bail!("line {}: bad value {:?}: {}", lineno + 1, value, e),
            };
            let Some(idx) = category_index(cat) else {
                ignored += 1;
                continue;
            };
            if value == 0.0 || word.is_empty() {
                continue;
            }
            words.entry(word.to_lowercase()).or_insert([0.0; N])[idx] += value;
        }
        if ignored > 0 {
            tracing::debug!(ignored, "lexicon lines with unknown categories ignored");
        }
        Ok(Self { words, ignored })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Lines dropped at parse time because their category is not a score column.
    pub fn ignored_lines(&self) -> usize {
        self.ignored
    }

    /// Sum category values over every token of `text`.
    pub fn score(&self, text: &str) -> EmotionScores {
        let mut acc = [0.0f64; N];
        for tok in tokenize(text) {
            if let Some(v) = self.words.get(&tok) {
                for (a, x) in acc.iter_mut().zip(v.iter()) {
                    *a += x;
                }
            }
        }
        EmotionScores::from_values(acc)
    }
}
