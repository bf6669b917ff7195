//! Emotion scoring (parallel over rows, in place so row order is untouched) and the
//! binary satisfaction label derived from the two polarities.

use crate::lexicon::{EmotionScores, Lexicon};
use crate::progress::ProgressScope;
use crate::table::PostTable;
use rayon::prelude::*;

/// Score every row's text once and append the ten score columns.
pub fn score_table(table: &mut PostTable, lexicon: &Lexicon, progress: bool) {
    let scope = progress.then(|| ProgressScope::count("Scoring emotions", table.rows.len() as u64));
    table.rows.par_iter_mut().for_each(|row| {
        row.scores = Some(lexicon.score(&row.post.text));
        if let Some(s) = &scope { s.inc_items(1); }
    });
    table.stages.scored = true;
    if let Some(s) = scope { s.finish("Scoring done"); }
    tracing::info!(rows = table.rows.len(), "emotion scores appended");
}

/// `1` iff positive strictly exceeds negative; ties go to `0`.
#[inline]
pub fn satisfaction_valence(scores: &EmotionScores) -> u8 {
    u8::from(scores.positive > scores.negative)
}

/// Label every scored row. Returns how many rows were labeled satisfied.
pub fn label_valence(table: &mut PostTable) -> usize {
    let mut satisfied = 0;
    for row in table.rows.iter_mut() {
        let label = row.scores.as_ref().map(satisfaction_valence);
        if label == Some(1) { satisfied += 1; }
        row.satisfaction_valence = label;
    }
    table.stages.labeled = true;
    tracing::info!(rows = table.rows.len(), satisfied, "satisfaction valence labeled");
    satisfied
}
