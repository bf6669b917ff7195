//! Corpus loader: every batch file in the input directory becomes rows of one table.
//! Batches are decoded in parallel but concatenated in file-name order, and rows keep
//! their line order within a batch.

use crate::lines::for_each_line;
use crate::paths::{discover_batches, BatchFile};
use crate::progress::{total_batch_size, ProgressScope};
use crate::record::{parse_post, SkipReason};
use crate::table::{PostRow, PostTable};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Line accounting for the load stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files: usize,
    pub rows: usize,
    pub skipped_malformed: usize,
    pub skipped_missing_text: usize,
    pub skipped_missing_author: usize,
}

impl LoadStats {
    pub fn skipped(&self) -> usize {
        self.skipped_malformed + self.skipped_missing_text + self.skipped_missing_author
    }

    fn merge(&mut self, other: LoadStats) {
        self.files += other.files;
        self.rows += other.rows;
        self.skipped_malformed += other.skipped_malformed;
        self.skipped_missing_text += other.skipped_missing_text;
        self.skipped_missing_author += other.skipped_missing_author;
    }
}

#[derive(Clone, Debug)]
pub struct LoadOptions<'a> {
    pub metadata_fields: &'a [String],
    pub human_timestamps: bool,
    pub read_buffer_bytes: usize,
    pub progress: bool,
}

fn load_batch(
    batch: &BatchFile,
    opts: &LoadOptions<'_>,
    scope: Option<&ProgressScope>,
) -> Result<(Vec<PostRow>, LoadStats)> {
    let mut rows = Vec::new();
    let mut stats = LoadStats { files: 1, ..Default::default() };

    for_each_line(
        batch,
        opts.read_buffer_bytes,
        |delta| {
            if let Some(s) = scope { s.inc_bytes(delta); }
        },
        |line| {
            if line.trim().is_empty() {
                return Ok(());
            }
            match parse_post(line, opts.metadata_fields, opts.human_timestamps) {
                Ok(post) => rows.push(PostRow::new(post)),
                Err(SkipReason::Malformed) => stats.skipped_malformed += 1,
                Err(SkipReason::MissingText) => stats.skipped_missing_text += 1,
                Err(SkipReason::MissingAuthor) => stats.skipped_missing_author += 1,
            }
            Ok(())
        },
    )
    .with_context(|| format!("loading batch {}", batch.path.display()))?;

    stats.rows = rows.len();
    if stats.skipped() > 0 {
        tracing::warn!(
            path = %batch.path.display(),
            malformed = stats.skipped_malformed,
            missing_text = stats.skipped_missing_text,
            missing_author = stats.skipped_missing_author,
            "skipped unusable lines"
        );
    }
    Ok((rows, stats))
}

/// Load every batch in `dir` into one table. Missing directory, no batches, or an
/// unreadable batch is fatal.
pub fn load_corpus(dir: &Path, opts: &LoadOptions<'_>) -> Result<(PostTable, LoadStats)> {
    let files = discover_batches(dir)?;
    tracing::info!(files = files.len(), dir = %dir.display(), "planned corpus batches");

    let scope = opts
        .progress
        .then(|| ProgressScope::bytes("Loading corpus", total_batch_size(&files)));

    let parts = files
        .par_iter()
        .map(|batch| load_batch(batch, opts, scope.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    if let Some(s) = &scope { s.finish("Corpus loaded"); }

    let mut stats = LoadStats::default();
    let mut rows = Vec::with_capacity(parts.iter().map(|(r, _)| r.len()).sum());
    for (part_rows, part_stats) in parts {
        rows.extend(part_rows);
        stats.merge(part_stats);
    }
    tracing::info!(rows = stats.rows, skipped = stats.skipped(), "corpus loaded");
    Ok((PostTable::new(opts.metadata_fields.to_vec(), rows), stats))
}
