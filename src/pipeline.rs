use crate::bots::{apply_bot_filter, lookup_bot_scores, BotScoreError, BotScorer, BotStage, HttpBotScorer};
use crate::cohort::{assign_cohorts, CohortCounts};
use crate::config::PipelineOptions;
use crate::export::{export_table, ExportFormat, ExportReport};
use crate::filters::filter_topic_and_city;
use crate::lexicon::Lexicon;
use crate::lists::TopicLists;
use crate::loader::{load_corpus, LoadOptions, LoadStats};
use crate::scoring::{label_valence, score_table};
use crate::table::PostTable;
use crate::util::{create_with_backoff, init_tracing_once};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Batch pipeline: load → bot filter → keyword/location filter → cohorts → scores →
/// valence → export. Configure with the builder methods, then call `run`.
#[derive(Clone)]
pub struct TeleETL {
    pub(crate) opts: PipelineOptions,
}

/// Stage-by-stage accounting for one run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub input_dir: PathBuf,
    pub load: LoadStats,
    pub rows_loaded: usize,
    pub bot: BotStage,
    pub rows_after_bot: usize,
    pub rows_after_filter: usize,
    pub cohorts: CohortCounts,
    pub satisfied: usize,
    pub export: Option<ExportReport>,
}

impl Default for TeleETL {
    fn default() -> Self {
        Self::new()
    }
}

impl TeleETL {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_dir(dir); self }
    pub fn output_path(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_path(path); self }
    pub fn export_format(mut self, format: ExportFormat) -> Self { self.opts = self.opts.with_export_format(format); self }
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self { self.opts = self.opts.with_sheet_name(name); self }
    pub fn summary_path(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_summary_path(path); self }
    pub fn bot_threshold(mut self, threshold: f64) -> Self { self.opts = self.opts.with_bot_threshold(threshold); self }
    pub fn bot_endpoint(mut self, url: impl Into<String>) -> Self { self.opts = self.opts.with_bot_endpoint(url); self }
    pub fn bot_token(mut self, token: impl Into<String>) -> Self { self.opts = self.opts.with_bot_token(token); self }
    pub fn bot_batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_bot_batch_size(n); self }
    pub fn bot_timeout(mut self, timeout: Duration) -> Self { self.opts = self.opts.with_bot_timeout(timeout); self }
    pub fn lists(mut self, lists: TopicLists) -> Self { self.opts = self.opts.with_lists(lists); self }
    pub fn lexicon_path(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_lexicon_path(path); self }
    pub fn metadata_fields<I, S>(mut self, fields: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> { self.opts = self.opts.with_metadata_fields(fields); self }
    pub fn human_timestamps(mut self, yes: bool) -> Self { self.opts = self.opts.with_human_timestamps(yes); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }

    // -------- Operations --------

    /// Full run using the HTTP bot scorer from the configured credentials.
    /// Missing credentials or a failing service only skip the bot filter.
    pub fn run(self) -> Result<RunSummary> {
        let scorer = HttpBotScorer::from_credentials(
            self.opts.bot_endpoint.as_deref(),
            self.opts.bot_token.as_deref(),
            self.opts.bot_timeout,
            self.opts.bot_batch_size,
        );
        match scorer {
            Ok(http) => {
                let s: &dyn BotScorer = &http;
                self.run_with(Ok(s))
            }
            Err(e) => self.run_with(Err(e)),
        }
    }

    /// Full run with a caller-supplied bot scorer.
    pub fn run_with_scorer(self, scorer: &dyn BotScorer) -> Result<RunSummary> {
        self.run_with(Ok(scorer))
    }

    /// Stages 1-6 without exporting; returns the augmented table.
    pub fn transform_with_scorer(&self, scorer: &dyn BotScorer) -> Result<(PostTable, RunSummary)> {
        self.transform(Ok(scorer))
    }

    fn run_with(self, scorer: Result<&dyn BotScorer, BotScoreError>) -> Result<RunSummary> {
        let (table, mut summary) = self.transform(scorer)?;

        let format = self.opts.resolved_format();
        let report = export_table(&table, &self.opts.output_path, format, &self.opts.sheet_name)
            .with_context(|| format!("exporting to {}", self.opts.output_path.display()))?;
        summary.export = Some(report);

        if let Some(path) = &self.opts.summary_path {
            write_summary(&summary, path)?;
        }
        tracing::info!(
            loaded = summary.rows_loaded,
            after_bot = summary.rows_after_bot,
            after_filter = summary.rows_after_filter,
            satisfied = summary.satisfied,
            "run complete"
        );
        Ok(summary)
    }

    fn transform(&self, scorer: Result<&dyn BotScorer, BotScoreError>) -> Result<(PostTable, RunSummary)> {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism { if n > 0 { rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok(); } }

        // static configuration, loaded once
        self.opts.lists.validate()?;
        let lexicon = match &self.opts.lexicon_path {
            Some(p) => Lexicon::from_file(p)?,
            None => Lexicon::builtin_spanish(),
        };

        // 1. corpus
        let load_opts = LoadOptions {
            metadata_fields: &self.opts.metadata_fields,
            human_timestamps: self.opts.human_timestamps,
            read_buffer_bytes: self.opts.read_buffer_bytes,
            progress: self.opts.progress,
        };
        let (mut table, load) = load_corpus(&self.opts.input_dir, &load_opts)
            .with_context(|| format!("loading corpus from {}", self.opts.input_dir.display()))?;
        let rows_loaded = table.len();

        // 2. bots (best effort)
        let lookup = lookup_bot_scores(&table, scorer);
        let bot = apply_bot_filter(&mut table, &lookup, self.opts.bot_threshold);
        let rows_after_bot = table.len();

        // 3. keyword + city
        filter_topic_and_city(&mut table, &self.opts.lists);
        let rows_after_filter = table.len();

        // 4-6. cohorts, scores, label
        let cohorts = assign_cohorts(&mut table, &self.opts.lists);
        score_table(&mut table, &lexicon, self.opts.progress);
        let satisfied = label_valence(&mut table);

        let summary = RunSummary {
            input_dir: self.opts.input_dir.clone(),
            load,
            rows_loaded,
            bot,
            rows_after_bot,
            rows_after_filter,
            cohorts,
            satisfied,
            export: None,
        };
        Ok((table, summary))
    }
}

fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, summary)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}
