use crate::export::ExportFormat;
use crate::lists::TopicLists;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bot-probability cut-off; authors strictly above it are dropped.
pub const DEFAULT_BOT_THRESHOLD: f64 = 0.5;

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub export_format: Option<ExportFormat>, // None: infer from output extension
    pub sheet_name: String,
    pub summary_path: Option<PathBuf>,   // optional JSON run summary

    // bot filter
    pub bot_threshold: f64,
    pub bot_endpoint: Option<String>,
    pub bot_token: Option<String>,
    pub bot_batch_size: usize,
    pub bot_timeout: Duration,

    // lists + lexicon, loaded once at startup
    pub lists: TopicLists,
    pub lexicon_path: Option<PathBuf>,   // None: built-in Spanish seed lexicon

    // corpus columns
    pub metadata_fields: Vec<String>,
    pub human_timestamps: bool,          // render created_at as RFC3339

    pub parallelism: Option<usize>,      // Some(N) to set rayon threads, None to use default
    pub progress: bool,
    pub read_buffer_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./data"),
            output_path: PathBuf::from("output/tele-ciudades.xlsx"),
            export_format: None,
            sheet_name: "data".to_string(),
            summary_path: None,

            bot_threshold: DEFAULT_BOT_THRESHOLD,
            bot_endpoint: None,
            bot_token: None,
            bot_batch_size: 100,
            bot_timeout: Duration::from_secs(30),

            lists: TopicLists::default(),
            lexicon_path: None,

            metadata_fields: vec!["id".into(), "created_at".into(), "lang".into()],
            human_timestamps: false,

            parallelism: None,
            progress: true,
            read_buffer_bytes: 256 * 1024,
        }
    }
}

impl PipelineOptions {
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }
    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = Some(format);
        self
    }
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }
    pub fn with_summary_path(mut self, path: impl AsRef<Path>) -> Self {
        self.summary_path = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_bot_threshold(mut self, threshold: f64) -> Self {
        self.bot_threshold = threshold.clamp(0.0, 1.0);
        self
    }
    pub fn with_bot_endpoint(mut self, url: impl Into<String>) -> Self {
        self.bot_endpoint = Some(url.into());
        self
    }
    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }
    pub fn with_bot_batch_size(mut self, n: usize) -> Self {
        self.bot_batch_size = n.max(1);
        self
    }
    pub fn with_bot_timeout(mut self, timeout: Duration) -> Self {
        self.bot_timeout = timeout;
        self
    }
    pub fn with_lists(mut self, lists: TopicLists) -> Self {
        self.lists = lists;
        self
    }
    pub fn with_lexicon_path(mut self, path: impl AsRef<Path>) -> Self {
        self.lexicon_path = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_metadata_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata_fields = fields.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_timestamps = yes;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    /// Explicit format wins; otherwise `.csv` selects CSV and everything else XLSX.
    pub fn resolved_format(&self) -> ExportFormat {
        self.export_format
            .unwrap_or_else(|| ExportFormat::from_path(&self.output_path))
    }
}
