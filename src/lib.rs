mod config;
mod lists;
mod paths;
mod lines;
mod mem;
mod progress;
mod util;

mod record;
mod table;
mod loader;

mod bots;
mod filters;
mod cohort;
mod lexicon;
mod scoring;
mod export;
mod pipeline;

pub use crate::config::{PipelineOptions, DEFAULT_BOT_THRESHOLD};
pub use crate::lists::{normalize_list, TopicLists, DEFAULT_KEYWORDS, VALPARAISO_AREA, CONCEPCION_AREA, SANTIAGO_AREA};
pub use crate::pipeline::{RunSummary, TeleETL};

// Table model and per-record parsing.
pub use crate::table::{Cell, PostRow, PostTable, Stages, POST_COLUMNS};
pub use crate::record::{humanize_timestamp, parse_post, PostRecord, SkipReason};

// Individual stages, usable without the builder.
pub use crate::loader::{load_corpus, LoadOptions, LoadStats};
pub use crate::paths::{batch_kind, discover_batches, BatchFile, BatchKind};
pub use crate::bots::{
    apply_bot_filter, distinct_authors, lookup_bot_scores, BotLookup, BotScoreError, BotScorer,
    BotScores, BotStage, HttpBotScorer,
};
pub use crate::filters::{city_match, filter_topic_and_city, keyword_match, matches_post};
pub use crate::cohort::{assign_cohorts, assign_group, CityGroup, CohortCounts};
pub use crate::lexicon::{tokenize, EmotionScores, Lexicon, SCORE_COLUMNS};
pub use crate::scoring::{label_valence, satisfaction_valence, score_table};
pub use crate::export::{export_table, ExportFormat, ExportReport};

pub use crate::util::init_tracing_once;
