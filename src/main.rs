use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tetl::{init_tracing_once, ExportFormat, PipelineOptions, TeleETL, TopicLists, DEFAULT_BOT_THRESHOLD};

#[derive(Parser, Debug)]
#[command(name = "tetl", version, about = "Filter telemedicine posts by Chilean city, assign cohorts, score emotions and export a table")]
struct Cli {
    /// Directory of raw batch files (*.jsonl, *.ndjson, *.json, *.zst)
    #[arg(short, long, default_value = "./data")]
    input: PathBuf,

    /// Output artifact; `.csv` writes CSV, anything else XLSX
    #[arg(short, long, default_value = "output/tele-ciudades.xlsx")]
    output: PathBuf,

    /// Force the output format instead of inferring it from the extension
    #[arg(long, value_parser = ["xlsx", "csv"])]
    format: Option<String>,

    /// Sheet name for XLSX output
    #[arg(long, default_value = "data")]
    sheet: String,

    /// Also write a JSON run summary here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Drop authors whose bot probability is strictly above this value
    #[arg(long, default_value_t = DEFAULT_BOT_THRESHOLD)]
    bot_threshold: f64,

    /// Bot-probability service endpoint; without it the bot filter is skipped
    #[arg(long, env = "TETL_BOT_ENDPOINT")]
    bot_endpoint: Option<String>,

    /// Bearer token for the bot-probability service
    #[arg(long, env = "TETL_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Authors per bot-score request
    #[arg(long, default_value_t = 100)]
    bot_batch_size: usize,

    /// Bot-score request timeout in seconds
    #[arg(long, default_value_t = 30)]
    bot_timeout_secs: u64,

    /// JSON file overriding keywords / cities / cohort lists
    #[arg(long)]
    lists: Option<PathBuf>,

    /// NRC word-level lexicon (word<TAB>category<TAB>value); defaults to the built-in Spanish set
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Extra post columns carried into the output (top-level keys or /json/pointers)
    #[arg(long, value_delimiter = ',', default_value = "id,created_at,lang")]
    metadata: Vec<String>,

    /// Render created_at as RFC3339
    #[arg(long)]
    human_timestamps: bool,

    /// Worker threads for loading and scoring (0 = all cores)
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    let lists = match &cli.lists {
        Some(p) => TopicLists::from_json_file(p)?,
        None => TopicLists::default(),
    };

    let mut opts = PipelineOptions::default()
        .with_input_dir(&cli.input)
        .with_output_path(&cli.output)
        .with_sheet_name(cli.sheet)
        .with_bot_threshold(cli.bot_threshold)
        .with_bot_batch_size(cli.bot_batch_size)
        .with_bot_timeout(Duration::from_secs(cli.bot_timeout_secs))
        .with_lists(lists)
        .with_metadata_fields(cli.metadata.into_iter().filter(|f| !f.trim().is_empty()))
        .with_human_timestamps(cli.human_timestamps)
        .with_progress(!cli.no_progress);

    opts = match cli.format.as_deref() {
        Some("csv") => opts.with_export_format(ExportFormat::Csv),
        Some(_) => opts.with_export_format(ExportFormat::Xlsx),
        None => opts,
    };
    if let Some(p) = &cli.summary { opts = opts.with_summary_path(p); }
    if let Some(e) = cli.bot_endpoint { opts = opts.with_bot_endpoint(e); }
    if let Some(t) = cli.bot_token { opts = opts.with_bot_token(t); }
    if let Some(p) = &cli.lexicon { opts = opts.with_lexicon_path(p); }
    if cli.threads > 0 { opts = opts.with_parallelism(cli.threads); }

    let summary = TeleETL::from_options(opts).run()?;
    if let Some(export) = &summary.export {
        println!("Wrote {} rows x {} columns to {}", export.rows, export.columns, export.path.display());
    }
    Ok(())
}
