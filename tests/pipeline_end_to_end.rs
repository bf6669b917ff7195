#[path = "common/mod.rs"]
mod common;

use calamine::{open_workbook, Data, Reader, Xlsx};
use common::*;
use std::fs;
use tetl::{
    apply_bot_filter, assign_cohorts, label_valence, load_corpus, lookup_bot_scores, score_table, BotScorer,
    BotStage, CohortCounts, ExportFormat, Lexicon, LoadOptions, TeleETL, TopicLists,
};

fn etl(c: &Corpus, out: &str) -> TeleETL {
    TeleETL::new().input_dir(&c.input).output_path(c.out(out)).progress(false)
}

const SCORE_HEADERS: [&str; 10] =
    ["anger", "anticipation", "disgust", "fear", "joy", "sadness", "surprise", "trust", "positive", "negative"];

/// The full run with a working scorer: bot rows removed, filters applied, every column present.
#[test]
fn run_exports_augmented_table_to_csv() {
    let c = make_corpus_basic();
    let scorer = FakeScorer::new(&[("b1", 0.8), ("a1", 0.1)]);
    let summary = etl(&c, "tele.csv").run_with_scorer(&scorer).unwrap();

    assert_eq!(summary.rows_loaded, 9);
    assert_eq!(summary.load.skipped_malformed, 1);
    assert_eq!(summary.load.skipped_missing_author, 1);
    assert_eq!(summary.bot, BotStage::Applied { scored_authors: 2, removed_rows: 2 });
    assert_eq!(summary.rows_after_bot, 7);
    assert_eq!(summary.rows_after_filter, 4);
    assert_eq!(summary.cohorts, CohortCounts { valparaiso: 1, concepcion: 1, santiago: 1, none: 1 });
    assert_eq!(summary.satisfied, 2);

    let export = summary.export.as_ref().unwrap();
    assert_eq!(export.format, ExportFormat::Csv);
    assert_eq!(export.rows, 4);
    assert_eq!(export.columns, 19);

    let (headers, rows) = read_csv(&c.out("tele.csv"));
    let mut expected: Vec<&str> =
        vec!["text", "author_id", "user_location", "id", "created_at", "lang", "prob_bot", "city_group"];
    expected.extend(SCORE_HEADERS);
    expected.push("satisfaction_valence");
    assert_eq!(headers, expected);

    let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p7"], "load order survives filtering");

    let p1 = row_by_id(&rows, "p1");
    assert_eq!(p1["city_group"], "3");
    assert_eq!(p1["prob_bot"], "0.1");
    assert_eq!(p1["positive"], "1");
    assert_eq!(p1["satisfaction_valence"], "1");

    let p2 = row_by_id(&rows, "p2");
    assert_eq!(p2["city_group"], "1");
    assert_eq!(p2["prob_bot"], "", "unscored author has an empty cell");
    assert_eq!(p2["satisfaction_valence"], "1");

    let p3 = row_by_id(&rows, "p3");
    assert_eq!(p3["city_group"], "2");
    assert_eq!(p3["negative"], "2");
    assert_eq!(p3["satisfaction_valence"], "0");

    let p7 = row_by_id(&rows, "p7");
    assert_eq!(p7["city_group"], "", "master-list city outside every cohort");
    assert_eq!(p7["satisfaction_valence"], "0");
}

/// Every exported row satisfies the filter and label invariants.
#[test]
fn exported_rows_hold_invariants() {
    let c = make_corpus_basic();
    etl(&c, "t.csv").run_with_scorer(&FailingScorer).unwrap();
    let (_, rows) = read_csv(&c.out("t.csv"));
    let lists = TopicLists::default();

    for r in &rows {
        assert!(tetl::keyword_match(&r["text"], &lists));
        assert!(tetl::city_match(Some(r["user_location"].as_str()), &lists));
        assert!(["", "1", "2", "3"].contains(&r["city_group"].as_str()));
        let pos: f64 = r["positive"].parse().unwrap();
        let neg: f64 = r["negative"].parse().unwrap();
        assert_eq!(r["satisfaction_valence"], if pos > neg { "1" } else { "0" });
    }
}

/// A failing bot service is not fatal: same rows as running without any bot filter.
#[test]
fn bot_service_failure_does_not_abort_the_run() {
    let c = make_corpus_basic();
    let summary = etl(&c, "t.csv").run_with_scorer(&FailingScorer).unwrap();

    assert!(matches!(summary.bot, BotStage::Skipped { .. }));
    assert_eq!(summary.rows_after_bot, summary.rows_loaded);
    assert_eq!(summary.rows_after_filter, 6);
    assert_eq!(summary.satisfied, 4);

    let (headers, rows) = read_csv(&c.out("t.csv"));
    assert!(!headers.contains(&"prob_bot".to_string()));
    assert_eq!(headers.len(), 18);
    assert_eq!(row_by_id(&rows, "p8")["city_group"], "3");
    assert_eq!(row_by_id(&rows, "p9")["city_group"], "1");
}

/// Without credentials `run` skips the bot stage and still exports.
#[test]
fn run_without_credentials_skips_bot_stage() {
    let c = make_corpus_basic();
    let summary = etl(&c, "t.csv").run().unwrap();
    match &summary.bot {
        BotStage::Skipped { reason } => assert!(reason.contains("credentials")),
        other => panic!("expected skipped bot stage, got {:?}", other),
    }
    assert_eq!(summary.rows_after_filter, 6);
    assert!(c.out("t.csv").exists());
}

/// XLSX is the default format; a previous artifact is fully replaced and no temp file is left.
#[test]
fn xlsx_output_replaces_previous_artifact() {
    let c = make_corpus_basic();
    let dest = c.out("tele-ciudades.xlsx");
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    fs::write(&dest, b"stale contents").unwrap();

    let summary = etl(&c, "tele-ciudades.xlsx").sheet_name("posts").run_with_scorer(&FakeScorer::new(&[])).unwrap();
    assert_eq!(summary.export.as_ref().unwrap().format, ExportFormat::Xlsx);

    let bytes = fs::read(&dest).unwrap();
    assert!(bytes.starts_with(b"PK"), "xlsx is a zip container");

    let mut book: Xlsx<_> = open_workbook(&dest).unwrap();
    assert_eq!(book.sheet_names(), vec!["posts".to_string()]);
    let range = book.worksheet_range("posts").unwrap();
    let mut rows = range.rows();

    let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
    let mut expected: Vec<&str> = vec!["text", "author_id", "user_location", "id", "created_at", "lang", "prob_bot", "city_group"];
    expected.extend(SCORE_HEADERS);
    expected.push("satisfaction_valence");
    assert_eq!(header, expected);

    let body: Vec<_> = rows.collect();
    assert_eq!(body.len(), 6);
    let first = body[0];
    assert_eq!(first[3], Data::String("p1".into()));
    assert_eq!(first[6], Data::Empty, "no bot estimate for a1");
    assert_eq!(first[7], Data::Float(3.0));
    assert_eq!(first[18], Data::Float(1.0));
    let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

/// An explicit format overrides the extension.
#[test]
fn explicit_format_wins_over_extension() {
    let c = make_corpus_basic();
    etl(&c, "table.out").export_format(ExportFormat::Csv).run_with_scorer(&FakeScorer::new(&[])).unwrap();
    let (headers, rows) = read_csv(&c.out("table.out"));
    assert_eq!(headers[0], "text");
    assert_eq!(rows.len(), 6);
}

#[test]
fn summary_json_is_written() {
    let c = make_corpus_basic();
    let path = c.root.join("reports").join("summary.json");
    etl(&c, "t.csv").summary_path(&path).run_with_scorer(&FakeScorer::new(&[("b1", 0.9)])).unwrap();

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["rows_loaded"], 9);
    assert_eq!(v["bot"]["status"], "applied");
    assert_eq!(v["bot"]["removed_rows"], 2);
    assert_eq!(v["cohorts"]["none"], 1);
    assert_eq!(v["load"]["files"], 2);
    assert_eq!(v["export"]["format"], "csv");
}

/// A corpus where nothing survives the filters still exports a header-only table.
#[test]
fn empty_result_exports_headers_only() {
    let c = Corpus::empty();
    write_batch(&c.input, "only.jsonl", &[
        post("x1", "u1", "hoy llueve", "Santiago"),
        post("x2", "u2", "telemedicina", "Temuco"),
    ]);
    let summary = etl(&c, "t.csv").run_with_scorer(&FakeScorer::new(&[])).unwrap();
    assert_eq!(summary.rows_after_filter, 0);
    assert_eq!(summary.satisfied, 0);

    let (headers, rows) = read_csv(&c.out("t.csv"));
    assert_eq!(headers.len(), 19);
    assert!(rows.is_empty());
}

/// zstd batches flow through the same pipeline as plain ones.
#[test]
fn compressed_batches_are_read() {
    let c = Corpus::empty();
    write_zst_batch(&c.input, "batch.jsonl.zst", &[
        post("z1", "u1", "Una teleconsulta excelente", "Ñuñoa"),
        post("z2", "u2", "telemedicina horrible", "Talcahuano"),
    ]);
    let summary = etl(&c, "t.csv").run_with_scorer(&FakeScorer::new(&[])).unwrap();
    assert_eq!(summary.rows_loaded, 2);
    assert_eq!(summary.rows_after_filter, 2);

    let (_, rows) = read_csv(&c.out("t.csv"));
    assert_eq!(row_by_id(&rows, "z1")["city_group"], "3");
    assert_eq!(row_by_id(&rows, "z2")["city_group"], "2");
    assert_eq!(row_by_id(&rows, "z1")["satisfaction_valence"], "1");
    assert_eq!(row_by_id(&rows, "z2")["satisfaction_valence"], "0");
}

/// Numeric tweet ids reach the exported table digit for digit.
#[test]
fn numeric_ids_survive_export() {
    let c = Corpus::empty();
    write_batch(&c.input, "ids.jsonl", &[serde_json::json!({
        "id": 1256789012345678901u64, "author_id": 987654321098765432u64,
        "text": "una teleconsulta", "user_location": "Santiago"
    })
    .to_string()]);
    etl(&c, "t.csv").run_with_scorer(&FakeScorer::new(&[])).unwrap();

    let (_, rows) = read_csv(&c.out("t.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "1256789012345678901");
    assert_eq!(rows[0]["author_id"], "987654321098765432");
}

/// When the swap into place fails, the existing destination is left as it was and no temp file remains.
#[test]
fn failed_replace_keeps_previous_destination() {
    let c = make_corpus_basic();
    let dest = c.out("t.csv");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("keep.txt"), "previous").unwrap();

    let res = etl(&c, "t.csv").run_with_scorer(&FakeScorer::new(&[]));
    assert!(res.is_err());
    assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "previous");
    assert!(!c.out(".t.csv.tmp").exists());
}

/// A missing corpus directory is fatal and nothing is exported.
#[test]
fn missing_input_dir_is_fatal() {
    let c = Corpus::empty();
    let res = TeleETL::new()
        .input_dir(c.root.join("does-not-exist"))
        .output_path(c.out("t.csv"))
        .progress(false)
        .run_with_scorer(&FakeScorer::new(&[]));
    assert!(res.is_err());
    assert!(!c.out("t.csv").exists());
}

/// A lexicon path that cannot be read fails before any export.
#[test]
fn unreadable_lexicon_is_fatal() {
    let c = make_corpus_basic();
    let res = etl(&c, "t.csv").lexicon_path(c.root.join("missing.tsv")).run_with_scorer(&FakeScorer::new(&[]));
    assert!(res.is_err());
    assert!(!c.out("t.csv").exists());
}

/// Custom lexicon and lists flow through the builder.
#[test]
fn custom_lexicon_and_lists_are_used() {
    let c = make_corpus_basic();
    let lex = c.root.join("lex.tsv");
    fs::write(&lex, "teleconsulta\tpositive\t1\nteleconsulta\tanticipation\t1\n").unwrap();

    let mut lists = TopicLists::default();
    lists.cities.push("temuco".into());
    lists.cohorts[1].push("temuco".into());

    let (table, summary) = etl(&c, "t.csv")
        .lexicon_path(&lex)
        .lists(lists)
        .transform_with_scorer(&FakeScorer::new(&[]))
        .unwrap();

    assert_eq!(summary.rows_after_filter, 7, "temuco now passes the city filter");
    assert_eq!(summary.cohorts.concepcion, 2);
    let p7 = table.rows.iter().find(|r| r.post.text == "una teleconsulta").unwrap();
    assert_eq!(p7.scores.as_ref().unwrap().positive, 1.0);
    assert_eq!(p7.satisfaction_valence, Some(1));
    assert!(summary.export.is_none());
}

/// Each stage appends its column group: the column count never shrinks.
#[test]
fn column_count_grows_stage_by_stage() {
    let c = make_corpus_basic();
    let fields = vec!["id".to_string(), "lang".to_string()];
    let opts = LoadOptions { metadata_fields: &fields, human_timestamps: false, read_buffer_bytes: 64 * 1024, progress: false };
    let (mut table, _) = load_corpus(&c.input, &opts).unwrap();
    let lists = TopicLists::default();

    let mut counts = vec![table.columns().len()];
    let scorer = FakeScorer::new(&[]);
    let lookup = lookup_bot_scores(&table, Ok(&scorer as &dyn BotScorer));
    apply_bot_filter(&mut table, &lookup, 0.5);
    counts.push(table.columns().len());
    tetl::filter_topic_and_city(&mut table, &lists);
    counts.push(table.columns().len());
    assign_cohorts(&mut table, &lists);
    counts.push(table.columns().len());
    score_table(&mut table, &Lexicon::builtin_spanish(), false);
    counts.push(table.columns().len());
    label_valence(&mut table);
    counts.push(table.columns().len());

    assert_eq!(counts, vec![5, 6, 6, 7, 17, 18]);
    for row in &table.rows {
        assert_eq!(table.row_cells(row).len(), 18);
    }
}
