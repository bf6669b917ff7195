#![allow(dead_code)]

use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tetl::{BotScoreError, BotScorer, BotScores};
use tempfile::TempDir;

/// A corpus directory that lives as long as the value.
pub struct Corpus {
    _tmp: TempDir,
    pub root: PathBuf,
    pub input: PathBuf,
}

impl Corpus {
    pub fn empty() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let input = root.join("input");
        fs::create_dir_all(&input).unwrap();
        Self { _tmp: tmp, root, input }
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.root.join("output").join(name)
    }
}

/// One flat post line.
pub fn post(id: &str, author: &str, text: &str, location: &str) -> String {
    json!({
        "id": id, "author_id": author, "text": text, "user_location": location,
        "created_at": "2020-05-01T12:00:00.000Z", "lang": "es"
    })
    .to_string()
}

pub fn write_batch(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
    path
}

/// zstd-compressed JSONL batch.
pub fn write_zst_batch(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let f = File::create(&path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
    path
}

/// Build a small corpus split over two batches:
/// - `batch_01.jsonl`:
///     p1 a1 "Tuve una teleconsulta excelente" @ "Santiago, Chile"      → cohort 3, satisfied
///     p2 a2 "La telemedicina es buena"        @ "Viña del Mar"         → cohort 1, satisfied
///     p3 a3 "Teleconsulta terrible, un problema" @ "Concepción"        → cohort 2, not satisfied
///     p4 a4 "Telemedicina en el sur"          @ "Temuco"               → dropped (city)
///     p5 a5 "Hoy llueve en la ciudad"         @ "Santiago"             → dropped (keyword)
///     a malformed line and a line without an author (both skipped at load)
/// - `batch_02.jsonl`:
///     p6 a6 "TELESALUD para todos"            @ ""                     → dropped (empty location)
///     p7 a7 "una teleconsulta"                @ "Antofagasta"          → kept, no cohort
///     p8 b1 "telemedicina excelente"          @ "Providencia"          → bot candidate
///     p9 b1 "otra teleconsulta buena"         @ "Valparaíso"           → bot candidate
/// - `notes.txt` (ignored)
pub fn make_corpus_basic() -> Corpus {
    let c = Corpus::empty();
    write_batch(&c.input, "batch_01.jsonl", &[
        post("p1", "a1", "Tuve una teleconsulta excelente", "Santiago, Chile"),
        post("p2", "a2", "La telemedicina es buena", "Viña del Mar"),
        post("p3", "a3", "Teleconsulta terrible, un problema", "Concepción"),
        post("p4", "a4", "Telemedicina en el sur", "Temuco"),
        post("p5", "a5", "Hoy llueve en la ciudad", "Santiago"),
        "{not json".to_string(),
        json!({"id": "p0", "text": "teleconsulta sin autor", "user_location": "Santiago"}).to_string(),
    ]);
    write_batch(&c.input, "batch_02.jsonl", &[
        post("p6", "a6", "TELESALUD para todos", ""),
        post("p7", "a7", "una teleconsulta", "Antofagasta"),
        post("p8", "b1", "telemedicina excelente", "Providencia"),
        post("p9", "b1", "otra teleconsulta buena", "Valparaíso"),
    ]);
    fs::write(c.input.join("notes.txt"), "not a batch").unwrap();
    c
}

/// Scorer with fixed answers that records every call.
pub struct FakeScorer {
    pub scores: HashMap<String, f64>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl FakeScorer {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            scores: pairs.iter().map(|(a, p)| (a.to_string(), *p)).collect(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl BotScorer for FakeScorer {
    fn score_authors(&self, authors: &[String]) -> Result<BotScores, BotScoreError> {
        self.calls.borrow_mut().push(authors.to_vec());
        Ok(authors
            .iter()
            .filter_map(|a| self.scores.get(a).map(|p| (a.clone(), *p)))
            .collect())
    }
}

/// Scorer that always fails like an unreachable service.
pub struct FailingScorer;

impl BotScorer for FailingScorer {
    fn score_authors(&self, _authors: &[String]) -> Result<BotScores, BotScoreError> {
        Err(BotScoreError::Network("connection refused".into()))
    }
}

/// Read an exported CSV into (headers, rows keyed by header).
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(|s| s.to_string()).collect();
    let rows = rdr
        .records()
        .map(|r| {
            let r = r.unwrap();
            headers.iter().cloned().zip(r.iter().map(|s| s.to_string())).collect()
        })
        .collect();
    (headers, rows)
}

/// Find an exported row by post id.
pub fn row_by_id<'a>(rows: &'a [HashMap<String, String>], id: &str) -> &'a HashMap<String, String> {
    rows.iter().find(|r| r["id"] == id).unwrap_or_else(|| panic!("row {} not found", id))
}
