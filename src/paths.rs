use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Encoding of a batch file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchKind {
    Plain, // .jsonl / .ndjson / .json
    Zst,   // zstd-compressed JSONL
}

#[derive(Clone, Debug)]
pub struct BatchFile {
    pub kind: BatchKind,
    pub path: PathBuf,
}

fn batch_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(jsonl|ndjson|json|zst)$").expect("static batch file pattern")
    })
}

/// Classify a file name; `None` for files that are not batches.
pub fn batch_kind(name: &str) -> Option<BatchKind> {
    let caps = batch_name_re().captures(name)?;
    if caps[1].eq_ignore_ascii_case("zst") {
        Some(BatchKind::Zst)
    } else {
        Some(BatchKind::Plain)
    }
}

/// List batch files directly inside `dir` (no recursion), sorted by file name.
/// A missing or unreadable directory is fatal; an empty one is too.
pub fn discover_batches(dir: &Path) -> Result<Vec<BatchFile>> {
    if !dir.is_dir() {
        bail!("corpus directory {} does not exist or is not a directory", dir.display());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let ent = entry.with_context(|| format!("reading corpus directory {}", dir.display()))?;
        if !ent.file_type().is_file() {
            continue;
        }
        if let Some(kind) = ent.file_name().to_str().and_then(batch_kind) {
            out.push(BatchFile { kind, path: ent.path().to_path_buf() });
        }
    }
    if out.is_empty() {
        bail!("no batch files (*.jsonl, *.ndjson, *.json, *.zst) found in {}", dir.display());
    }
    Ok(out)
}
