//! Exporter: writes the augmented table to one artifact, fully replacing any previous one.
//! The file is written next to its destination first and then swapped in, so a failed run
//! never leaves a half-written output behind.

use crate::table::{Cell, PostTable};
use crate::util::{create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use anyhow::{bail, Context, Result};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// XLSX sheet limits.
const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLS: usize = 16_384;
const XLSX_MAX_STRING: usize = 32_767;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// `.csv` (any case) selects CSV; anything else XLSX.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Xlsx,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub rows: usize,
    pub columns: usize,
}

fn tmp_path_for(dest: &Path) -> PathBuf {
    let name = dest.file_name().and_then(|n| n.to_str()).unwrap_or("export");
    dest.with_file_name(format!(".{}.tmp", name))
}

/// Create the destination directory (idempotent), write, then replace `dest`.
pub fn export_table(table: &PostTable, dest: &Path, format: ExportFormat, sheet_name: &str) -> Result<ExportReport> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create output directory {}", parent.display()))?;
    }
    let tmp = tmp_path_for(dest);
    let written = match format {
        ExportFormat::Xlsx => write_xlsx(table, &tmp, sheet_name),
        ExportFormat::Csv => write_csv(table, &tmp),
    };
    if let Err(e) = written {
        let _ = remove_with_backoff(&tmp, 4, 25);
        return Err(e);
    }
    if let Err(e) = replace_file_atomic_backoff(&tmp, dest) {
        let _ = remove_with_backoff(&tmp, 4, 25);
        return Err(e);
    }

    let report = ExportReport { path: dest.to_path_buf(), format, rows: table.len(), columns: table.columns().len() };
    tracing::info!(path = %dest.display(), ?format, rows = report.rows, columns = report.columns, "table exported");
    Ok(report)
}

fn write_csv(table: &PostTable, path: &Path) -> Result<()> {
    let file = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
    let mut w = csv::Writer::from_writer(BufWriter::new(file));
    w.write_record(table.columns())?;
    for row in &table.rows {
        w.write_record(table.row_cells(row).iter().map(Cell::render))?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

fn write_xlsx(table: &PostTable, path: &Path, sheet_name: &str) -> Result<()> {
    let columns = table.columns();
    if columns.len() > XLSX_MAX_COLS {
        bail!("{} columns exceed the XLSX limit of {}", columns.len(), XLSX_MAX_COLS);
    }
    if table.len() + 1 > XLSX_MAX_ROWS {
        bail!("{} rows exceed the XLSX limit of {} (use CSV output)", table.len(), XLSX_MAX_ROWS - 1);
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).with_context(|| format!("invalid sheet name {:?}", sheet_name))?;

    for (c, name) in columns.iter().enumerate() {
        sheet.write_string(0, c as u16, name.as_str())?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in table.row_cells(row).into_iter().enumerate() {
            let c = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(r, c, clip_chars(&s, XLSX_MAX_STRING))?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, c, n)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(r, c, b)?;
                }
            }
        }
    }
    workbook.save(path).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn clip_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
