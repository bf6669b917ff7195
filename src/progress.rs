//! Progress reporting: byte-based bar for corpus loading, count-based bar for scoring.

use crate::paths::BatchFile;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Duration;

const BYTES_TEMPLATE: &str = "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
     {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}";
const COUNT_TEMPLATE: &str = "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
     it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}";

fn styled_bar(total: u64, template: &str, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Sum of on-disk sizes; unreadable metadata counts as zero.
pub fn total_batch_size(files: &[BatchFile]) -> u64 {
    files
        .iter()
        .map(|b| fs::metadata(&b.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Thin wrapper over an `indicatif` bar; `Sync`, so rayon workers may share it.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn bytes<T: Into<String>>(label: T, total_bytes: u64) -> Self {
        Self { pb: styled_bar(total_bytes, BYTES_TEMPLATE, &label.into()) }
    }
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        Self { pb: styled_bar(total, COUNT_TEMPLATE, &label.into()) }
    }
    #[inline] pub fn inc_bytes(&self, delta: u64) { self.pb.inc(delta); }
    #[inline] pub fn inc_items(&self, delta: u64) { self.pb.inc(delta); }
    pub fn finish<T: Into<String>>(&self, msg: T) { self.pb.finish_with_message(msg.into()); }
}
