//! Line streaming over batch files (plain or zstd-compressed JSONL) with byte progress.
//! Unlike a best-effort scan, a batch that cannot be opened or decoded aborts the run:
//! the output table must reflect the whole corpus.

use anyhow::{Context, Result};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder;

use crate::mem::MemoryWatch;
use crate::paths::{BatchFile, BatchKind};
use crate::util::open_with_backoff;

/// A `Read` wrapper that counts on-disk bytes read (compressed bytes for `.zst`).
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Stream `batch` line by line. `on_line` receives the line without its `\r?\n`
/// (invalid UTF-8 is replaced, not rejected); `on_progress` receives on-disk byte deltas.
pub fn for_each_line(
    batch: &BatchFile,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let file = open_with_backoff(&batch.path, 16, 50)
        .with_context(|| format!("open batch {}", batch.path.display()))?;
    let counter = Arc::new(AtomicU64::new(0));
    let counted = CountingReader { inner: file, counter: counter.clone() };
    let cap = read_buf_bytes.max(8 * 1024);

    let reader: Box<dyn BufRead> = match batch.kind {
        BatchKind::Plain => Box::new(BufReader::with_capacity(cap, counted)),
        BatchKind::Zst => {
            let mut decoder = Decoder::new(counted)
                .with_context(|| format!("zstd init {}", batch.path.display()))?;
            // large-window frames otherwise fail with "Frame requires too much memory"
            decoder.window_log_max(31)?;
            Box::new(BufReader::with_capacity(cap, decoder))
        }
    };

    stream_lines(reader, &batch.path, &counter, &mut on_progress, &mut on_line)
}

fn stream_lines(
    mut reader: Box<dyn BufRead>,
    path: &Path,
    counter: &AtomicU64,
    on_progress: &mut impl FnMut(u64),
    on_line: &mut impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let mut watch = MemoryWatch::new(0.10);
    let mut raw: Vec<u8> = Vec::with_capacity(16 * 1024);
    let mut last = 0u64;
    loop {
        raw.clear();
        let n = reader
            .read_until(b'\n', &mut raw)
            .with_context(|| format!("read {}", path.display()))?;
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
        if n == 0 {
            break;
        }
        if raw.ends_with(b"\n") {
            raw.pop();
            if raw.ends_with(b"\r") { raw.pop(); }
        }
        let line = String::from_utf8_lossy(&raw);
        on_line(&line)?;
        watch.tick();
    }
    Ok(())
}
