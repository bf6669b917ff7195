//! Memory pressure watch for the loader: the whole table lives in RAM, so warn once
//! when the machine runs low and back off briefly to let the OS reclaim pages.

use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};
use sysinfo::{System, SystemExt};

struct Sampler {
    sys: System,
    last_check: Instant,
    last_frac: f64, // available / total (0.0..1.0)
}

static SAMPLER: OnceLock<Mutex<Sampler>> = OnceLock::new();
const REFRESH_EVERY: Duration = Duration::from_millis(500);

/// Recent estimate of the available memory fraction (0.0..1.0), refreshed at most every 500ms.
pub fn available_memory_fraction() -> f64 {
    let m = SAMPLER.get_or_init(|| {
        let mut sys = System::new();
        sys.refresh_memory();
        Mutex::new(Sampler { sys, last_check: Instant::now() - REFRESH_EVERY * 2, last_frac: 1.0 })
    });
    let mut st = match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    let now = Instant::now();
    if now.duration_since(st.last_check) >= REFRESH_EVERY {
        st.sys.refresh_memory();
        let total = st.sys.total_memory() as f64;
        let avail = st.sys.available_memory() as f64;
        st.last_frac = if total > 0.0 { (avail / total).clamp(0.0, 1.0) } else { 1.0 };
        st.last_check = now;
    }
    st.last_frac
}

/// Per-stream watcher; checks every 4096 lines.
pub struct MemoryWatch {
    threshold: f64,
    lines: u64,
    warned: bool,
}

impl MemoryWatch {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, lines: 0, warned: false }
    }

    pub fn tick(&mut self) {
        self.lines += 1;
        if self.lines % 4096 != 0 {
            return;
        }
        let frac = available_memory_fraction();
        if frac < self.threshold {
            if !self.warned {
                tracing::warn!(available_pct = frac * 100.0, lines = self.lines, "low memory while loading corpus");
                self.warned = true;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
    }
}
