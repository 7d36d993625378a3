use std::io::Write;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);
const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁", "▁▂▂▂▁", "▁▄▂▄▁", "▂▄▆▄▂", "▄▆█▆▄", "▂▄▆▄▂", "▁▄▂▄▁", "▁▂▂▂▁",
];

/// The bar currently on screen. Log lines are printed above it while it is set.
static ACTIVE: RwLock<Option<ProgressBar>> = RwLock::new(None);

/// Progress of one inspection run, one tick per finished device.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn start(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.blue} {msg} {pos}/{len} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICK_STRINGS);
        bar.set_style(style);
        bar.set_message(format!("{}", "inspecting devices".italic()));
        bar.enable_steady_tick(TICK);

        *ACTIVE.write().unwrap_or_else(PoisonError::into_inner) = Some(bar.clone());
        Self { bar }
    }

    /// A handle suitable for the orchestrator's progress callback.
    pub fn reporter(&self) -> impl Fn(usize, usize) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
        ACTIVE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Log writer: prints above the active progress bar, or straight to stderr.
pub struct ProgressWriter;

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let active = ACTIVE.read().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(bar) => {
                let msg = String::from_utf8_lossy(buf);
                bar.println(msg.trim_end());
                Ok(buf.len())
            }
            None => std::io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()
    }
}
