//! Progress observation for byte transfers
//!
//! Transfers (installer downloads, image pulls) report to a [`ProgressSink`].
//! A sink only observes: it cannot slow down, pause or abort the transfer it
//! is attached to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

/// Observer of a byte stream as it is written
pub trait ProgressSink: Send + Sync {
    /// Called exactly once, before the first chunk. `total` is 0 when unknown.
    fn on_start(&self, _total: u64) {}

    /// Called for every chunk, in order, after it has been written
    fn on_transfer(&self, total: u64, chunk: &[u8]);

    /// Called once after the last chunk of a successful transfer
    fn on_finish(&self) {}
}

const BAR_TEMPLATE: &str = "[{bar:50.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {bytes} {msg}";

/// Renders a transfer as an `indicatif` bar (or a spinner when the size is unknown)
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_message(message.into());
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn on_start(&self, total: u64) {
        if total > 0 {
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                self.bar.set_style(style.progress_chars("█▓░"));
            }
            self.bar.set_length(total);
        } else {
            if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
                self.bar.set_style(style);
            }
            self.bar.enable_steady_tick(Duration::from_millis(120));
        }
    }

    fn on_transfer(&self, _total: u64, chunk: &[u8]) {
        self.bar.inc(chunk.len() as u64);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Reports progress through the logger, for `--json` output.
///
/// Emits a debug record each time another tenth of the transfer completes.
pub struct LogSink {
    label: String,
    transferred: AtomicU64,
    reported_tenths: AtomicU64,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            transferred: AtomicU64::new(0),
            reported_tenths: AtomicU64::new(0),
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }
}

impl ProgressSink for LogSink {
    fn on_start(&self, total: u64) {
        info!("{}: transfer started (total_bytes={})", self.label, total);
    }

    fn on_transfer(&self, total: u64, chunk: &[u8]) {
        let done = self.transferred.fetch_add(chunk.len() as u64, Ordering::Relaxed)
            + chunk.len() as u64;
        if total == 0 {
            return;
        }
        let tenths = done.saturating_mul(10) / total;
        if tenths > self.reported_tenths.swap(tenths, Ordering::Relaxed) {
            debug!("{}: {}/{} bytes", self.label, done, total);
        }
    }

    fn on_finish(&self) {
        info!("{}: transfer finished (bytes={})", self.label, self.transferred());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sink_counts_every_chunk() {
        let sink = LogSink::new("test");
        sink.on_start(10);
        sink.on_transfer(10, &[0; 4]);
        sink.on_transfer(10, &[0; 6]);
        sink.on_finish();
        assert_eq!(sink.transferred(), 10);
    }

    #[test]
    fn log_sink_tolerates_unknown_total() {
        let sink = LogSink::new("pull");
        sink.on_start(0);
        sink.on_transfer(0, b"{\"status\":\"Downloading\"}\n");
        assert_eq!(sink.transferred(), 25);
    }

    #[test]
    fn bar_sink_handles_both_modes() {
        let known = BarSink::new("download");
        known.on_start(3);
        known.on_transfer(3, b"abc");
        known.on_finish();

        let unknown = BarSink::new("pull");
        unknown.on_start(0);
        unknown.on_transfer(0, b"x");
        unknown.on_finish();
    }
}
