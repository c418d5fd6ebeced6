//! Progress aggregation and live display for one unit of work

use kdam::{Animation, Bar, BarExt};

use crate::engine::tools::format_bytes;
use crate::utils::config::ProgressConsts;

/// Cumulative counters for one unit. Only grow within a unit, except `items_expected`
/// which the skip policy may lower.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunningTotals {
    pub items_processed: usize,
    pub items_expected: usize,
    pub original_bytes: u64,
    pub encoded_bytes: u64,
}

impl RunningTotals {
    /// itemsProcessed / itemsExpected × 100. A unit with nothing left to expect is complete.
    pub fn percent_complete(&self) -> f64 {
        if self.items_expected == 0 {
            return 100.0;
        }
        self.items_processed as f64 / self.items_expected as f64 * 100.0
    }

    /// totalEncodedBytes / totalOriginalBytes × 100, or 0 before any input bytes.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        self.encoded_bytes as f64 / self.original_bytes as f64 * 100.0
    }
}

/// Owned by the sink; `record` is only ever called from the sink's thread, so no locking.
pub struct ProgressAggregator {
    totals: RunningTotals,
    bar: Option<Bar>,
}

impl ProgressAggregator {
    /// `display: false` keeps the totals without drawing anything (lib use, tests, `--quiet`).
    pub fn new(items_expected: usize, label: &str, display: bool) -> Self {
        let bar = display.then(|| {
            let mut bar = kdam::tqdm!(
                total = items_expected,
                desc = label.to_string(),
                animation = Animation::Classic,
                ncols = ProgressConsts::BAR_WIDTH,
                unit = ProgressConsts::UNIT
            );
            let _ = bar.refresh();
            bar
        });
        Self {
            totals: RunningTotals {
                items_expected,
                ..RunningTotals::default()
            },
            bar,
        }
    }

    /// Account for one completed item and redraw.
    pub fn record(&mut self, original_size: u64, encoded_size: u64) {
        let t = &mut self.totals;
        t.items_processed += 1;
        // A file added after counting must not push processed past expected.
        t.items_expected = t.items_expected.max(t.items_processed);
        t.original_bytes += original_size;
        t.encoded_bytes += encoded_size;
        let status = self.status_line();
        if let Some(bar) = self.bar.as_mut() {
            bar.total = self.totals.items_expected;
            bar.set_postfix(status);
            let _ = bar.update(1);
        }
    }

    /// One expected item will never arrive (dropped by the skip policy).
    pub fn forget_expected(&mut self) {
        let t = &mut self.totals;
        t.items_expected = t.items_expected.saturating_sub(1).max(t.items_processed);
        if let Some(bar) = self.bar.as_mut() {
            bar.total = self.totals.items_expected;
            let _ = bar.refresh();
        }
    }

    pub fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    /// `ratio 41.27% 1.2 MiB/2.9 MiB`
    pub fn status_line(&self) -> String {
        format!(
            "ratio {:5.2}% {}/{}",
            self.totals.compression_ratio(),
            format_bytes(self.totals.encoded_bytes),
            format_bytes(self.totals.original_bytes)
        )
    }

    /// End the display line and hand back the final totals.
    pub fn finish(mut self) -> RunningTotals {
        if let Some(bar) = self.bar.as_mut() {
            let _ = bar.refresh();
            eprintln!();
        }
        self.totals
    }
}
