//! Archive sink: serializes results into one zip per unit, drives progress, and finalizes
//! the archive on normal completion or on shutdown.

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, error, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::engine::progress::{ProgressAggregator, RunningTotals};
use crate::utils::ShutdownSignal;
use crate::{EntryNaming, ResultItem, TargetFormat, Transformed, UnitSummary};

/// How the sink's consuming loop ended.
#[derive(Debug)]
pub enum SinkOutcome {
    /// Result queue closed and drained; archive finalized.
    Drained(UnitSummary),
    /// Shutdown observed; archive finalized with the entries written so far.
    Interrupted(UnitSummary),
}

/// Exclusive owner of one output archive and of the unit's progress aggregator.
pub struct ArchiveSink {
    path: PathBuf,
    writer: ZipWriter<BufWriter<File>>,
    naming: EntryNaming,
    format: TargetFormat,
    progress: ProgressAggregator,
    entries_written: usize,
    names: HashSet<String>,
}

impl ArchiveSink {
    /// Create (truncate) the archive file. Failure here aborts the unit.
    pub fn create(
        path: &Path,
        naming: EntryNaming,
        format: TargetFormat,
        progress: ProgressAggregator,
    ) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("create archive {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: ZipWriter::new(BufWriter::new(file)),
            naming,
            format,
            progress,
            entries_written: 0,
            names: HashSet::new(),
        })
    }

    /// Add one entry named from the item's identity and stream its bytes into it.
    /// A name already present in the archive is rejected.
    pub fn write_entry(&mut self, item: &ResultItem) -> Result<()> {
        let name = self.naming.entry_name(&item.identity, self.format);
        if self.names.contains(&name) {
            bail!("duplicate entry {} in {}", name, self.path.display());
        }
        self.writer
            .start_file(name.as_str(), entry_options())
            .with_context(|| format!("create entry {} in {}", name, self.path.display()))?;
        self.names.insert(name.clone());
        self.writer
            .write_all(&item.encoded)
            .with_context(|| format!("write entry {} in {}", name, self.path.display()))?;
        self.entries_written += 1;
        Ok(())
    }

    /// Handle one message from the result queue. Entry failures are logged; the item still
    /// counts toward progress.
    pub fn accept(&mut self, msg: Transformed) {
        match msg {
            Transformed::Encoded(item) => {
                if let Err(e) = self.write_entry(&item) {
                    warn!("{:#}", e);
                }
                self.progress
                    .record(item.original_size, item.encoded.len() as u64);
            }
            Transformed::Dropped { identity } => {
                debug!("{} dropped after failed encode", identity);
                self.progress.forget_expected();
            }
        }
    }

    /// Consume `results` in arrival order until it closes and drains, then finalize.
    /// If `shutdown` fires first, stop consuming, finalize what was written, and return
    /// [`SinkOutcome::Interrupted`]; queued items are discarded.
    pub fn run(
        mut self,
        results: Receiver<Transformed>,
        shutdown: &ShutdownSignal,
    ) -> Result<SinkOutcome> {
        loop {
            // Checked every round: select! picks randomly among ready arms.
            if shutdown.is_triggered() {
                return Ok(SinkOutcome::Interrupted(self.close_on_interrupt()));
            }
            select! {
                recv(results) -> msg => match msg {
                    Ok(msg) => self.accept(msg),
                    Err(_) => break,
                },
                recv(shutdown.receiver()) -> _ => {
                    return Ok(SinkOutcome::Interrupted(self.close_on_interrupt()));
                }
            }
        }
        let summary = self.finalize()?;
        Ok(SinkOutcome::Drained(summary))
    }

    /// Flush and close the archive; ends the progress line.
    pub fn finalize(self) -> Result<UnitSummary> {
        let ArchiveSink {
            path,
            writer,
            progress,
            entries_written,
            ..
        } = self;
        let totals = progress.finish();
        let mut inner = writer
            .finish()
            .with_context(|| format!("finalize archive {}", path.display()))?;
        inner
            .flush()
            .with_context(|| format!("flush archive {}", path.display()))?;
        Ok(summarize(path, entries_written, totals))
    }

    /// Best-effort finalize: errors are logged, never returned.
    fn close_on_interrupt(mut self) -> UnitSummary {
        eprintln!("\nInterrupt signal received. Closing archive {}...", self.path.display());
        if let Err(e) = self.writer.flush() {
            error!("Error flushing archive {}: {}", self.path.display(), e);
        }
        let ArchiveSink {
            path,
            writer,
            progress,
            entries_written,
            ..
        } = self;
        let totals = progress.totals().clone();
        match writer.finish() {
            Ok(mut inner) => {
                if let Err(e) = inner.flush() {
                    error!("Error closing archive {}: {}", path.display(), e);
                }
            }
            Err(e) => error!("Error closing archive {}: {}", path.display(), e),
        }
        eprintln!("Archive closed. Exiting...");
        summarize(path, entries_written, totals)
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn summarize(archive: PathBuf, entries_written: usize, totals: RunningTotals) -> UnitSummary {
    UnitSummary {
        archive,
        entries_written,
        items_processed: totals.items_processed,
        items_expected: totals.items_expected,
        original_bytes: totals.original_bytes,
        encoded_bytes: totals.encoded_bytes,
    }
}

/// Run `sink` on its own thread; its outcome is delivered on the returned receiver
/// (disconnected without a value if the thread panics).
pub fn spawn_sink(
    sink: ArchiveSink,
    results: Receiver<Transformed>,
    shutdown: &ShutdownSignal,
) -> (JoinHandle<()>, Receiver<Result<SinkOutcome>>) {
    let (outcome_tx, outcome_rx): (Sender<Result<SinkOutcome>>, _) =
        crossbeam_channel::bounded(1);
    let shutdown = shutdown.clone();
    let handle = thread::spawn(move || {
        let _ = outcome_tx.send(sink.run(results, &shutdown));
    });
    (handle, outcome_rx)
}
