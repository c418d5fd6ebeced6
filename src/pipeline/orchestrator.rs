use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, select};
use log::{debug, info};
use std::path::Path;
use std::thread::JoinHandle;

use crate::engine::progress::ProgressAggregator;
use crate::engine::tools::{archive_path_for, count_eligible_files, format_bytes};
use crate::pipeline::{self, ArchiveSink, SinkOutcome};
use crate::utils::ShutdownSignal;
use crate::{PackOpts, UnitOutcome, UnitSummary};

/// Wait for a completion group to empty, unless the sink finishes first (interrupt or
/// failure). Returns the sink's outcome in the latter case.
fn await_group(
    group: &Receiver<()>,
    sink_rx: &Receiver<Result<SinkOutcome>>,
) -> Option<Result<SinkOutcome>> {
    select! {
        recv(group) -> _ => None,
        recv(sink_rx) -> outcome => Some(flatten_sink(outcome)),
    }
}

fn flatten_sink(
    outcome: Result<Result<SinkOutcome>, crossbeam_channel::RecvError>,
) -> Result<SinkOutcome> {
    outcome.map_err(|_| anyhow!("sink thread panicked"))?
}

/// Join finished threads so panics surface. Only called once their group is empty.
fn join_all(handles: Vec<JoinHandle<()>>, what: &str) -> Result<()> {
    for h in handles {
        h.join().map_err(|_| anyhow!("{} thread panicked", what))?;
    }
    Ok(())
}

/// Map the sink's outcome to the unit's. An interrupted unit abandons the other stages:
/// their threads unwind on their own once the queues disconnect.
fn to_unit_outcome(outcome: Result<SinkOutcome>) -> Result<UnitOutcome> {
    Ok(match outcome? {
        SinkOutcome::Drained(summary) => UnitOutcome::Completed(summary),
        SinkOutcome::Interrupted(summary) => UnitOutcome::Interrupted(summary),
    })
}

/// Run one unit of work: transcode every eligible image directly under `input_set` into
/// `<output_dir>/<basename>.zip`.
///
/// Enumerator → work queue → `concurrency` transform workers → result queue → sink. Both
/// queues hold `concurrency` items. Shutdown is sequenced: enumerator done (work queue
/// closes) → all workers done (result queue closes) → sink drained and archive finalized.
///
/// Returns [`UnitOutcome::Empty`] without creating an archive when no file is eligible.
/// Fails only when the archive cannot be created or a stage panics.
pub fn pack_unit(
    input_set: &Path,
    output_dir: &Path,
    opts: &PackOpts,
    shutdown: &ShutdownSignal,
) -> Result<UnitOutcome> {
    let unit = input_set
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_set.display().to_string());
    let expected = count_eligible_files(input_set);
    if expected == 0 {
        debug!("{}: no eligible images, skipping", unit);
        return Ok(UnitOutcome::Empty);
    }

    let concurrency = opts.concurrency();
    info!("Processing {} ({} images)", unit, expected);
    debug!("{}: {} workers, queue capacity {}", unit, concurrency, concurrency);

    let archive_path = archive_path_for(input_set, output_dir);
    let progress = ProgressAggregator::new(expected, &unit, opts.progress);
    let sink = ArchiveSink::create(
        &archive_path,
        opts.entry_naming,
        opts.pipeline.format,
        progress,
    )?;

    let channels = pipeline::create_pipeline_channels(concurrency);
    let (work_tx, work_rx) = channels.work.split();
    let (result_tx, result_rx) = channels.results.split();
    let (read_done_tx, read_done_rx) = pipeline::completion_group();
    let (encode_done_tx, encode_done_rx) = pipeline::completion_group();

    let enumerator = pipeline::spawn_enumerator(
        input_set,
        work_tx,
        std::sync::Arc::clone(&channels.skipped),
        read_done_tx,
    );
    let workers = pipeline::spawn_transform_workers(
        &opts.pipeline,
        &work_rx,
        &result_tx,
        concurrency,
        &encode_done_tx,
    );
    // Workers hold the only remaining handles: the queues close when they exit.
    drop((work_rx, result_tx, encode_done_tx));
    let (sink_handle, sink_rx) = pipeline::spawn_sink(sink, result_rx, shutdown);

    // A sink that ends before its upstream groups was interrupted (or finished in the instant
    // between a group closing its queue and releasing its barrier).
    let early = match await_group(&read_done_rx, &sink_rx) {
        Some(outcome) => Some(outcome),
        None => {
            let sent = enumerator
                .join()
                .map_err(|_| anyhow!("enumerator thread panicked"))?;
            debug!("{}: enumeration done, {} items sent", unit, sent);
            match await_group(&encode_done_rx, &sink_rx) {
                Some(outcome) => Some(outcome),
                None => {
                    join_all(workers, "transform worker")?;
                    debug!("{}: all workers done", unit);
                    None
                }
            }
        }
    };
    let outcome = to_unit_outcome(early.unwrap_or_else(|| flatten_sink(sink_rx.recv())))?;
    join_all(vec![sink_handle], "sink")?;
    if let UnitOutcome::Interrupted(_) = outcome {
        return Ok(outcome);
    }

    pipeline::report_skipped_files(&unit, &channels.skipped, opts.verbose);
    if let UnitOutcome::Completed(ref summary) = outcome {
        log_summary(&unit, summary);
    }
    Ok(outcome)
}

fn log_summary(unit: &str, s: &UnitSummary) {
    let ratio = if s.original_bytes == 0 {
        0.0
    } else {
        s.encoded_bytes as f64 / s.original_bytes as f64 * 100.0
    };
    info!(
        "{}: {}/{} images, {} entries, {} -> {} ({:.2}%) written to {}",
        unit,
        s.items_processed,
        s.items_expected,
        s.entries_written,
        format_bytes(s.original_bytes),
        format_bytes(s.encoded_bytes),
        ratio,
        s.archive.display()
    );
}
