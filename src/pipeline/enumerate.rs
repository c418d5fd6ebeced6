//! Source enumerator: lists one input set, decodes each eligible file, and feeds the work queue.

use crossbeam_channel::Sender;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::WorkItem;
use crate::engine::codec::open_and_decode;
use crate::engine::tools::{identity_of, immediate_entries, is_image_file};

use super::context::SkippedFiles;

/// One listing result: an eligible file to decode, or an error to log and skip.
pub enum EnumerateOutcome {
    File(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`EnumerateOutcome`]. Directories and ineligible files yield None.
pub fn to_outcome(r: Result<walkdir::DirEntry, walkdir::Error>) -> Option<EnumerateOutcome> {
    match r {
        Ok(entry) if entry.file_type().is_file() && is_image_file(entry.path()) => {
            Some(EnumerateOutcome::File(entry.into_path()))
        }
        Ok(_) => None,
        Err(err) => Some(EnumerateOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

/// Spawn the enumerator thread for `dir`. The thread owns `work_tx`, so the work queue
/// closes exactly when enumeration ends; it holds `done` until then.
pub fn spawn_enumerator(
    dir: &Path,
    work_tx: Sender<WorkItem>,
    skipped: SkippedFiles,
    done: Sender<()>,
) -> JoinHandle<usize> {
    let dir = dir.to_path_buf();
    thread::spawn(move || {
        let sent = run_enumeration(&dir, work_tx, &skipped);
        drop(done);
        sent
    })
}

/// Decode every eligible file directly under `dir` (file-name order) and send it on `work_tx`.
/// Open, stat, and decode failures are logged, recorded in `skipped`, and do not stop the
/// enumeration. Returns the number of items sent.
pub fn run_enumeration(dir: &Path, work_tx: Sender<WorkItem>, skipped: &SkippedFiles) -> usize {
    let mut sent = 0_usize;
    for outcome in immediate_entries(dir).filter_map(to_outcome) {
        match outcome {
            EnumerateOutcome::File(path) => match open_and_decode(&path) {
                Ok((original_size, image)) => {
                    let item = WorkItem {
                        identity: identity_of(&path),
                        original_size,
                        image,
                    };
                    if work_tx.send(item).is_err() {
                        debug!("work queue closed, stopping enumeration of {}", dir.display());
                        break;
                    }
                    sent += 1;
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    push_skipped(skipped, path, format!("{:#}", e));
                }
            },
            EnumerateOutcome::Err { msg, path } => {
                warn!("Cannot read entry in {}: {}", dir.display(), msg);
                push_skipped(skipped, path.unwrap_or_else(|| dir.to_path_buf()), msg);
            }
        }
    }
    drop(work_tx);
    sent
}

fn push_skipped(skipped: &SkippedFiles, path: PathBuf, msg: String) {
    skipped
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push((path, msg));
}
