//! Root-level packing: one unit of work per immediate subdirectory

use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::path::{Path, PathBuf};

use crate::engine::tools::list_input_sets;
use crate::pipeline::pack_unit;
use crate::utils::ShutdownSignal;
use crate::{PackOpts, PackReport, UnitOutcome};

/// Pack every immediate subdirectory of `root`, sequentially, each into its own archive.
///
/// Archives go to `opts.output_dir` (created if missing) or `root`. A unit that fails is logged
/// and recorded in [`PackReport::failed`]; the remaining units still run. The run stops after a
/// unit is interrupted by `shutdown`.
pub fn pack_root(root: &Path, opts: &PackOpts, shutdown: &ShutdownSignal) -> Result<PackReport> {
    opts.validate()?;
    let output_dir = opts
        .output_dir
        .clone()
        .unwrap_or_else(|| root.to_path_buf());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;
    let output_canonical = output_dir.canonicalize().ok();

    let mut report = PackReport::default();
    for input_set in list_input_sets(root)? {
        if is_output_dir(&input_set, &output_canonical) {
            debug!("{} is the output directory, not packing it", input_set.display());
            continue;
        }
        if shutdown.is_triggered() {
            report.interrupted = true;
            break;
        }
        match pack_unit(&input_set, &output_dir, opts, shutdown) {
            Ok(outcome) => {
                let interrupted = matches!(outcome, UnitOutcome::Interrupted(_));
                report.units.push((input_set, outcome));
                if interrupted {
                    report.interrupted = true;
                    break;
                }
            }
            Err(e) => {
                error!("Failed to process directory {}: {:#}", input_set.display(), e);
                report.failed.push((input_set, format!("{:#}", e)));
            }
        }
    }
    if !report.failed.is_empty() {
        warn!("{} directories failed", report.failed.len());
    }
    Ok(report)
}

fn is_output_dir(input_set: &Path, output_canonical: &Option<PathBuf>) -> bool {
    match (output_canonical, input_set.canonicalize()) {
        (Some(out), Ok(dir)) => *out == dir,
        _ => false,
    }
}
