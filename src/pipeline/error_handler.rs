use log::warn;

use super::context::SkippedFiles;

/// Summarise files the enumerator skipped. Call after the enumerator has finished.
/// Returns the skip count.
pub fn report_skipped_files(unit: &str, skipped: &SkippedFiles, verbose: bool) -> usize {
    let skipped = skipped.lock().unwrap_or_else(|e| e.into_inner());
    if !skipped.is_empty() {
        warn!(
            "{}: skipped {} files that could not be opened or decoded",
            unit,
            skipped.len()
        );
        if verbose {
            for (path, msg) in skipped.iter() {
                eprintln!("  skipped: {} ({})", path.display(), msg);
            }
        }
    }
    skipped.len()
}
