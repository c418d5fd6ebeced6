//! imgpack: batch image transcoder that packs each input directory into one zip archive.

pub mod engine;
pub mod pack;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use pack::pack_root;
pub use pipeline::pack_unit;
pub use utils::ShutdownSignal;

use log::debug;
use utils::config::PackagePaths;
use std::path::Path;

/// Result alias used by public imgpack API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point for lib callers: pack every subdirectory of `root` with `opts`.
///
/// - **`shutdown: None`** → a private signal nobody triggers; the run always completes.
/// - **`shutdown: Some(s)`** → trigger `s` (e.g. from your own signal handling) to finalize the
///   active archive and stop. The CLI passes [`ShutdownSignal::install`].
///
/// ```ignore
/// let opts = imgpack::PackOpts { num_threads: Some(4), progress: false, ..Default::default() };
/// let report = imgpack::pack_dir(std::path::Path::new("chapters"), &opts, None)?;
/// ```
pub fn pack_dir(
    root: &Path,
    opts: &PackOpts,
    shutdown: Option<&ShutdownSignal>,
) -> Result<PackReport> {
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );
    match shutdown {
        Some(s) => pack::pack_root(root, opts, s),
        None => pack::pack_root(root, opts, &ShutdownSignal::new()),
    }
}
