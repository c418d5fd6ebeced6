//! Load `.imgpack.toml` from the root directory (CLI only). Lib callers build [`PackOpts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{EncodeFailurePolicy, EntryNaming, PackOpts, TargetFormat};

#[derive(Debug, Default, Deserialize)]
pub struct ImgpackToml {
    #[serde(default)]
    settings: PackSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackSection {
    format: Option<String>,
    quality: Option<f32>,
    max_width: Option<u32>,
    threads: Option<usize>,
    output: Option<String>,
    on_encode_failure: Option<EncodeFailurePolicy>,
    entry_naming: Option<EntryNaming>,
    progress: Option<bool>,
    verbose: Option<bool>,
}

/// Parse settings text. Errors carry the toml diagnostic.
pub fn parse_imgpack_toml(text: &str) -> anyhow::Result<ImgpackToml> {
    Ok(toml::from_str(text)?)
}

/// Load the settings file from `dir` if present. Returns None if missing, unreadable, or malformed (logged).
pub fn load_imgpack_toml(dir: &Path) -> Option<ImgpackToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_imgpack_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $target:expr, $field:ident => $($path:ident).+) => {
        if let Some(v) = $sec.$field {
            $target.$($path).+ = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
/// An unknown `format` is reported and left at its previous value.
pub fn apply_file_to_opts(file: &ImgpackToml, opts: &mut PackOpts) {
    let sec = &file.settings;
    if let Some(ref f) = sec.format {
        match f.parse::<TargetFormat>() {
            Ok(format) => opts.pipeline.format = format,
            Err(e) => log::warn!("{}: {}", PackagePaths::get().settings_filename(), e),
        }
    }
    apply_file_opt!(sec, opts, quality => pipeline.quality);
    apply_file_opt!(sec, opts, max_width => pipeline.max_width);
    apply_file_opt!(sec, opts, on_encode_failure => pipeline.on_encode_failure);
    apply_file_opt!(sec, opts, entry_naming => entry_naming);
    apply_file_opt!(sec, opts, progress => progress);
    apply_file_opt!(sec, opts, verbose => verbose);
    if let Some(n) = sec.threads {
        opts.num_threads = Some(n);
    }
    if let Some(ref p) = sec.output {
        opts.output_dir = Some(PathBuf::from(p));
    }
}
