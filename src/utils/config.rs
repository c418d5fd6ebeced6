//! Application configuration constants.
//! Defaults and display tuning in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    settings_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                settings_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-root settings file, e.g. `.imgpack.toml`.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }
}

// ---- Input / output ----

/// Source extensions eligible for transcoding (compared case-insensitively, without the dot).
pub const ELIGIBLE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Extension of the per-input-set archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

// ---- Transform defaults ----

pub const DEFAULT_QUALITY: f32 = 75.0;

/// Default maximum output width in pixels (0 disables resizing).
pub const DEFAULT_MAX_WIDTH: u32 = 1080;

// ---- Progress ----

/// Progress display tuning.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Columns taken by the bar animation itself, independent of terminal width.
    pub const BAR_WIDTH: u16 = 50;
    pub const UNIT: &'static str = " img";
}
