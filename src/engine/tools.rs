//! Path, eligibility, and formatting utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::utils::config::{ARCHIVE_EXTENSION, ELIGIBLE_EXTENSIONS};

/// Check if a file is an OS artefact that must never be treated as input
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" => true,
            // macOS resource forks (e.g. `._cover.jpg`)
            _ => name.starts_with("._"),
        }
    } else {
        false
    }
}

/// True if `path` has an eligible image extension (case-insensitive) and is not an OS artefact.
pub fn is_image_file(path: &Path) -> bool {
    if is_os_hidden_file(path) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            ELIGIBLE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Logical name of an input file: its file name without the extension.
pub fn identity_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate entries of `dir` (non-recursive), sorted by file name.
pub fn immediate_entries(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
}

/// Count eligible image files directly under `dir`. Unreadable dirs and entries count as zero.
pub fn count_eligible_files(dir: &Path) -> usize {
    immediate_entries(dir)
        .filter_map(|r| r.ok())
        .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
        .count()
}

/// Immediate subdirectories of `root`, sorted by name. Each one is an input set.
pub fn list_input_sets(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in immediate_entries(root) {
        let entry = entry.with_context(|| format!("read directory {}", root.display()))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// `<output_dir>/<input-set basename>.zip`
pub fn archive_path_for(input_set: &Path, output_dir: &Path) -> PathBuf {
    let base = input_set
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    output_dir.join(format!("{base}.{ARCHIVE_EXTENSION}"))
}

/// Byte count in binary-prefix units: `512 B`, `1.5 KiB`, `3.2 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < PREFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}iB", bytes as f64 / div as f64, PREFIXES[exp])
}
