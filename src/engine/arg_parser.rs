use clap::Parser;
use std::path::PathBuf;

use crate::{EncodeFailurePolicy, EntryNaming, TargetFormat};

struct DefaultArgs;

impl DefaultArgs {
    pub const ROOT: &'static str = ".";
}

/// Batch image transcoder: packs every subdirectory of ROOT into `<subdir>.zip`.
#[derive(Clone, Parser)]
#[command(name = "imgpack")]
#[command(about = "Re-encode the images of each subdirectory and pack them into one zip per subdirectory.")]
pub struct Cli {
    /// Directory whose immediate subdirectories are packed. Default: current directory.
    #[arg(value_name = "ROOT", default_value = DefaultArgs::ROOT)]
    pub root: PathBuf,

    /// Where archives are written. Default: ROOT.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(long, short, value_enum, ignore_case = true)]
    pub format: Option<TargetFormat>,

    /// Output quality for webp and jpeg (1-100).
    #[arg(long, short, value_parser = parse_quality)]
    pub quality: Option<f32>,

    /// Maximum width of the output images (0 for no resizing).
    #[arg(long, short = 'w')]
    pub max_width: Option<u32>,

    /// Worker threads per directory (also the hand-off queue capacity). Default: available parallelism.
    #[arg(long, short = 'j', value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// What to do with an image whose encode failed.
    #[arg(long, value_enum)]
    pub on_encode_failure: Option<EncodeFailurePolicy>,

    /// Archive entry naming: `extension` (p1.webp) or `bare` (p1).
    #[arg(long, value_enum)]
    pub entry_naming: Option<EntryNaming>,

    /// Hide the progress bar.
    #[arg(long)]
    pub quiet: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

fn parse_quality(s: &str) -> Result<f32, String> {
    let q: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (1.0..=100.0).contains(&q) {
        Ok(q)
    } else {
        Err(format!("quality must be between 1 and 100, got {q}"))
    }
}
