//! Public and internal types for the imgpack API and pipeline.

use image::DynamicImage;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One decoded source image on its way from the enumerator to a transform worker.
pub struct WorkItem {
    /// Logical name: the file name without its extension.
    pub identity: String,
    /// Size of the source file in bytes.
    pub original_size: u64,
    pub image: DynamicImage,
}

/// One re-encoded image on its way from a transform worker to the sink.
#[derive(Clone, Debug)]
pub struct ResultItem {
    pub identity: String,
    pub original_size: u64,
    /// Encoded bytes. May be empty or partial when encoding failed under [`EncodeFailurePolicy::Placeholder`].
    pub encoded: Vec<u8>,
}

/// Message carried by the worker → sink queue.
#[derive(Clone, Debug)]
pub enum Transformed {
    /// Write this item to the archive.
    Encoded(ResultItem),
    /// Encoding failed under [`EncodeFailurePolicy::Skip`]; the sink lowers its expected total.
    Dropped { identity: String },
}

/// Output encoding. Quality is passed through to the encoder uninterpreted (ignored by png and gif).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetFormat {
    #[default]
    Webp,
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
}

impl TargetFormat {
    /// File extension used for archive entry names (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Webp => "webp",
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetFormat::Webp => "webp",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
            TargetFormat::Gif => "gif",
        })
    }
}

impl FromStr for TargetFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(TargetFormat::Webp),
            "jpg" | "jpeg" => Ok(TargetFormat::Jpeg),
            "png" => Ok(TargetFormat::Png),
            "gif" => Ok(TargetFormat::Gif),
            other => Err(anyhow::anyhow!("unsupported output format: {}", other)),
        }
    }
}

/// What a transform worker does with an item whose encode failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFailurePolicy {
    /// Forward whatever the failed encode left in the buffer (possibly empty).
    #[default]
    Placeholder,
    /// Drop the item; the sink's expected total is decremented so progress still reaches 100%.
    Skip,
}

/// How archive entries are named from an item's identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntryNaming {
    /// `identity.<target extension>`, e.g. `p1.webp`.
    #[default]
    Extension,
    /// Bare identity, e.g. `p1`.
    Bare,
}

impl EntryNaming {
    pub fn entry_name(self, identity: &str, format: TargetFormat) -> String {
        match self {
            EntryNaming::Extension => format!("{}.{}", identity, format.extension()),
            EntryNaming::Bare => identity.to_string(),
        }
    }
}

/// Transform settings. Immutable for a run and shared read-only by every worker.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub format: TargetFormat,
    /// Encoder quality in [1, 100].
    pub quality: f32,
    /// Maximum output width in pixels. 0 disables resizing.
    pub max_width: u32,
    pub on_encode_failure: EncodeFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: TargetFormat::default(),
            quality: crate::utils::config::DEFAULT_QUALITY,
            max_width: crate::utils::config::DEFAULT_MAX_WIDTH,
            on_encode_failure: EncodeFailurePolicy::default(),
        }
    }
}

/// Full options for a packing run (CLI and lib).
#[derive(Clone, Debug)]
pub struct PackOpts {
    pub pipeline: PipelineConfig,
    pub entry_naming: EntryNaming,
    /// Directory archives are written into. When None, archives land in the root being packed.
    pub output_dir: Option<PathBuf>,
    /// Workers per unit and capacity of both hand-off queues. When None, uses available parallelism.
    pub num_threads: Option<usize>,
    /// Show the live progress bar.
    pub progress: bool,
    /// List skipped files individually.
    pub verbose: bool,
}

impl Default for PackOpts {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            entry_naming: EntryNaming::default(),
            output_dir: None,
            num_threads: None,
            progress: true,
            verbose: false,
        }
    }
}

impl PackOpts {
    /// Effective concurrency: the override, or the rayon pool size.
    pub fn concurrency(&self) -> usize {
        self.num_threads
            .unwrap_or_else(rayon::current_num_threads)
            .max(1)
    }

    /// Reject settings the encoders cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let q = self.pipeline.quality;
        if !(1.0..=100.0).contains(&q) {
            anyhow::bail!("quality must be between 1 and 100, got {}", q);
        }
        if self.num_threads == Some(0) {
            anyhow::bail!("threads must be at least 1");
        }
        Ok(())
    }
}

/// How one unit of work ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitOutcome {
    /// No eligible files; no archive was created.
    Empty,
    /// Archive finalized after the pipeline drained.
    Completed(UnitSummary),
    /// Shutdown was requested; the archive was finalized with the entries written so far.
    Interrupted(UnitSummary),
}

/// Totals reported by the sink when a unit ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitSummary {
    pub archive: PathBuf,
    pub entries_written: usize,
    pub items_processed: usize,
    pub items_expected: usize,
    pub original_bytes: u64,
    pub encoded_bytes: u64,
}

/// Result of packing every input set under a root.
#[derive(Debug, Default)]
pub struct PackReport {
    /// One entry per input set that was attempted, in processing order.
    pub units: Vec<(PathBuf, UnitOutcome)>,
    /// Input sets whose unit failed (e.g. archive could not be created), with the error text.
    pub failed: Vec<(PathBuf, String)>,
    /// True when shutdown stopped the run; later input sets were not attempted.
    pub interrupted: bool,
}

impl PackReport {
    /// Archives produced (completed or interrupted units).
    pub fn archives(&self) -> Vec<&PathBuf> {
        self.units
            .iter()
            .filter_map(|(_, o)| match o {
                UnitOutcome::Completed(s) | UnitOutcome::Interrupted(s) => Some(&s.archive),
                UnitOutcome::Empty => None,
            })
            .collect()
    }
}
