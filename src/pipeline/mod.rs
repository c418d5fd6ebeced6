//! Pipeline components: hand-off queues, enumerator, transform pool, archive sink, orchestration.

pub mod context;
pub mod enumerate;
pub mod error_handler;
pub mod orchestrator;
pub mod sink;
pub mod stage;
pub mod transform;

pub use context::{
    HandOff, PipelineChannels, SkippedFiles, completion_group, create_pipeline_channels,
};
pub use enumerate::{EnumerateOutcome, run_enumeration, spawn_enumerator, to_outcome};
pub use error_handler::report_skipped_files;
pub use orchestrator::pack_unit;
pub use sink::{ArchiveSink, SinkOutcome, spawn_sink};
pub use stage::{Stage, spawn_stage};
pub use transform::{TransformStage, spawn_transform_workers};
