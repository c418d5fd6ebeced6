use crossbeam_channel::{Receiver, Sender};
use log::warn;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::engine::codec::{encode_into, fit_width};
use crate::{EncodeFailurePolicy, PipelineConfig, ResultItem, Transformed, WorkItem};

use super::stage::{Stage, spawn_stage};

/// Resize + re-encode stage. Holds only the read-only config, so one instance serves every worker.
pub struct TransformStage {
    config: PipelineConfig,
}

impl TransformStage {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Transform one item. Encode failures are logged and resolved by the failure policy.
    pub fn transform(&self, item: WorkItem) -> Transformed {
        let WorkItem {
            identity,
            original_size,
            image,
        } = item;
        let image = fit_width(image, self.config.max_width);
        let mut encoded = Vec::new();
        if let Err(e) = encode_into(&image, &self.config, &mut encoded) {
            warn!(
                "file {} format {} failed: {:#}",
                identity, self.config.format, e
            );
            if self.config.on_encode_failure == EncodeFailurePolicy::Skip {
                return Transformed::Dropped { identity };
            }
        }
        Transformed::Encoded(ResultItem {
            identity,
            original_size,
            encoded,
        })
    }
}

impl Stage for TransformStage {
    type Input = WorkItem;
    type Output = Transformed;

    fn process(&self, input: WorkItem) -> Option<Transformed> {
        Some(self.transform(input))
    }
}

/// Spawn `num_threads` transform workers: read work items from `work_rx`, send results on
/// `result_tx`. Caller must drop its own `result_tx` and `done` after this so the result
/// queue closes once every worker has exited.
pub fn spawn_transform_workers(
    config: &PipelineConfig,
    work_rx: &Receiver<WorkItem>,
    result_tx: &Sender<Transformed>,
    num_threads: usize,
    done: &Sender<()>,
) -> Vec<JoinHandle<()>> {
    let stage = Arc::new(TransformStage::new(config.clone()));
    spawn_stage(stage, work_rx, result_tx, num_threads, done)
}
