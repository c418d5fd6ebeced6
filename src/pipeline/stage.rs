//! Generic pull-transform-push stage run on a pool of identical threads.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// One step of a pipeline. Implementations are stateless with respect to items and
/// shared read-only by every thread of the pool.
pub trait Stage: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Turn one input into at most one output. `None` forwards nothing.
    fn process(&self, input: Self::Input) -> Option<Self::Output>;
}

/// Single stage thread: pull until the input closes and drains, push each output.
/// Exits early if the downstream consumer has gone away.
fn stage_loop<S: Stage>(stage: Arc<S>, input: Receiver<S::Input>, output: Sender<S::Output>) {
    while let Ok(item) = input.recv() {
        if let Some(out) = stage.process(item)
            && output.send(out).is_err()
        {
            break;
        }
    }
}

/// Spawn `workers` threads running `stage`. Each thread holds a clone of `done` until it
/// exits. Caller must drop its own `output` sender and `done` sender afterwards so the
/// downstream queue and the completion group can close.
pub fn spawn_stage<S: Stage>(
    stage: Arc<S>,
    input: &Receiver<S::Input>,
    output: &Sender<S::Output>,
    workers: usize,
    done: &Sender<()>,
) -> Vec<JoinHandle<()>> {
    (0..workers.max(1))
        .map(|_| {
            let stage = Arc::clone(&stage);
            let input = input.clone();
            let output = output.clone();
            let done = done.clone();
            thread::spawn(move || {
                stage_loop(stage, input, output);
                drop(done);
            })
        })
        .collect()
}
