//! Background conversion worker
//!
//! A run owns exactly one worker thread. Progress flows back to the UI over
//! an mpsc channel, which the view drains on its own thread.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use super::batch::{BatchSummary, CancelToken, ConversionJob, RunId, RunOutcome, run_batch};
use super::ffmpeg::Encoder;

/// Events emitted by the background worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    /// About to hand a file to the encoder
    FileStarted {
        run_id: RunId,
        index: usize,
        input: PathBuf,
    },
    /// The encoder failed for one file; the run keeps going
    FileFailed {
        run_id: RunId,
        index: usize,
        input: PathBuf,
        error: String,
    },
    /// One more file processed
    Progress {
        run_id: RunId,
        finished: usize,
        succeeded: usize,
        failed: usize,
        total: usize,
    },
    /// Every file was processed without a cancel
    Completed { run_id: RunId, summary: BatchSummary },
}

impl ConversionEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            ConversionEvent::FileStarted { run_id, .. }
            | ConversionEvent::FileFailed { run_id, .. }
            | ConversionEvent::Progress { run_id, .. }
            | ConversionEvent::Completed { run_id, .. } => *run_id,
        }
    }
}

/// Handle for controlling a running conversion from the UI
pub struct RunHandle {
    run_id: RunId,
    cancel: Arc<CancelToken>,
    worker: Option<JoinHandle<RunOutcome>>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Request cancellation; takes effect at the next checkpoint, or
    /// immediately if the encoder may be interrupted
    pub fn cancel(&self) {
        log::info!("Run {}: cancel requested", self.run_id);
        self.cancel.cancel();
    }

    /// Cancel and kill the running encoder even if the run was started
    /// without interrupting encoders
    pub fn interrupt(&self) {
        log::info!("Run {}: interrupting encoder", self.run_id);
        self.cancel.interrupt();
    }

    /// Wait for the worker to exit
    pub fn join(mut self) -> Option<RunOutcome> {
        self.worker.take().and_then(|w| w.join().ok())
    }
}

/// Start converting `job` on a new worker thread
pub fn start_conversion(
    job: ConversionJob,
    encoder: Arc<dyn Encoder>,
    interrupt_encoder_on_cancel: bool,
) -> Result<(RunHandle, mpsc::Receiver<ConversionEvent>), String> {
    let (event_tx, event_rx) = mpsc::channel();
    let cancel = Arc::new(CancelToken::new(interrupt_encoder_on_cancel));
    let run_id = job.run_id;

    let worker_cancel = cancel.clone();
    let worker = thread::Builder::new()
        .name(format!("convert-{}", run_id))
        .spawn(move || {
            run_batch(&job, encoder.as_ref(), &worker_cancel, |event| {
                // The view may already have dropped the receiver
                let _ = event_tx.send(event);
            })
        })
        .map_err(|e| format!("Failed to start conversion thread: {}", e))?;

    Ok((
        RunHandle {
            run_id,
            cancel,
            worker: Some(worker),
        },
        event_rx,
    ))
}
