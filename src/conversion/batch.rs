//! Sequential batch conversion
//!
//! Converts the inputs of a job one after another. The cancel token is
//! consulted right before each file starts and right after it returns.
//! Once a run is cancelled nothing else is emitted for it.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, ExitStatus};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use super::background::ConversionEvent;
use super::ffmpeg::{ConversionResult, Encoder, output_path_for};

/// How often a waiting worker checks whether ffmpeg has exited
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Identifies one run so stale events from a cancelled run can be ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First block of the uuid is plenty for log lines
        let id = self.0.simple().to_string();
        write!(f, "{}", &id[..8])
    }
}

/// Snapshot of the selection taken when a run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub run_id: RunId,
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

impl ConversionJob {
    pub fn total(&self) -> usize {
        self.inputs.len()
    }
}

/// Cancellation shared between the UI and the worker
///
/// Besides the flag it tracks the pid of the running encoder, so a cancel
/// can also kill a long encode instead of waiting for it.
#[derive(Debug)]
pub struct CancelToken {
    cancelled: AtomicBool,
    interrupt_encoder: AtomicBool,
    running_pids: Mutex<HashSet<u32>>,
}

impl CancelToken {
    pub fn new(interrupt_encoder: bool) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            interrupt_encoder: AtomicBool::new(interrupt_encoder),
            running_pids: Mutex::new(HashSet::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if self.interrupt_encoder.load(Ordering::SeqCst) {
            self.kill_running_processes();
        }
    }

    /// Cancel and kill the running encoder, whatever the token was
    /// created with
    pub fn interrupt(&self) {
        self.interrupt_encoder.store(true, Ordering::SeqCst);
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for an encoder process to exit
    ///
    /// The pid stays registered until the child is reaped, and reaping
    /// happens under the same lock the killer takes, so a kill never
    /// targets a pid that was already released to the OS.
    pub fn wait_for_child(&self, child: &mut Child) -> io::Result<ExitStatus> {
        let pid = child.id();
        self.pids().insert(pid);
        // Cancelled between the checkpoint and the spawn
        if self.is_cancelled() && self.interrupt_encoder.load(Ordering::SeqCst) {
            self.kill_running_processes();
        }

        loop {
            {
                let mut pids = self.pids();
                match child.try_wait() {
                    Ok(Some(status)) => {
                        pids.remove(&pid);
                        return Ok(status);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        pids.remove(&pid);
                        return Err(e);
                    }
                }
            }
            thread::sleep(CHILD_POLL_INTERVAL);
        }
    }

    fn pids(&self) -> std::sync::MutexGuard<'_, HashSet<u32>> {
        self.running_pids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Kill every registered encoder while holding the registry lock
    fn kill_running_processes(&self) {
        let mut pids = self.pids();
        for pid in pids.drain() {
            log::info!("Killing encoder process {}", pid);
            #[cfg(unix)]
            unsafe {
                // SIGKILL for immediate termination
                libc::kill(pid as i32, libc::SIGKILL);
            }
            #[cfg(not(unix))]
            {
                // No portable kill by pid; the file boundary checkpoint
                // still stops the run
                let _ = pid;
            }
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(BatchSummary),
    Cancelled(BatchSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> BatchSummary {
        match self {
            RunOutcome::Completed(s) | RunOutcome::Cancelled(s) => *s,
        }
    }
}

/// Run a job to completion or cancellation
///
/// Files are converted strictly in input order. A failed file is reported
/// and counted but does not stop the batch.
pub fn run_batch(
    job: &ConversionJob,
    encoder: &dyn Encoder,
    cancel: &CancelToken,
    mut emit: impl FnMut(ConversionEvent),
) -> RunOutcome {
    let total = job.total();
    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };

    log::info!(
        "Run {}: converting {} files into {}",
        job.run_id,
        total,
        job.output_dir.display()
    );

    for (index, input) in job.inputs.iter().enumerate() {
        if cancel.is_cancelled() {
            return cancelled(job, summary);
        }

        emit(ConversionEvent::FileStarted {
            run_id: job.run_id,
            index,
            input: input.clone(),
        });

        let result = match output_path_for(input, &job.output_dir) {
            Some(output) => encoder.encode(input, &output, cancel),
            None => ConversionResult::failed(
                input,
                &job.output_dir,
                "Input has no file name".to_string(),
            ),
        };

        if cancel.is_cancelled() {
            return cancelled(job, summary);
        }

        if result.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
            let error = result.error.unwrap_or_else(|| "Unknown error".to_string());
            log::warn!("Failed: {} - {}", input.display(), error);
            emit(ConversionEvent::FileFailed {
                run_id: job.run_id,
                index,
                input: input.clone(),
                error,
            });
        }

        emit(ConversionEvent::Progress {
            run_id: job.run_id,
            finished: summary.finished(),
            succeeded: summary.succeeded,
            failed: summary.failed,
            total,
        });
    }

    // A cancel that lands during the last progress callback still wins
    if cancel.is_cancelled() {
        return cancelled(job, summary);
    }

    log::info!(
        "Run {} complete: {} converted, {} failed",
        job.run_id,
        summary.succeeded,
        summary.failed
    );
    emit(ConversionEvent::Completed {
        run_id: job.run_id,
        summary,
    });
    RunOutcome::Completed(summary)
}

fn cancelled(job: &ConversionJob, mut summary: BatchSummary) -> RunOutcome {
    summary.skipped = summary.total - summary.finished();
    log::info!(
        "Run {} cancelled: {} finished, {} skipped",
        job.run_id,
        summary.finished(),
        summary.skipped
    );
    RunOutcome::Cancelled(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::RecordingEncoder;
    use std::path::Path;

    fn job_with(names: &[&str]) -> ConversionJob {
        ConversionJob {
            run_id: RunId::new(),
            inputs: names.iter().map(|n| PathBuf::from("/in").join(n)).collect(),
            output_dir: PathBuf::from("/out"),
        }
    }

    #[test]
    fn test_run_id_is_unique() {
        assert_ne!(RunId::new(), RunId::new());
        assert_eq!(RunId::new().to_string().len(), 8);
    }

    #[test]
    fn test_completes_in_input_order() {
        let job = job_with(&["b.m4a", "a.m4a", "c.m4a"]);
        let encoder = RecordingEncoder::new();
        let cancel = CancelToken::new(false);
        let mut events = Vec::new();

        let outcome = run_batch(&job, &encoder, &cancel, |e| events.push(e));

        assert_eq!(
            encoder.invocations(),
            vec![
                (PathBuf::from("/in/b.m4a"), PathBuf::from("/out/b.mp3")),
                (PathBuf::from("/in/a.m4a"), PathBuf::from("/out/a.mp3")),
                (PathBuf::from("/in/c.m4a"), PathBuf::from("/out/c.mp3")),
            ]
        );
        assert_eq!(
            outcome,
            RunOutcome::Completed(BatchSummary {
                total: 3,
                succeeded: 3,
                failed: 0,
                skipped: 0,
            })
        );
        assert!(matches!(events.last(), Some(ConversionEvent::Completed { .. })));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let job = job_with(&["1.m4a", "2.m4a", "3.m4a", "4.m4a"]);
        let encoder = RecordingEncoder::new();
        let mut finished = Vec::new();

        run_batch(&job, &encoder, &CancelToken::new(false), |e| {
            if let ConversionEvent::Progress { finished: f, total, .. } = e {
                assert_eq!(total, 4);
                finished.push(f);
            }
        });

        assert_eq!(finished, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel_after_k_files() {
        for k in 1..=3 {
            let job = job_with(&["1.m4a", "2.m4a", "3.m4a"]);
            let encoder = RecordingEncoder::new();
            let cancel = CancelToken::new(false);
            let mut events = Vec::new();

            let outcome = run_batch(&job, &encoder, &cancel, |e| {
                if let ConversionEvent::Progress { finished, .. } = e {
                    if finished == k {
                        cancel.cancel();
                    }
                }
                events.push(e);
            });

            assert_eq!(encoder.invocations().len(), k, "k = {}", k);
            assert!(matches!(outcome, RunOutcome::Cancelled(_)), "k = {}", k);
            assert_eq!(outcome.summary().skipped, 3 - k);
            assert!(
                !events
                    .iter()
                    .any(|e| matches!(e, ConversionEvent::Completed { .. })),
                "cancelled run must not report completion"
            );
        }
    }

    #[test]
    fn test_cancel_before_start_invokes_nothing() {
        let job = job_with(&["1.m4a", "2.m4a"]);
        let encoder = RecordingEncoder::new();
        let cancel = CancelToken::new(false);
        cancel.cancel();
        let mut events = Vec::new();

        let outcome = run_batch(&job, &encoder, &cancel, |e| events.push(e));

        assert!(encoder.invocations().is_empty());
        assert!(events.is_empty());
        assert_eq!(
            outcome,
            RunOutcome::Cancelled(BatchSummary {
                total: 2,
                succeeded: 0,
                failed: 0,
                skipped: 2,
            })
        );
    }

    #[test]
    fn test_cancel_during_encode_suppresses_progress() {
        let job = job_with(&["1.m4a", "2.m4a", "3.m4a"]);
        // Cancels while the second file is "encoding"
        let encoder = RecordingEncoder::new().cancelling_on(1);
        let cancel = CancelToken::new(false);
        let mut progress = Vec::new();

        let outcome = run_batch(&job, &encoder, &cancel, |e| {
            if let ConversionEvent::Progress { finished, .. } = e {
                progress.push(finished);
            }
        });

        assert_eq!(encoder.invocations().len(), 2);
        assert_eq!(progress, vec![1]);
        assert_eq!(outcome.summary().skipped, 2);
    }

    #[test]
    fn test_failures_are_reported_and_batch_continues() {
        let job = job_with(&["ok.m4a", "broken.m4a", "fine.m4a"]);
        let encoder = RecordingEncoder::new().failing_on(Path::new("/in/broken.m4a"));
        let mut failures = Vec::new();

        let outcome = run_batch(&job, &encoder, &CancelToken::new(false), |e| {
            if let ConversionEvent::FileFailed { index, error, .. } = e {
                failures.push((index, error));
            }
        });

        assert_eq!(encoder.invocations().len(), 3);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(
            outcome,
            RunOutcome::Completed(BatchSummary {
                total: 3,
                succeeded: 2,
                failed: 1,
                skipped: 0,
            })
        );
    }

    #[test]
    fn test_empty_job_completes_immediately() {
        let job = job_with(&[]);
        let encoder = RecordingEncoder::new();
        let mut events = Vec::new();

        let outcome = run_batch(&job, &encoder, &CancelToken::new(false), |e| events.push(e));

        assert!(encoder.invocations().is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(outcome.summary().total, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_running_encoder() {
        use crate::conversion::FfmpegEncoder;
        use crate::test_fixtures::{fake_ffmpeg, make_input_files};
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let inputs = make_input_files(input_dir.path(), &["slow.m4a", "next.m4a"]);
        let job = ConversionJob {
            run_id: RunId::new(),
            inputs,
            output_dir: output_dir.path().to_path_buf(),
        };
        let encoder = FfmpegEncoder::new(fake_ffmpeg().to_path_buf());
        let cancel = Arc::new(CancelToken::new(true));

        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(300));
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let outcome = run_batch(&job, &encoder, &cancel, |_| {});
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcome.summary().skipped, 2);
        assert!(!output_dir.path().join("next.mp3").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_for_child_releases_pid_once_reaped() {
        let cancel = CancelToken::new(true);
        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg("exit 3")
            .spawn()
            .unwrap();

        let status = cancel.wait_for_child(&mut child).unwrap();

        assert_eq!(status.code(), Some(3));
        assert!(cancel.pids().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_kills_even_when_cancel_would_not() {
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let cancel = Arc::new(CancelToken::new(false));
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();

        let interrupter = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                cancel.interrupt();
            })
        };

        let started = Instant::now();
        let status = cancel.wait_for_child(&mut child).unwrap();
        interrupter.join().unwrap();

        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(cancel.is_cancelled());
        assert!(cancel.pids().is_empty());
    }
}
