//! Run control for ConverterView
//!
//! Starting and cancelling runs, and draining worker events into the state.

use std::sync::Arc;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use gpui::{AsyncApp, Context, Timer, WeakEntity};

use crate::conversion::{ConversionJob, FfmpegEncoder, RunId, start_conversion, verify_ffmpeg};
use crate::core::{AppSettings, Effect, Transition};

use super::ConverterView;

impl ConverterView {
    /// Start/Stop button and menu action
    pub fn toggle_run(&mut self, cx: &mut Context<Self>) {
        let settings = cx.global::<AppSettings>().clone();
        if self.handle_start_stop(&settings) {
            self.start_event_polling(cx);
        }
        cx.notify();
    }

    /// Returns true if a new worker was started
    pub(crate) fn handle_start_stop(&mut self, settings: &AppSettings) -> bool {
        match self.state.apply(Transition::StartStopPressed) {
            Effect::StartRun(job) => self.launch(job, settings),
            Effect::CancelRun(run_id) => {
                self.cancel_active_run(run_id);
                false
            }
            _ => false,
        }
    }

    fn launch(&mut self, job: ConversionJob, settings: &AppSettings) -> bool {
        self.finish_stopping_run();

        let run_id = job.run_id;
        let started = verify_ffmpeg(settings.ffmpeg_path.as_deref()).and_then(|ffmpeg| {
            log::info!("Using ffmpeg at {}", ffmpeg.display());
            start_conversion(
                job,
                Arc::new(FfmpegEncoder::new(ffmpeg)),
                settings.interrupt_encoder_on_cancel,
            )
        });

        match started {
            Ok((handle, rx)) => {
                self.active_run = Some(handle);
                self.event_rx = Some(rx);
                true
            }
            Err(error) => {
                self.state.apply(Transition::StartFailed { run_id, error });
                false
            }
        }
    }

    /// Signal the worker and stop listening to it
    ///
    /// The worker may still be inside its current file; it is kept in
    /// `stopping_run` until the next start reaps it. Its remaining events
    /// go nowhere.
    fn cancel_active_run(&mut self, run_id: RunId) {
        if let Some(handle) = self.active_run.take() {
            if handle.run_id() == run_id {
                log::info!("Cancelling run {}", run_id);
                handle.cancel();
            }
            self.stopping_run = Some(handle);
        }
        self.event_rx = None;
    }

    /// Only one encoder may run at a time: kill and join a cancelled
    /// worker that is still busy before starting another
    fn finish_stopping_run(&mut self) {
        if let Some(handle) = self.stopping_run.take() {
            log::info!("Waiting for cancelled run {} to exit", handle.run_id());
            handle.interrupt();
            let _ = handle.join();
        }
    }

    /// Drain pending worker events
    ///
    /// Returns true if anything changed.
    pub(crate) fn poll_conversion_events(&mut self) -> bool {
        let Some(rx) = self.event_rx.as_ref() else {
            return false;
        };

        let mut events = Vec::new();
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let changed = !events.is_empty() || disconnected;
        for event in events {
            self.state.apply(Transition::Conversion(event));
        }

        if disconnected {
            self.event_rx = None;
            // A worker that ends without reporting completion died
            if let Some(run_id) = self.state.running_id() {
                self.state.apply(Transition::WorkerExited { run_id });
            }
            if let Some(handle) = self.active_run.take() {
                let handle_id = handle.run_id();
                if let Some(outcome) = handle.join() {
                    log::debug!(
                        "Run {} worker exited, {} files skipped",
                        handle_id,
                        outcome.summary().skipped
                    );
                }
            }
        }

        changed
    }

    /// Poll worker events until the run's channel closes
    fn start_event_polling(&mut self, cx: &mut Context<Self>) {
        if self.polling_active {
            return;
        }
        self.polling_active = true;

        cx.spawn(|this: WeakEntity<Self>, cx: &mut AsyncApp| {
            let mut async_cx = cx.clone();
            async move {
                loop {
                    Timer::after(Duration::from_millis(50)).await;

                    let should_continue = this
                        .update(&mut async_cx, |this, cx| {
                            if this.poll_conversion_events() {
                                cx.notify();
                            }
                            let keep_polling = this.event_rx.is_some();
                            if !keep_polling {
                                this.polling_active = false;
                            }
                            keep_polling
                        })
                        .unwrap_or(false);

                    if !should_continue {
                        break;
                    }
                }
            }
        })
        .detach();
    }
}
