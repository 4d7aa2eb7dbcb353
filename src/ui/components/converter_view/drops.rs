//! Drop handling for ConverterView
//!
//! Each drop is resolved as a whole on the background executor before the
//! state is touched, so the view never shows a half-resolved selection and
//! file-system checks stay off the UI thread. Only the latest drop on each
//! zone is applied.

use std::path::PathBuf;

use gpui::{AppContext, AsyncApp, Context, WeakEntity};

use crate::core::{
    AppSettings, DropResolution, DroppedPath, Effect, Transition, resolve_input_drop,
    resolve_output_drop,
};

use super::ConverterView;

impl ConverterView {
    /// Handle a Finder drop on the input zone
    pub fn handle_input_drop(&mut self, paths: &[PathBuf], cx: &mut Context<Self>) {
        let providers = DroppedPath::providers(paths);
        let seq = self.begin_input_drop();
        let resolving = cx.background_spawn(async move { resolve_input_drop(&providers).await });

        cx.spawn(move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
            let mut async_cx = cx.clone();
            async move {
                let resolution = resolving.await;
                let _ = this.update(&mut async_cx, |this, cx| {
                    if this.finish_input_drop(seq, resolution) {
                        cx.notify();
                    }
                });
            }
        })
        .detach();
    }

    /// Handle a Finder drop on the output zone
    pub fn handle_output_drop(&mut self, paths: &[PathBuf], cx: &mut Context<Self>) {
        let providers = DroppedPath::providers(paths);
        let seq = self.begin_output_drop();
        let resolving = cx.background_spawn(async move { resolve_output_drop(&providers).await });

        cx.spawn(move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
            let mut async_cx = cx.clone();
            async move {
                let resolution = resolving.await;
                let _ = this.update(&mut async_cx, |this, cx| {
                    let mut settings = cx.global::<AppSettings>().clone();
                    if this.finish_output_drop(seq, resolution, &mut settings) {
                        cx.set_global(settings);
                    }
                    cx.notify();
                });
            }
        })
        .detach();
    }

    pub(crate) fn begin_input_drop(&mut self) -> u64 {
        self.input_drop_seq += 1;
        self.input_drop_seq
    }

    pub(crate) fn begin_output_drop(&mut self) -> u64 {
        self.output_drop_seq += 1;
        self.output_drop_seq
    }

    /// Apply a finished input drop unless a newer one has started since
    ///
    /// Returns true if it was applied.
    pub(crate) fn finish_input_drop(
        &mut self,
        seq: u64,
        resolution: DropResolution<Vec<PathBuf>>,
    ) -> bool {
        if seq != self.input_drop_seq {
            log::debug!("Ignoring superseded input drop {}", seq);
            return false;
        }
        self.apply_input_resolution(resolution);
        true
    }

    /// Returns true when `settings` changed and should be published
    pub(crate) fn finish_output_drop(
        &mut self,
        seq: u64,
        resolution: DropResolution<Option<PathBuf>>,
        settings: &mut AppSettings,
    ) -> bool {
        if seq != self.output_drop_seq {
            log::debug!("Ignoring superseded output drop {}", seq);
            return false;
        }
        self.apply_output_resolution(resolution, settings)
    }

    pub(crate) fn apply_input_resolution(&mut self, resolution: DropResolution<Vec<PathBuf>>) {
        log::info!("{} input files selected", resolution.accepted.len());
        self.state.apply(Transition::InputsDropped(resolution));
    }

    /// Returns true when `settings` changed and should be published
    pub(crate) fn apply_output_resolution(
        &mut self,
        resolution: DropResolution<Option<PathBuf>>,
        settings: &mut AppSettings,
    ) -> bool {
        let Effect::OutputChanged(dir) = self.state.apply(Transition::OutputDropped(resolution))
        else {
            return false;
        };

        log::info!("Output folder set to {}", dir.display());
        if !settings.remember_output_dir {
            return false;
        }

        settings.last_output_dir = Some(dir);
        if let Err(e) = settings.save() {
            log::warn!("Failed to save settings: {}", e);
        }
        true
    }
}
