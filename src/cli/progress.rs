//! Progress display driven by pipeline events

use indicatif::{ProgressBar, ProgressStyle};

use crate::store::{PipelineEvent, PipelineListener};

/// Shows one bar step per track and the current pipeline stage as the
/// bar message.
pub struct CliListener {
    pb: ProgressBar,
}

impl CliListener {
    pub fn new(pb: ProgressBar) -> Self {
        Self { pb }
    }

    /// Bar sized for `tracks` tracks
    pub fn progress_bar(tracks: usize) -> ProgressBar {
        let pb = ProgressBar::new(tracks as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl PipelineListener for CliListener {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::TrackSelected { track } => {
                let name = track
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.pb.set_message(name);
            }
            PipelineEvent::SignalsDissected { signals } => {
                let names: Vec<&str> = signals.iter().map(|s| s.as_str()).collect();
                self.pb.set_message(format!("dissected {}", names.join(", ")));
            }
            PipelineEvent::SpectrogramGenerated { signal, variant } => {
                self.pb.set_message(format!("{} {}", signal, variant));
            }
            PipelineEvent::FeatureGenerated { signal, feature } => {
                self.pb.set_message(format!("{} {}", signal, feature));
            }
            PipelineEvent::CacheHit { .. } => self.pb.set_message("cached"),
            _ => {}
        }
        log::trace!("{:?}", event);
    }
}
