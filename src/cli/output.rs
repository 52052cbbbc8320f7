//! Output formatting for CLI results

use colorful::Colorful;
use serde::Serialize;
use std::path::PathBuf;

use crate::store::PlanOutput;

/// What happened to one track
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TrackStatus {
    /// Plan output computed and cached
    Generated,
    /// An up-to-date cache artifact already existed
    Skipped,
    /// Generation stopped with an error
    Failed(String),
}

/// Shape of one signal's output, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSummary {
    pub signal: String,
    /// `(feature, length)`; discrete lengths are event counts
    pub features: Vec<(String, usize)>,
    /// `(variant, frames, rows)`
    pub spectrograms: Vec<(String, usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackReport {
    pub track: PathBuf,
    #[serde(flatten)]
    pub status: TrackStatus,
    pub elapsed_secs: f64,
    pub signals: Vec<SignalSummary>,
}

impl TrackReport {
    pub fn new(track: PathBuf, status: TrackStatus, elapsed_secs: f64) -> Self {
        Self {
            track,
            status,
            elapsed_secs,
            signals: Vec::new(),
        }
    }

    pub fn with_output(mut self, output: &PlanOutput) -> Self {
        self.signals = summarize(output);
        self
    }
}

/// Whole-run summary
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub plan: String,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub tracks: Vec<TrackReport>,
}

impl RunSummary {
    pub fn new(plan: &str, tracks: Vec<TrackReport>) -> Self {
        let count = |f: fn(&TrackStatus) -> bool| tracks.iter().filter(|t| f(&t.status)).count();
        Self {
            plan: plan.to_string(),
            generated: count(|s| matches!(s, TrackStatus::Generated)),
            skipped: count(|s| matches!(s, TrackStatus::Skipped)),
            failed: count(|s| matches!(s, TrackStatus::Failed(_))),
            tracks,
        }
    }
}

pub fn summarize(output: &PlanOutput) -> Vec<SignalSummary> {
    output
        .signals
        .iter()
        .map(|(signal, data)| SignalSummary {
            signal: signal.to_string(),
            features: data
                .features
                .iter()
                .map(|(name, values)| (name.to_string(), values.len()))
                .collect(),
            spectrograms: data
                .spectrograms
                .iter()
                .map(|(variant, spec)| {
                    (variant.to_string(), spec.len(), spec.first().map_or(0, Vec::len))
                })
                .collect(),
        })
        .collect()
}

/// Format one track for terminal output
pub fn format_report(report: &TrackReport, verbose: bool) -> String {
    let name = report.track.display().to_string();
    let mut output = match &report.status {
        TrackStatus::Generated => format!(
            "{} {} {}\n",
            "✓".green(),
            name.bold(),
            format!("({:.1}s)", report.elapsed_secs).dim()
        ),
        TrackStatus::Skipped => format!("{} {} {}\n", "•".cyan(), name, "(cached)".dim()),
        TrackStatus::Failed(reason) => {
            format!("{} {}\n    {}\n", "✗".red(), name.bold(), reason.clone().yellow())
        }
    };

    if verbose {
        for summary in &report.signals {
            output.push_str(&format!("    {}\n", summary.signal.clone().cyan()));
            for (feature, len) in &summary.features {
                output.push_str(&format!("      {:<22} {}\n", feature, len));
            }
            for (variant, frames, rows) in &summary.spectrograms {
                output.push_str(&format!("      {:<22} {} x {}\n", variant, frames, rows));
            }
        }
    }

    output
}

pub fn print_report(report: &TrackReport, verbose: bool) {
    print!("{}", format_report(report, verbose));
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "\nPlan '{}': {} generated, {} cached, {}",
        summary.plan,
        summary.generated,
        summary.skipped,
        if summary.failed > 0 {
            format!("{} failed", summary.failed).red().to_string()
        } else {
            "0 failed".to_string()
        }
    );
}

pub fn print_json(summary: &RunSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
