use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Pipeline stages in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Decode,
    Sample,
    Locate,
    Quality,
    Flow,
    Liveness,
    Presage,
    Pulse,
    Deepfake,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Sample => "sample",
            Stage::Locate => "locate",
            Stage::Quality => "quality",
            Stage::Flow => "flow",
            Stage::Liveness => "liveness",
            Stage::Presage => "presage",
            Stage::Pulse => "pulse",
            Stage::Deepfake => "deepfake",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for one analysis call.
///
/// Keeps the use case free of any particular output mechanism; the CLI logs
/// through `log`, tests discard everything.
pub trait PipelineLogger: Send {
    /// Frames processed so far in the current per-frame stage.
    fn progress(&mut self, current: usize, total: usize);

    /// Wall-clock time spent in a stage.
    fn timing(&mut self, stage: Stage, duration_ms: f64);

    /// Point-in-time value such as a frame count or face ratio.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-analysis report. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: Stage, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Collects stage timings and metrics and reports them through `log`.
pub struct LogPipelineLogger {
    timings: BTreeMap<Stage, f64>,
    metrics: BTreeMap<String, f64>,
    start_time: Instant,
    messages: Vec<String>,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!("Analysis summary ({elapsed_ms:.1}ms total):")];

        for (stage, total_ms) in &self.timings {
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {:10}: {total_ms:8.1}ms  ({pct:4.1}%)", stage.as_str()));
        }
        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value:.3}"));
        }

        Some(lines.join("\n"))
    }

    /// Accumulated time for a stage, if it ran.
    pub fn timing_for(&self, stage: Stage) -> Option<f64> {
        self.timings.get(&stage).copied()
    }

    /// Last recorded value of a metric.
    pub fn metric_for(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        if total > 0 && current == total {
            log::debug!("Located faces in {total} frames");
        }
    }

    fn timing(&mut self, stage: Stage, duration_ms: f64) {
        *self.timings.entry(stage).or_default() += duration_ms;
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
