use std::collections::BTreeSet;

use serde::{Serialize, Serializer};

use crate::motion::presage_features::PresageFeatures;
use crate::pulse::pulse_detector::PulseReport;
use crate::shared::signal::Signal;

/// Result of one analysis call. Every numeric field is in `[0, 1]` except the
/// pulse rates, which are in beats/breaths per minute.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreSet {
    pub deepfake_mean: f64,
    pub deepfake_var: f64,
    pub liveness: f64,
    pub quality: f64,
    pub presage: f64,
    pub presage_raw: PresageFeatures,
    pub pulse: PulseReport,
    #[serde(serialize_with = "sorted_tags")]
    pub signals: BTreeSet<Signal>,
}

impl ScoreSet {
    /// All scores zero, carrying only the given tags.
    pub fn zeroed(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }
}

fn sorted_tags<S: Serializer>(signals: &BTreeSet<Signal>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut tags: Vec<&str> = signals.iter().map(Signal::as_str).collect();
    tags.sort_unstable();
    serializer.collect_seq(tags)
}
