use crate::shared::signal::Signal;

/// Below this many sampled frames the motion scorers have little to work with.
const LOW_FRAME_COUNT: usize = 3;

/// Positions (in decode order) selected for analysis, plus why the
/// selection may be weak.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSample {
    pub indices: Vec<usize>,
    pub signals: Vec<Signal>,
}

/// Picks every `interval`-th frame starting at 0, keeping at most
/// `max_frames`. An interval of 0 is treated as 1.
pub fn sample_frames(total: usize, interval: usize, max_frames: usize) -> FrameSample {
    if total == 0 {
        return FrameSample {
            indices: Vec::new(),
            signals: vec![Signal::NoFramesToSample],
        };
    }

    let stride = interval.max(1);
    let mut indices: Vec<usize> = (0..total).step_by(stride).collect();
    let mut signals = Vec::new();

    if indices.len() > max_frames {
        indices.truncate(max_frames);
        signals.push(Signal::MaxFramesLimited);
    }
    if indices.len() < LOW_FRAME_COUNT {
        signals.push(Signal::LowFrameCount);
    }

    FrameSample { indices, signals }
}
