use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;

use crate::motion::optical_flow::DenseFlowEstimator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{MICRO_MOTION_FLOOR, PULSE_CONFIDENCE_FLOOR};
use crate::shared::frame::Frame;
use crate::shared::math::{clamp01, mean, round_to};
use crate::shared::signal::Signal;

/// Below this many window frames no estimate is attempted.
const MIN_FRAMES: usize = 10;
/// Green samples needed before the cardiac FFT is meaningful.
const MIN_CARDIAC_SAMPLES: usize = 15;
const MIN_BREATHING_SAMPLES: usize = 30;

const CARDIAC_BAND_HZ: (f64, f64) = (0.75, 4.0);
const BREATHING_BAND_HZ: (f64, f64) = (0.1, 0.5);
/// Band-to-total power ratio is scaled by this before capping at 1.
const CONFIDENCE_GAIN: f64 = 5.0;
const POWER_EPSILON: f64 = 1e-9;

/// Share of the face box height used as the forehead strip.
const FOREHEAD_FRACTION: f64 = 0.3;
const MIN_FACE_RATIO: f64 = 0.5;

/// Score and confidence reported when the window is too short to analyse.
const INSUFFICIENT_SCORE: f64 = 0.1;

/// rPPG estimate over the pulse window.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PulseReport {
    pub live_score: f64,
    pub pulse_detected: bool,
    pub heart_rate_bpm: Option<f64>,
    pub breathing_rate_bpm: Option<f64>,
    pub confidence: f64,
    pub motion_present: bool,
    #[serde(skip)]
    pub signals: Vec<Signal>,
}

/// Remote photoplethysmography from the forehead green channel.
///
/// Heart rate is the dominant frequency of the detrended green series inside
/// the cardiac band; confidence is that band's share of total spectral power.
/// Optical-flow energy inside the face box stands in for blinks and other
/// micro-motion that a printed photo lacks.
pub struct PulseDetector {
    confidence_floor: f64,
    motion_floor: f64,
    flow: DenseFlowEstimator,
}

impl PulseDetector {
    pub fn new(confidence_floor: f64, motion_floor: f64) -> Self {
        Self {
            confidence_floor,
            motion_floor,
            flow: DenseFlowEstimator::new(),
        }
    }

    /// `boxes` is aligned with `frames`; `fps` is the window's sample rate.
    pub fn detect(&self, frames: &[Frame], boxes: &[Option<BoundingBox>], fps: f64) -> PulseReport {
        if frames.len() < MIN_FRAMES {
            return PulseReport {
                live_score: INSUFFICIENT_SCORE,
                confidence: INSUFFICIENT_SCORE,
                signals: vec![Signal::InsufficientFramesForPulse],
                ..Default::default()
            };
        }

        let mut signals = Vec::new();
        let faces_found = boxes.iter().filter(|b| b.is_some()).count();
        if (faces_found as f64 / frames.len() as f64) < MIN_FACE_RATIO {
            signals.push(Signal::FaceNotConsistentlyDetected);
        }

        let series = green_series(frames, boxes);

        let spectrum = (series.len() >= MIN_CARDIAC_SAMPLES).then(|| Spectrum::of(&series, fps));

        let mut pulse_detected = false;
        let mut heart_rate_bpm = None;
        let mut confidence = 0.0;
        if let Some(spectrum) = &spectrum {
            confidence = (spectrum.band_power_ratio(CARDIAC_BAND_HZ) * CONFIDENCE_GAIN).min(1.0);
            if confidence > self.confidence_floor {
                if let Some(freq) = spectrum.dominant_frequency(CARDIAC_BAND_HZ) {
                    heart_rate_bpm = Some(round_to(freq * 60.0, 1));
                    pulse_detected = true;
                }
            }
        }

        let breathing_rate_bpm = spectrum
            .as_ref()
            .filter(|_| series.len() >= MIN_BREATHING_SAMPLES)
            .and_then(|spectrum| spectrum.dominant_frequency(BREATHING_BAND_HZ))
            .map(|freq| round_to(freq * 60.0, 1));

        let motion = mean(&self.motion_energies(frames, boxes));
        let motion_present = motion >= self.motion_floor;
        if !motion_present {
            signals.push(Signal::NoMicroMotionStaticImageSuspected);
        }
        if !pulse_detected {
            signals.push(Signal::NoCardiacSignalDetected);
        }

        log::debug!(
            "Pulse window: {} frames, {} faces, confidence {confidence:.3}, motion {motion:.4}",
            frames.len(),
            faces_found
        );

        PulseReport {
            live_score: live_score(pulse_detected, confidence, motion_present),
            pulse_detected,
            heart_rate_bpm,
            breathing_rate_bpm,
            confidence: round_to(confidence, 4),
            motion_present,
            signals,
        }
    }

    /// Flow energy between consecutive face crops. Faceless frames count as
    /// still; faced frames before any previous frame contribute nothing.
    fn motion_energies(&self, frames: &[Frame], boxes: &[Option<BoundingBox>]) -> Vec<f64> {
        let mut energies = Vec::new();
        let mut seen_face = false;
        for (i, frame) in frames.iter().enumerate() {
            let Some(bbox) = boxes.get(i).copied().flatten() else {
                energies.push(0.0);
                continue;
            };
            if seen_face && i > 0 {
                let prev = gray_crop(&frames[i - 1], &bbox);
                let curr = gray_crop(frame, &bbox);
                if let (Some(prev), Some(curr)) = (prev, curr) {
                    if prev.dim() == curr.dim() {
                        energies.push(self.flow.estimate(&prev, &curr).motion_energy());
                    }
                }
            }
            seen_face = true;
        }
        energies
    }
}

impl Default for PulseDetector {
    fn default() -> Self {
        Self::new(PULSE_CONFIDENCE_FLOOR, MICRO_MOTION_FLOOR)
    }
}

fn gray_crop(frame: &Frame, bbox: &BoundingBox) -> Option<Array2<f32>> {
    let clamped = bbox.clamp_to(frame.width(), frame.height())?;
    Some(frame.crop(&clamped).luma())
}

/// Mean forehead green per frame, gaps filled from the nearest earlier
/// sample (leading gaps from the first one). Empty when no frame has a face.
fn green_series(frames: &[Frame], boxes: &[Option<BoundingBox>]) -> Vec<f64> {
    let raw: Vec<Option<f64>> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let bbox = boxes.get(i).copied().flatten()?;
            let strip = BoundingBox::new(
                bbox.x,
                bbox.y,
                bbox.w,
                (bbox.h as f64 * FOREHEAD_FRACTION) as i32,
            )
            .clamp_to(frame.width(), frame.height())?;
            Some(frame.crop(&strip).channel_mean(1))
        })
        .collect();

    let Some(first) = raw.iter().flatten().next().copied() else {
        return Vec::new();
    };
    let mut last = first;
    raw.into_iter()
        .map(|sample| {
            if let Some(v) = sample {
                last = v;
            }
            last
        })
        .collect()
}

/// One-sided power spectrum of a detrended real series.
struct Spectrum {
    freqs: Vec<f64>,
    magnitudes: Vec<f64>,
}

impl Spectrum {
    fn of(series: &[f64], fps: f64) -> Self {
        let n = series.len();
        let m = mean(series);
        let mut buf: Vec<Complex<f64>> = series.iter().map(|&v| Complex::new(v - m, 0.0)).collect();

        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut buf);

        let bins = n / 2 + 1;
        Self {
            freqs: (0..bins).map(|k| k as f64 * fps / n as f64).collect(),
            magnitudes: buf[..bins].iter().map(|c| c.norm()).collect(),
        }
    }

    fn in_band(&self, band: (f64, f64)) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.freqs
            .iter()
            .zip(self.magnitudes.iter())
            .filter(move |&(&f, _)| f >= band.0 && f <= band.1)
            .map(|(&f, &m)| (f, m))
    }

    fn band_power_ratio(&self, band: (f64, f64)) -> f64 {
        let band_power: f64 = self.in_band(band).map(|(_, m)| m * m).sum();
        let total: f64 = self.magnitudes.iter().map(|m| m * m).sum::<f64>() + POWER_EPSILON;
        band_power / total
    }

    /// Strongest in-band frequency; `None` when the band is empty or silent.
    fn dominant_frequency(&self, band: (f64, f64)) -> Option<f64> {
        self.in_band(band)
            .filter(|&(f, m)| m > 0.0 && f > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f)
    }
}

/// `0.60·pulse + 0.25·confidence + 0.15·motion`, clamped and rounded to four
/// places.
pub fn live_score(pulse_detected: bool, confidence: f64, motion_present: bool) -> f64 {
    let pulse = if pulse_detected { 1.0 } else { 0.0 };
    let motion = if motion_present { 1.0 } else { 0.0 };
    round_to(clamp01(0.60 * pulse + 0.25 * confidence + 0.15 * motion), 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    const FPS: f64 = 30.0;
    const SIDE: u32 = 24;

    /// Uniform frames whose green channel oscillates at `hz`.
    fn pulsing_frames(count: usize, hz: f64) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let t = i as f64 / FPS;
                let g = (128.0 + 6.0 * (2.0 * PI * hz * t).sin()).round() as u8;
                Frame::new([90, g, 80].repeat((SIDE * SIDE) as usize), SIDE, SIDE, 3, i)
            })
            .collect()
    }

    fn face() -> Option<BoundingBox> {
        Some(BoundingBox::new(2, 2, 20, 20))
    }

    #[test]
    fn test_short_window_is_low_confidence() {
        let frames = pulsing_frames(5, 1.2);
        let report = PulseDetector::default().detect(&frames, &[face(); 5], FPS);
        assert_relative_eq!(report.live_score, 0.1);
        assert_relative_eq!(report.confidence, 0.1);
        assert!(!report.pulse_detected);
        assert_eq!(report.signals, vec![Signal::InsufficientFramesForPulse]);
    }

    #[test]
    fn test_recovers_heart_rate() {
        let frames = pulsing_frames(150, 1.2);
        let report = PulseDetector::default().detect(&frames, &vec![face(); 150], FPS);
        assert!(report.pulse_detected);
        assert_relative_eq!(report.heart_rate_bpm.unwrap(), 72.0);
        assert!(report.confidence > 0.9);
        // uniform crops carry no flow
        assert!(!report.motion_present);
        assert!(report.signals.contains(&Signal::NoMicroMotionStaticImageSuspected));
        assert!(!report.signals.contains(&Signal::NoCardiacSignalDetected));
        assert_relative_eq!(report.live_score, live_score(true, report.confidence, false));
    }

    #[test]
    fn test_no_face_reports_no_pulse() {
        let frames = pulsing_frames(40, 1.2);
        let report = PulseDetector::default().detect(&frames, &vec![None; 40], FPS);
        assert!(!report.pulse_detected);
        assert_eq!(report.heart_rate_bpm, None);
        assert_relative_eq!(report.live_score, 0.0);
        assert!(report.signals.contains(&Signal::FaceNotConsistentlyDetected));
        assert!(report.signals.contains(&Signal::NoCardiacSignalDetected));
    }

    #[test]
    fn test_green_series_fills_gaps() {
        let frames = pulsing_frames(4, 1.0);
        let boxes = vec![None, face(), None, face()];
        let series = green_series(&frames, &boxes);
        assert_eq!(series.len(), 4);
        assert_relative_eq!(series[0], series[1]);
        assert_relative_eq!(series[2], series[1]);
        assert_relative_eq!(series[3], frames[3].channel_mean(1));
    }

    #[test]
    fn test_green_series_empty_without_faces() {
        let frames = pulsing_frames(4, 1.0);
        assert!(green_series(&frames, &[None; 4]).is_empty());
    }

    #[test]
    fn test_spectrum_dominant_frequency() {
        let series: Vec<f64> = (0..60).map(|i| (2.0 * PI * 2.0 * i as f64 / FPS).sin()).collect();
        let spectrum = Spectrum::of(&series, FPS);
        assert_relative_eq!(spectrum.dominant_frequency(CARDIAC_BAND_HZ).unwrap(), 2.0);
        assert!(spectrum.band_power_ratio(CARDIAC_BAND_HZ) > 0.99);
    }

    #[test]
    fn test_live_score_weights() {
        assert_relative_eq!(live_score(true, 1.0, true), 1.0);
        assert_relative_eq!(live_score(false, 0.5, true), 0.275);
        assert_relative_eq!(live_score(false, 0.0, false), 0.0);
    }
}
