use std::collections::HashMap;
use std::time::Instant;

use crate::deepfake::domain::deepfake_scorer::DeepfakeScorer;
use crate::deepfake::domain::roi_tensor::RoiTensor;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::roi_extractor::extract_face_roi;
use crate::motion::liveness_scorer::score_liveness;
use crate::motion::optical_flow::{DenseFlowEstimator, OpticalFlowField};
use crate::motion::presage_features::compute_presage_features;
use crate::pipeline::infrastructure::frame_worker_pool::FrameWorkerPool;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger, Stage};
use crate::pipeline::score_set::ScoreSet;
use crate::pulse::pulse_detector::PulseDetector;
use crate::quality::quality_scorer::compute_quality_score;
use crate::sampling::frame_sampler::sample_frames;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::AnalysisConfig;
use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;
use crate::shared::math::clamp01;
use crate::video::domain::video_decoder::VideoDecoder;

/// Full scoring pipeline for one clip:
/// decode → sample → locate → {quality, flow → liveness/presage, pulse,
/// deepfake} → score set.
///
/// Holds no per-call state, so one instance can serve any number of calls.
pub struct AnalyzeVideoUseCase {
    decoder: Box<dyn VideoDecoder>,
    locator: Box<dyn FaceLocator>,
    scorer: DeepfakeScorer,
    flow: DenseFlowEstimator,
    pulse: PulseDetector,
    pool: FrameWorkerPool,
    config: AnalysisConfig,
}

impl AnalyzeVideoUseCase {
    pub fn new(
        decoder: Box<dyn VideoDecoder>,
        locator: Box<dyn FaceLocator>,
        scorer: DeepfakeScorer,
        config: AnalysisConfig,
    ) -> Self {
        let calibration = &config.calibration;
        Self {
            decoder,
            locator,
            scorer,
            flow: DenseFlowEstimator::new(),
            pulse: PulseDetector::new(
                calibration.pulse_confidence_floor,
                calibration.micro_motion_floor,
            ),
            pool: FrameWorkerPool::new(config.worker_threads),
            config,
        }
    }

    pub fn execute(&self, bytes: &[u8]) -> ScoreSet {
        self.execute_with_logger(bytes, &mut NullPipelineLogger)
    }

    /// Never fails: fatal conditions become a zeroed score set tagged with
    /// the reason.
    pub fn execute_with_logger(&self, bytes: &[u8], logger: &mut dyn PipelineLogger) -> ScoreSet {
        let scores = match self.analyze(bytes, logger) {
            Ok(scores) => scores,
            Err(e) => {
                log::warn!("Analysis aborted: {e}");
                ScoreSet::zeroed([e.signal()])
            }
        };
        logger.summary();
        scores
    }

    fn analyze(
        &self,
        bytes: &[u8],
        logger: &mut dyn PipelineLogger,
    ) -> Result<ScoreSet, AnalysisError> {
        let start = Instant::now();
        let video = self.decoder.decode(bytes)?;
        logger.timing(Stage::Decode, elapsed_ms(start));
        logger.metric("decoded_frames", video.frames.len() as f64);
        let frames = &video.frames;

        let start = Instant::now();
        let sample = sample_frames(
            frames.len(),
            self.config.sample_interval,
            self.config.max_frames,
        );
        logger.timing(Stage::Sample, elapsed_ms(start));
        if sample.indices.is_empty() {
            let reason = AnalysisError::NoSampledFrames;
            log::warn!("Analysis aborted: {reason}");
            let mut signals = sample.signals;
            signals.push(reason.signal());
            return Ok(ScoreSet::zeroed(signals));
        }
        let mut scores = ScoreSet::zeroed(sample.signals);
        let sampled: Vec<Frame> = sample.indices.iter().map(|&i| frames[i].clone()).collect();
        logger.metric("sampled_frames", sampled.len() as f64);

        // One pass covers the pulse window and any sampled frame beyond it.
        let start = Instant::now();
        let window = self.config.pulse_window.min(frames.len());
        let mut to_locate: Vec<usize> = (0..window).collect();
        to_locate.extend(sample.indices.iter().copied().filter(|&i| i >= window));
        let located: HashMap<usize, Option<BoundingBox>> = to_locate
            .iter()
            .copied()
            .zip(self.pool.map(&to_locate, |&i| self.locator.locate(&frames[i])))
            .collect();
        logger.progress(to_locate.len(), to_locate.len());
        logger.timing(Stage::Locate, elapsed_ms(start));

        let boxes: Vec<Option<BoundingBox>> = sample
            .indices
            .iter()
            .map(|i| located.get(i).copied().flatten())
            .collect();
        let rois: Vec<Option<Frame>> = sampled
            .iter()
            .zip(&boxes)
            .map(|(frame, bbox)| bbox.as_ref().and_then(|b| extract_face_roi(frame, b)))
            .collect();

        let start = Instant::now();
        let quality = compute_quality_score(&rois, &self.config.calibration);
        logger.timing(Stage::Quality, elapsed_ms(start));
        logger.metric("face_presence_ratio", quality.face_presence_ratio);
        scores.quality = quality.score;
        scores.signals.extend(quality.signals);

        let start = Instant::now();
        let flows = self.pairwise_flows(&sampled);
        logger.timing(Stage::Flow, elapsed_ms(start));

        let start = Instant::now();
        let liveness = score_liveness(&boxes, &flows, self.config.motion_threshold);
        logger.timing(Stage::Liveness, elapsed_ms(start));
        scores.liveness = liveness.score;
        scores.signals.extend(liveness.signals);

        let start = Instant::now();
        let presage = compute_presage_features(&sampled, &rois, &boxes, &flows);
        logger.timing(Stage::Presage, elapsed_ms(start));
        scores.presage = presage.score;
        scores.presage_raw = presage.raw;
        scores.signals.extend(presage.signals);

        let start = Instant::now();
        let window_boxes: Vec<Option<BoundingBox>> = (0..window)
            .map(|i| located.get(&i).copied().flatten())
            .collect();
        let fps = video.metadata.sample_rate(self.config.default_fps);
        let mut pulse = self
            .pulse
            .detect(&frames[..window], &window_boxes, fps);
        logger.timing(Stage::Pulse, elapsed_ms(start));
        scores.signals.extend(pulse.signals.drain(..));
        scores.pulse = pulse;

        let start = Instant::now();
        let tensors = self.pool.map(&rois, |roi| {
            roi.as_ref()
                .map_or_else(RoiTensor::empty, RoiTensor::from_roi)
        });
        let deepfake = self.scorer.score(&tensors);
        logger.timing(Stage::Deepfake, elapsed_ms(start));
        scores.deepfake_mean = clamp01(deepfake.mean);
        scores.deepfake_var = clamp01(deepfake.variance);
        scores.signals.extend(deepfake.signals);

        logger.info(&format!(
            "Scored {} sampled frames: liveness {:.3}, quality {:.3}, presage {:.3}, deepfake {:.3}",
            sampled.len(),
            scores.liveness,
            scores.quality,
            scores.presage,
            scores.deepfake_mean
        ));
        Ok(scores)
    }

    /// Flow from each sampled frame to the next, in order.
    fn pairwise_flows(&self, sampled: &[Frame]) -> Vec<OpticalFlowField> {
        let lumas = self.pool.map(sampled, Frame::luma);
        let pairs: Vec<usize> = (1..lumas.len()).collect();
        self.pool
            .map(&pairs, |&i| self.flow.estimate(&lumas[i - 1], &lumas[i]))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
