use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use liveguard_core::deepfake::domain::deepfake_scorer::DeepfakeScorer;
use liveguard_core::deepfake::domain::heuristic_model::HeuristicDeepfakeModel;
use liveguard_core::detection::domain::face_locator::FaceLocator;
use liveguard_core::detection::infrastructure::cascade_face_locator::CascadeFaceLocator;
use liveguard_core::detection::infrastructure::precomputed_face_locator::PrecomputedFaceLocator;
use liveguard_core::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
use liveguard_core::pipeline::pipeline_logger::LogPipelineLogger;
use liveguard_core::shared::bounding_box::BoundingBox;
use liveguard_core::shared::config::AnalysisConfig;
use liveguard_core::video::infrastructure::scratch_file_decoder::ScratchFileDecoder;

const CONFIG_DIR_NAME: &str = "liveguard";
const CONFIG_FILE_NAME: &str = "config.json";

/// Liveness, quality and deepfake scoring for short face videos.
#[derive(Parser)]
#[command(name = "liveguard")]
struct Cli {
    /// Input video (WebM or MP4).
    input: PathBuf,

    /// Sample every Nth decoded frame.
    #[arg(long)]
    sample_interval: Option<usize>,

    /// Maximum number of sampled frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Worker threads for per-frame work (0 = all cores).
    #[arg(long)]
    threads: Option<usize>,

    /// JSON config file. Defaults to the user config dir when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON map of frame index to [x, y, w, h] face boxes; skips detection.
    #[arg(long)]
    faces: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let locator = build_locator(cli.faces.as_deref())?;
    let scorer = DeepfakeScorer::Heuristic(HeuristicDeepfakeModel::new(&config.calibration));

    let bytes = fs::read(&cli.input)?;
    log::info!("Analysing {} ({} bytes)", cli.input.display(), bytes.len());

    let use_case = AnalyzeVideoUseCase::new(
        Box::new(ScratchFileDecoder::new()),
        locator,
        scorer,
        config,
    );
    let mut logger = LogPipelineLogger::new();
    let scores = use_case.execute_with_logger(&bytes, &mut logger);

    let json = if cli.pretty {
        serde_json::to_string_pretty(&scores)?
    } else {
        serde_json::to_string(&scores)?
    };
    println!("{json}");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path(cli.config.as_deref()) {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            AnalysisConfig::load(&path)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(interval) = cli.sample_interval {
        config.sample_interval = interval;
    }
    if let Some(max_frames) = cli.max_frames {
        config.max_frames = max_frames;
    }
    if let Some(threads) = cli.threads {
        config.worker_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

/// Explicit path wins; otherwise the user config file, if it exists.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn build_locator(faces: Option<&Path>) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    let Some(path) = faces else {
        return Ok(Box::new(CascadeFaceLocator::new()));
    };
    let json = fs::read_to_string(path)?;
    let raw: HashMap<usize, [i32; 4]> = serde_json::from_str(&json)
        .map_err(|e| format!("Invalid face boxes in {}: {e}", path.display()))?;
    log::info!("Using {} precomputed face boxes", raw.len());

    let boxes = raw
        .into_iter()
        .map(|(index, [x, y, w, h])| (index, BoundingBox::new(x, y, w, h)))
        .collect();
    Ok(Box::new(PrecomputedFaceLocator::new(Arc::new(boxes))))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.sample_interval == Some(0) {
        return Err("Sample interval must be at least 1".into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if let Some(faces) = &cli.faces {
        if !faces.exists() {
            return Err(format!("Face box file not found: {}", faces.display()).into());
        }
    }
    Ok(())
}
