pub mod deepfake_model;
pub mod deepfake_scorer;
pub mod heuristic_model;
pub mod roi_tensor;
pub mod temporal_consistency;
