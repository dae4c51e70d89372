pub mod liveness_scorer;
pub mod optical_flow;
pub mod presage_features;
