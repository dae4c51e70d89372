pub mod quality_scorer;
