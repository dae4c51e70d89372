pub mod pulse_detector;
