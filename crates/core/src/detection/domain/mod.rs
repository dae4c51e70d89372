pub mod face_locator;
pub mod roi_extractor;
