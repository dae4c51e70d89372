pub mod cascade_face_locator;
pub mod precomputed_face_locator;
