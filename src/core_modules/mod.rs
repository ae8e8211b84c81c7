pub mod blob_detector;
pub mod clock;
pub mod color_classifier;
pub mod hsv_pixel;
pub mod mask_refiner;
pub mod navigator;
pub mod overlay;
pub mod smart_blob;
pub mod target_manager;
