pub mod blob_extractor;
pub mod center_point;
pub mod color_segmenter;
pub mod hsv;
pub mod line_fitter;
pub mod mask_refiner;
pub mod side_partitioner;
