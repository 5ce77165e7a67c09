pub mod classifier;
pub mod color;
pub mod contour;
pub mod filters;
pub mod frame;
pub mod geometry;
pub mod utils;
