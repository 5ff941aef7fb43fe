//! Mathematical helpers for placement transforms and texture addressing

pub mod euler;
pub mod morton;

pub use euler::{euler_angles, normalize_or_identity, placement_rotation};
pub use morton::{swizzle_2d, unswizzle_2d};
