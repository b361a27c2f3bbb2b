//! Packed vectors and numeric helpers shared by the Lace component models
mod misc;
mod vector;

pub use misc::*;
pub use vector::*;
