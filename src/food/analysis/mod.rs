pub mod normalizer;

pub use normalizer::{normalize, normalize_partial, ShapeError};
