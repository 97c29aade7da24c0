//! Data model of the slime mold trail simulation

pub mod agents;
pub mod alloc;
pub mod colony;
pub mod gradient;
pub mod parameters;
pub mod trail;

use thiserror::Error;

/// Computation precision
pub type Precision = f32;

/// Build a 2-element array from a per-index generator
///
/// Shapes and positions are handled as `[rows, cols]` or `[x, y]` pairs
/// throughout the codebase, and this keeps per-axis computations terse.
#[inline]
pub fn array2<T>(f: impl FnMut(usize) -> T) -> [T; 2] {
    std::array::from_fn(f)
}

/// Things that can go wrong when setting up simulation data
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid simulation configuration
    #[error(transparent)]
    Config(#[from] parameters::ConfigError),

    /// Failed to allocate simulation storage
    #[error(transparent)]
    Resource(#[from] alloc::ResourceError),
}
