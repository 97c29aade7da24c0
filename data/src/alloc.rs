//! Fallible allocation of simulation storage
//!
//! Trail maps and agent populations can be large enough that allocation
//! failure is a realistic outcome, so storage is reserved up front and
//! failures are reported instead of aborting the process.

use thiserror::Error;

/// Failure to allocate simulation storage
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The requested element count overflows the address space
    #[error("{what} with {rows}x{cols} elements is too large to be addressed")]
    TooLarge {
        /// Storage that was being allocated
        what: &'static str,
        rows: usize,
        cols: usize,
    },

    /// The allocator refused the request
    #[error("failed to allocate {what} ({len} elements)")]
    Allocation {
        /// Storage that was being allocated
        what: &'static str,

        /// Number of elements that were requested
        len: usize,

        /// Underlying allocation error
        #[source]
        source: std::collections::TryReserveError,
    },
}

/// Number of elements in a 2D storage of a certain shape
pub fn checked_len(what: &'static str, [rows, cols]: [usize; 2]) -> Result<usize, ResourceError> {
    rows.checked_mul(cols)
        .ok_or(ResourceError::TooLarge { what, rows, cols })
}

/// Allocate a vector of `len` copies of `value`, reporting allocation failure
pub fn try_filled_vec<T: Clone>(
    what: &'static str,
    len: usize,
    value: T,
) -> Result<Vec<T>, ResourceError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(len)
        .map_err(|source| ResourceError::Allocation { what, len, source })?;
    storage.resize(len, value);
    Ok(storage)
}
