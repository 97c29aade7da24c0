//! Double-buffered trail map

use crate::{
    alloc::{self, ResourceError},
    Precision,
};
use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use std::sync::atomic::{AtomicU32, Ordering};

/// Storage of one trail map buffer
pub type ScalarField = Array2<Precision>;

/// Read-only view of a trail map buffer
pub type FieldView<'a> = ArrayView2<'a, Precision>;

/// Mutable view of (a subset of) a trail map buffer
pub type FieldViewMut<'a> = ArrayViewMut2<'a, Precision>;

/// Pair of trail map buffers where one is current and the other is secondary
///
/// The current buffer is what agents sense and deposit into, and what gets
/// presented. The secondary buffer receives the diffused and evaporated
/// version of the current buffer, then the buffers swap roles.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailMap {
    /// Both buffers, indexed by role
    buffers: [ScalarField; 2],

    /// Index of the current buffer within `buffers`
    current: usize,
}
//
impl TrailMap {
    /// Allocate a pair of all-zeros buffers
    ///
    /// `shape` specifies the trail map dimensions as [rows, cols], e.g. [1080, 1920]
    pub fn zeros(shape: [usize; 2]) -> Result<Self, ResourceError> {
        let len = alloc::checked_len("trail map", shape)?;
        let make_buffer = || -> Result<ScalarField, ResourceError> {
            let cells = alloc::try_filled_vec("trail map", len, 0.0)?;
            Ok(ScalarField::from_shape_vec(shape, cells).expect("length matches shape"))
        };
        Ok(Self {
            buffers: [make_buffer()?, make_buffer()?],
            current: 0,
        })
    }

    /// Check out the shape of the trail map as [rows, cols]
    pub fn shape(&self) -> [usize; 2] {
        let [rows, cols] = self.buffers[0].shape() else {
            unreachable!("trail maps are 2D")
        };
        [*rows, *cols]
    }

    /// Read-only view of the current buffer
    pub fn current(&self) -> FieldView<'_> {
        self.buffers[self.current].view()
    }

    /// Mutable access to the current buffer
    pub fn current_mut(&mut self) -> &mut ScalarField {
        &mut self.buffers[self.current]
    }

    /// Access the current buffer as a target for concurrent deposits
    pub fn current_atomic(&mut self) -> AtomicTrail<'_> {
        let shape = self.shape();
        let cells = self
            .current_mut()
            .as_slice_mut()
            .expect("trail maps are allocated in standard layout");
        AtomicTrail::new(cells, shape)
    }

    /// Access the current buffer as input and the secondary buffer as output
    pub fn in_out(&mut self) -> (FieldView<'_>, FieldViewMut<'_>) {
        let [first, second] = &mut self.buffers;
        if self.current == 0 {
            (first.view(), second.view_mut())
        } else {
            (second.view(), first.view_mut())
        }
    }

    /// Make the secondary buffer become the current one
    pub fn flip(&mut self) {
        self.current = 1 - self.current;
    }

    /// Reset both buffers to zero
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
    }
}

/// Current trail map buffer, shared between threads for deposits
///
/// Concurrent deposits landing on the same cell accumulate. Cells are stored
/// as the bit pattern of their `Precision` value and updated with a
/// compare-and-swap loop.
#[derive(Debug)]
pub struct AtomicTrail<'a> {
    /// Cells in row-major order
    cells: &'a [AtomicU32],

    /// Number of columns
    cols: usize,
}
//
// Reinterpreting cells as atomics requires identical size and alignment
const _: () = {
    assert!(std::mem::size_of::<Precision>() == std::mem::size_of::<AtomicU32>());
    assert!(std::mem::align_of::<Precision>() == std::mem::align_of::<AtomicU32>());
};
//
impl<'a> AtomicTrail<'a> {
    /// Wrap row-major cells of a trail map buffer
    fn new(cells: &'a mut [Precision], [rows, cols]: [usize; 2]) -> Self {
        assert_eq!(cells.len(), rows * cols);
        let len = cells.len();
        let ptr = cells.as_mut_ptr().cast::<AtomicU32>();
        // Safe because AtomicU32 has the size and alignment of Precision (see
        // above), and holding the exclusive borrow for 'a guarantees that no
        // non-atomic access can happen while the atomic view is alive.
        let cells = unsafe { std::slice::from_raw_parts(ptr, len) };
        Self { cells, cols }
    }

    /// Add `amount` to the cell at position `[row, col]`
    ///
    /// The result saturates at `Precision::MAX`.
    #[inline]
    pub fn add(&self, [row, col]: [usize; 2], amount: Precision) {
        let cell = &self.cells[row * self.cols + col];
        // The closure always returns Some, so this cannot fail
        let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((Precision::from_bits(bits) + amount).min(Precision::MAX).to_bits())
        });
    }

    /// Current value of the cell at position `[row, col]`
    #[inline]
    pub fn load(&self, [row, col]: [usize; 2]) -> Precision {
        Precision::from_bits(self.cells[row * self.cols + col].load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_roles() {
        let mut trail = TrailMap::zeros([3, 4]).unwrap();
        assert_eq!(trail.shape(), [3, 4]);
        assert!(trail.current().iter().all(|&x| x == 0.0));

        // Write something in the secondary buffer, it should become current
        {
            let (input, mut output) = trail.in_out();
            assert_eq!(input.shape(), output.shape());
            output[[1, 2]] = 3.0;
        }
        assert_eq!(trail.current()[[1, 2]], 0.0);
        trail.flip();
        assert_eq!(trail.current()[[1, 2]], 3.0);

        // The former current buffer is now the output
        {
            let (input, output) = trail.in_out();
            assert_eq!(input[[1, 2]], 3.0);
            assert_eq!(output[[1, 2]], 0.0);
        }
        trail.flip();
        assert_eq!(trail.current()[[1, 2]], 0.0);
    }

    #[test]
    fn clear() {
        let mut trail = TrailMap::zeros([2, 2]).unwrap();
        trail.current_mut().fill(1.0);
        trail.in_out().1.fill(2.0);
        trail.clear();
        assert!(trail.current().iter().all(|&x| x == 0.0));
        trail.flip();
        assert!(trail.current().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn atomic_deposits() {
        let mut trail = TrailMap::zeros([2, 3]).unwrap();
        trail.current_mut()[[1, 1]] = 0.5;
        {
            let atomic = trail.current_atomic();
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..100 {
                            atomic.add([1, 1], 1.0);
                            atomic.add([0, 2], 0.25);
                        }
                    });
                }
            });
            assert_eq!(atomic.load([1, 1]), 400.5);
        }
        assert_eq!(trail.current()[[1, 1]], 400.5);
        assert_eq!(trail.current()[[0, 2]], 100.0);
        assert_eq!(trail.current()[[0, 0]], 0.0);
    }
}
