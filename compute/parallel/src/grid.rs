//! Shared double-buffered grid
//!
//! Workers of one round write disjoint row ranges of the round's write
//! buffer while all of them read the other buffer. No lock guards the
//! cells: safety rests entirely on the partition invariant (claims are
//! disjoint) and on the barrier keeping rounds from overlapping. The whole
//! engine's `unsafe` surface is confined to this module.

use data::{surface::Temperature, Precision};
use ndarray::{ArrayView2, ArrayViewMut2};
use std::{cell::UnsafeCell, ops::Range};

/// Double-buffered temperature grid shared by workers and coordinator
#[derive(Debug)]
pub struct SharedSurface {
    /// The two buffers; which one is read and which one written alternates
    /// with round parity
    buffers: [UnsafeCell<Temperature>; 2],

    /// Raw bases of the two buffers, captured once so that concurrent
    /// window construction never materializes a unique reference
    bases: [*mut Precision; 2],

    /// Grid side length
    side: usize,
}
//
// SAFETY: all concurrent access goes through the round protocol. The write
// buffer is only touched through disjoint row windows and the read buffer
// is never written during the round that reads it.
unsafe impl Sync for SharedSurface {}
//
impl SharedSurface {
    /// Seed both buffers from the loaded grid
    ///
    /// Boundary cells are never written afterwards, so seeding both buffers
    /// keeps the boundary condition visible whichever buffer ends up being
    /// exported.
    pub fn new(initial: Temperature) -> Self {
        debug_assert!(initial.is_standard_layout());
        let side = initial.nrows();
        let mut first = initial.clone();
        let mut second = initial;
        let bases = [first.as_mut_ptr(), second.as_mut_ptr()];
        Self {
            buffers: [UnsafeCell::new(first), UnsafeCell::new(second)],
            bases,
            side,
        }
    }

    /// Grid side length
    pub fn side(&self) -> usize {
        self.side
    }

    /// Buffer index read during round `step`
    fn read_index(step: usize) -> usize {
        step % 2
    }

    /// Buffer index holding the settled state after `completed_steps` rounds
    fn settled_index(completed_steps: usize) -> usize {
        completed_steps % 2
    }

    /// View of the buffer read during round `step`
    ///
    /// # Safety
    ///
    /// Round `step` must be in progress, so that no worker holds a write
    /// window into this buffer for the lifetime of the view.
    pub unsafe fn read_view(&self, step: usize) -> ArrayView2<'_, Precision> {
        let base = self.bases[Self::read_index(step)] as *const Precision;
        // SAFETY: in-bounds shape, and per the caller's contract the buffer
        // is only read while the view lives.
        unsafe { ArrayView2::from_shape_ptr((self.side, self.side), base) }
    }

    /// Mutable window over `rows` of the buffer written during round `step`
    ///
    /// # Safety
    ///
    /// `rows` must be a claim from the round partitioner, so that no two
    /// live windows overlap, and round `step` must be in progress, so that
    /// nobody is reading this buffer.
    pub unsafe fn write_rows(
        &self,
        step: usize,
        rows: Range<usize>,
    ) -> ArrayViewMut2<'_, Precision> {
        debug_assert!(rows.end <= self.side);
        let write_index = 1 - Self::read_index(step);
        // SAFETY: in-bounds for any interior row range, and windows built
        // from disjoint `rows` never alias.
        unsafe {
            let base = self.bases[write_index].add(rows.start * self.side);
            ArrayViewMut2::from_shape_ptr((rows.len(), self.side), base)
        }
    }

    /// View of the settled buffer after `completed_steps` rounds
    ///
    /// # Safety
    ///
    /// Every worker of the round that brought the count to `completed_steps`
    /// must have reported done, and the next round must not have been armed
    /// yet (the checkpoint pause), so the buffer cannot change under the
    /// view.
    pub unsafe fn settled(&self, completed_steps: usize) -> ArrayView2<'_, Precision> {
        let base = self.bases[Self::settled_index(completed_steps)] as *const Precision;
        // SAFETY: in-bounds shape; immutability per the caller's contract.
        unsafe { ArrayView2::from_shape_ptr((self.side, self.side), base) }
    }

    /// Extract the settled grid once the run is over and `self` is unshared
    pub fn into_settled(self, completed_steps: usize) -> Temperature {
        let [first, second] = self.buffers.map(UnsafeCell::into_inner);
        match Self::settled_index(completed_steps) {
            0 => first,
            _ => second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn buffers_alternate_with_round_parity() {
        let surface = SharedSurface::new(Array2::zeros((4, 4)));
        unsafe {
            // Round 0 writes buffer 1...
            surface.write_rows(0, 1..3)[[0, 1]] = 1.0;
            assert_eq!(surface.settled(1)[[1, 1]], 1.0);

            // ...which round 1 reads while writing buffer 0
            assert_eq!(surface.read_view(1)[[1, 1]], 1.0);
            surface.write_rows(1, 1..3)[[0, 1]] = 2.0;
            assert_eq!(surface.settled(2)[[1, 1]], 2.0);
            assert_eq!(surface.read_view(2)[[1, 1]], 2.0);
        }

        assert_eq!(surface.into_settled(2)[[1, 1]], 2.0);
    }

    #[test]
    fn window_rows_are_offset_into_the_grid() {
        let surface = SharedSurface::new(Array2::zeros((6, 6)));
        unsafe {
            let mut window = surface.write_rows(0, 3..5);
            assert_eq!(window.nrows(), 2);
            window[[0, 2]] = 7.0;
            assert_eq!(surface.settled(1)[[3, 2]], 7.0);
        }
    }

    #[test]
    fn boundaries_are_seeded_in_both_buffers() {
        let initial = Array2::from_shape_fn((5, 5), |(i, j)| (i * 5 + j) as Precision);
        let surface = SharedSurface::new(initial.clone());
        for completed_steps in [1, 2] {
            let snapshot = unsafe { surface.settled(completed_steps) };
            assert_eq!(snapshot.row(0), initial.row(0));
            assert_eq!(snapshot.row(4), initial.row(4));
            assert_eq!(snapshot.column(0), initial.column(0));
            assert_eq!(snapshot.column(4), initial.column(4));
        }
    }
}
