//! Finite-difference stencil kernel
//!
//! The kernel is deliberately dumb: it updates one batch of interior rows
//! and knows nothing about rounds, buffers or workers. All of the
//! interesting machinery lives in the backends that drive it.

use data::{parameters::Parameters, Precision};
use ndarray::{ArrayView2, ArrayViewMut2};
use std::ops::Range;

/// Apply one diffusion step to the interior cells of `rows`
///
/// `input` is the full read grid for this round, `output` a view of exactly
/// the claimed `rows` of the write grid. Each interior cell becomes a
/// five-point combination of itself and its four neighbors in the read grid;
/// boundary columns are left untouched.
pub fn diffuse_rows(
    params: &Parameters,
    input: ArrayView2<'_, Precision>,
    mut output: ArrayViewMut2<'_, Precision>,
    rows: Range<usize>,
) {
    debug_assert_eq!(output.nrows(), rows.len());
    debug_assert_eq!(output.ncols(), input.ncols());
    debug_assert!(rows.start >= 1 && rows.end <= input.nrows().saturating_sub(1));

    let side = input.ncols();
    let (cx, cy) = (params.diffusion_rate_x, params.diffusion_rate_y);
    for (mut out_row, i) in output.rows_mut().into_iter().zip(rows) {
        for y in 1..side - 1 {
            let center = input[[i, y]];
            out_row[y] = center
                + cx * (input[[i, y + 1]] + input[[i, y - 1]] - 2.0 * center)
                + cy * (input[[i + 1, y]] + input[[i - 1, y]] - 2.0 * center);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array2};

    #[test]
    fn heat_spreads_from_a_hot_cell() {
        let mut input = Array2::zeros((5, 5));
        input[[2, 2]] = 100.0;
        let mut output = Array2::zeros((5, 5));

        diffuse_rows(
            &Parameters::default(),
            input.view(),
            output.slice_mut(s![1..4, ..]),
            1..4,
        );

        assert_eq!(output[[2, 2]], 60.0);
        assert_eq!(output[[1, 2]], 10.0);
        assert_eq!(output[[3, 2]], 10.0);
        assert_eq!(output[[2, 1]], 10.0);
        assert_eq!(output[[2, 3]], 10.0);
        assert_eq!(output[[1, 1]], 0.0);
        // Boundary columns are not part of the stencil's output
        assert_eq!(output[[2, 0]], 0.0);
        assert_eq!(output[[2, 4]], 0.0);
    }

    #[test]
    fn linear_fields_are_fixed_points() {
        // The discrete Laplacian of a linear temperature profile is zero
        let input = Array2::from_shape_fn((6, 6), |(i, j)| (i + 2 * j) as Precision);
        let mut output = input.clone();

        diffuse_rows(
            &Parameters::default(),
            input.view(),
            output.slice_mut(s![1..5, ..]),
            1..5,
        );

        assert_eq!(output, input);
    }
}
