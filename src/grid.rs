//! Projection of the 60 canonical channels onto the 8×8 MEA footprint.
//!
//! The array is an 8×8 grid without its four corners.  Canonical index `i`
//! occupies the `i`-th cell in row-major order over the populated cells:
//!
//! ```text
//!      col 0  1  2  3  4  5  6  7
//! row 0    ·  0  1  2  3  4  5  ·
//! row 1    6  7  8  9 10 11 12 13
//!   …                …
//! row 6   46 47 48 49 50 51 52 53
//! row 7    · 54 55 56 57 58 59  ·
//! ```
//!
//! Corner cells are NaN in every projection.
use ndarray::{Array1, Array2, Array3, Axis};

use crate::error::{MeaError, Result};
use crate::N_CHANNELS;

/// Side length of the electrode grid.
pub const GRID_SIDE: usize = 8;

/// Whether `(row, col)` is one of the four absent corner positions.
pub fn is_corner(row: usize, col: usize) -> bool {
    (row == 0 || row == GRID_SIDE - 1) && (col == 0 || col == GRID_SIDE - 1)
}

/// `(row, col)` of every canonical index, in enumeration order.
pub fn grid_positions() -> impl Iterator<Item = (usize, usize)> {
    (0..GRID_SIDE)
        .flat_map(|r| (0..GRID_SIDE).map(move |c| (r, c)))
        .filter(|&(r, c)| !is_corner(r, c))
}

/// Grid cell of canonical channel `index`, or `None` past the last channel.
pub fn position_of(index: usize) -> Option<(usize, usize)> {
    grid_positions().nth(index)
}

/// Lay 60 per-channel values out on the 8×8 grid.
pub fn project(values: &[f64]) -> Result<Array2<f64>> {
    if values.len() != N_CHANNELS {
        return Err(MeaError::shape("grid projection input", N_CHANNELS, values.len()));
    }
    let mut grid = Array2::from_elem((GRID_SIDE, GRID_SIDE), f64::NAN);
    for ((r, c), &v) in grid_positions().zip(values.iter()) {
        grid[[r, c]] = v;
    }
    Ok(grid)
}

/// Read a projected grid back into canonical order.
pub fn unproject(grid: &Array2<f64>) -> Result<Array1<f64>> {
    if grid.dim() != (GRID_SIDE, GRID_SIDE) {
        return Err(MeaError::shape("grid cells", GRID_SIDE * GRID_SIDE, grid.len()));
    }
    Ok(grid_positions().map(|(r, c)| grid[[r, c]]).collect())
}

/// Project every column of a `[60, B]` matrix: `[B, 8, 8]`.
///
/// Used for bucket-by-bucket heatmap frames.
pub fn project_columns(matrix: &Array2<f64>) -> Result<Array3<f64>> {
    if matrix.nrows() != N_CHANNELS {
        return Err(MeaError::shape("grid projection rows", N_CHANNELS, matrix.nrows()));
    }
    let n_frames = matrix.ncols();
    let mut frames = Array3::from_elem((n_frames, GRID_SIDE, GRID_SIDE), f64::NAN);
    for (mut frame, column) in frames.axis_iter_mut(Axis(0)).zip(matrix.columns()) {
        for ((r, c), &v) in grid_positions().zip(column.iter()) {
            frame[[r, c]] = v;
        }
    }
    Ok(frames)
}

/// Project channel labels (e.g. `channel_info` ids); corners are `None`.
pub fn project_labels(labels: &[u32]) -> Result<Array2<Option<u32>>> {
    if labels.len() != N_CHANNELS {
        return Err(MeaError::shape("grid label input", N_CHANNELS, labels.len()));
    }
    let mut grid = Array2::from_elem((GRID_SIDE, GRID_SIDE), None);
    for ((r, c), &id) in grid_positions().zip(labels.iter()) {
        grid[[r, c]] = Some(id);
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_positions_without_corners() {
        let pos: Vec<_> = grid_positions().collect();
        assert_eq!(pos.len(), N_CHANNELS);
        assert_eq!(pos[0], (0, 1));
        assert_eq!(pos[5], (0, 6));
        assert_eq!(pos[6], (1, 0));
        assert_eq!(pos[13], (1, 7));
        assert_eq!(pos[54], (7, 1));
        assert_eq!(pos[59], (7, 6));
        assert_eq!(position_of(60), None);
    }

    #[test]
    fn corners_are_nan() {
        let values: Vec<f64> = (0..60).map(f64::from).collect();
        let g = project(&values).unwrap();
        for (r, c) in [(0, 0), (0, 7), (7, 0), (7, 7)] {
            assert!(g[[r, c]].is_nan());
        }
        assert_eq!(g[[2, 0]], 14.0);
    }

    #[test]
    fn projection_round_trips() {
        let values: Vec<f64> = (0..60).map(f64::from).collect();
        let back = unproject(&project(&values).unwrap()).unwrap();
        assert_eq!(back.to_vec(), values);
    }

    #[test]
    fn wrong_length_rejected() {
        let err = project(&[0.0; 59]).unwrap_err();
        assert_eq!(err, MeaError::Shape { what: "grid projection input", expected: 60, actual: 59 });
    }

    #[test]
    fn columns_become_frames() {
        let m = Array2::from_shape_fn((60, 3), |(c, b)| (c * 10 + b) as f64);
        let frames = project_columns(&m).unwrap();
        assert_eq!(frames.dim(), (3, 8, 8));
        assert_eq!(frames[[2, 0, 1]], 2.0);
        assert_eq!(frames[[1, 7, 6]], 591.0);
        assert!(frames[[0, 7, 7]].is_nan());
    }

    #[test]
    fn labels_projected() {
        let labels: Vec<u32> = (100..160).collect();
        let g = project_labels(&labels).unwrap();
        assert_eq!(g[[0, 0]], None);
        assert_eq!(g[[0, 1]], Some(100));
    }
}
