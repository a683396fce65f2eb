//! Small preprocessing utilities shared by calculators and models.
//!
//! Provides a simple Scaler for per-column mean/std statistics. LIME uses it
//! to calibrate perturbation widths and to standardize perturbation offsets.

use ndarray::{Array2, ArrayView1, Axis};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Columns with a smaller std are treated as constant.
    pub const MIN_STD: f64 = 1e-12;

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// True when column `c` carries no spread.
    pub fn is_constant(&self, c: usize) -> bool {
        self.std[c] <= Self::MIN_STD
    }

    /// Offset `z - origin` divided by the column std; constant columns map to 0.
    pub fn scaled_offset(&self, z: ArrayView1<f64>, origin: ArrayView1<f64>) -> Vec<f64> {
        (0..self.n_features())
            .map(|c| {
                if self.is_constant(c) {
                    0.0
                } else {
                    (z[c] - origin[c]) / self.std[c]
                }
            })
            .collect()
    }
}

/// Fit a `Scaler` from an `Array2<f64>` where rows are samples and
/// columns are features. Population std (divide by n), as in scikit-learn.
///
/// An empty matrix yields zero means and zero stds.
pub fn fit_scaler(x: &Array2<f64>) -> Scaler {
    let ncols = x.ncols();
    if x.nrows() == 0 {
        return Scaler {
            mean: vec![0.0; ncols],
            std: vec![0.0; ncols],
        };
    }
    let mean = x
        .mean_axis(Axis(0))
        .map(|m| m.to_vec())
        .unwrap_or_else(|| vec![0.0; ncols]);
    let std = x.std_axis(Axis(0), 0.0).to_vec();
    Scaler { mean, std }
}
