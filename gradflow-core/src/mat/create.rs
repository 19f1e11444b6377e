// src/mat/create.rs
//
// Creation routines for `Matrix`. Random initialization follows the
// generic-over-distribution pattern: `rand` for uniform sampling and
// `rand_distr::StandardNormal` for `randn`.

use super::{Element, Matrix};
use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Creates a matrix filled with zeros.
pub fn zeros<T: Element>(rows: usize, cols: usize) -> Matrix<T> {
    full(rows, cols, T::zero())
}

/// Creates a matrix filled with ones.
pub fn ones<T: Element>(rows: usize, cols: usize) -> Matrix<T> {
    full(rows, cols, T::one())
}

/// Creates a matrix filled with `value`.
pub fn full<T: Element>(rows: usize, cols: usize, value: T) -> Matrix<T> {
    // Shape is trusted here; only the data-length invariant can fail and it
    // holds by construction.
    Matrix {
        rows,
        cols,
        data: vec![value; rows * cols],
    }
}

/// Creates a matrix with elements drawn uniformly from `[low, high)`.
pub fn rand<T>(rows: usize, cols: usize, low: T, high: T) -> Matrix<T>
where
    T: Element + SampleUniform,
{
    let mut rng = rand::thread_rng();
    let data = (0..rows * cols).map(|_| rng.gen_range(low..high)).collect();
    Matrix { rows, cols, data }
}

/// Creates a matrix with elements drawn from the standard normal distribution.
pub fn randn<T>(rows: usize, cols: usize) -> Matrix<T>
where
    T: Element,
    StandardNormal: Distribution<T>,
{
    let mut rng = rand::thread_rng();
    let data = (0..rows * cols)
        .map(|_| StandardNormal.sample(&mut rng))
        .collect();
    Matrix { rows, cols, data }
}
