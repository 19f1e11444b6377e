// src/mat/mod.rs

use crate::error::GradFlowError;
use num_traits::Float;
use std::fmt::Debug;
use std::iter::Sum;
use std::ops::AddAssign;

pub mod create;

pub use create::{full, ones, zeros};

/// Bound alias for the numeric element type of a [`Matrix`].
///
/// Everything the engine needs from a scalar: float arithmetic
/// (`num_traits::Float`), in-place accumulation, summation, and the
/// thread-safety bounds required by the concurrent handlers.
pub trait Element: Float + AddAssign + Sum + Send + Sync + Debug + 'static {}

impl<T> Element for T where T: Float + AddAssign + Sum + Send + Sync + Debug + 'static {}

/// A dense, row-major 2-D numeric array.
///
/// This is the value type cached on graph nodes and exchanged with
/// [`Function`](crate::ops::Function) implementations. It deliberately covers
/// only what the graph engine and its operator library consume: shape
/// introspection, element access, element-wise arithmetic, matrix product,
/// transpose, and reductions.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Creates a matrix from row-major data. Fails with
    /// [`GradFlowError::InvalidData`] if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, GradFlowError> {
        if data.len() != rows * cols {
            return Err(GradFlowError::InvalidData {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Creates a matrix from equally-long rows.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self, GradFlowError> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(GradFlowError::InvalidData {
                    len: row.len(),
                    rows: rows.len(),
                    cols,
                });
            }
            data.extend_from_slice(row);
        }
        Matrix::new(rows.len(), cols, data)
    }

    /// Creates a column vector (n x 1).
    pub fn vector(data: Vec<T>) -> Self {
        let rows = data.len();
        Matrix {
            rows,
            cols: 1,
            data,
        }
    }

    /// Creates a 1 x 1 matrix holding a single value.
    pub fn scalar(v: T) -> Self {
        Matrix {
            rows: 1,
            cols: 1,
            data: vec![v],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, v: T) {
        self.data[i * self.cols + j] = v;
    }

    /// Row-major view of the underlying storage.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The single element of a 1 x 1 matrix, or `None` otherwise.
    pub fn to_scalar(&self) -> Option<T> {
        if self.is_scalar() {
            Some(self.data[0])
        } else {
            None
        }
    }

    fn check_same_shape(&self, other: &Self, operation: &str) -> Result<(), GradFlowError> {
        if self.shape() != other.shape() {
            return Err(GradFlowError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Element-wise addition.
    pub fn add(&self, other: &Self) -> Result<Self, GradFlowError> {
        self.check_same_shape(other, "add")?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a + b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Element-wise subtraction.
    pub fn sub(&self, other: &Self) -> Result<Self, GradFlowError> {
        self.check_same_shape(other, "sub")?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Element-wise (Hadamard) product.
    pub fn mul(&self, other: &Self) -> Result<Self, GradFlowError> {
        self.check_same_shape(other, "mul")?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a * b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// In-place element-wise accumulation, shape-checked.
    /// This is the primitive gradient accumulation is built on.
    pub fn add_assign_checked(&mut self, other: &Self) -> Result<(), GradFlowError> {
        self.check_same_shape(other, "add_assign")?;
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, &b)| *a += b);
        Ok(())
    }

    /// Matrix product. `self` is m x k, `other` must be k x n.
    pub fn matmul(&self, other: &Self) -> Result<Self, GradFlowError> {
        if self.cols != other.rows {
            return Err(GradFlowError::ShapeMismatch {
                expected: (self.cols, other.cols),
                actual: other.shape(),
                operation: "matmul".to_string(),
            });
        }
        let (m, k, n) = (self.rows, self.cols, other.cols);
        let mut data = vec![T::zero(); m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                for j in 0..n {
                    data[i * n + j] += a * other.data[p * n + j];
                }
            }
        }
        Ok(Matrix {
            rows: m,
            cols: n,
            data,
        })
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.data[i * self.cols + j]);
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Multiplies every element by `k`.
    pub fn scale(&self, k: T) -> Self {
        self.map(|v| v * k)
    }

    /// Applies `f` element-wise, producing a new matrix of the same shape.
    pub fn map<F: Fn(T) -> T>(&self, f: F) -> Self {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> T {
        self.data.iter().copied().sum()
    }

    /// Reinterprets the storage under a new shape with the same element count.
    pub fn reshape(&self, rows: usize, cols: usize) -> Result<Self, GradFlowError> {
        if rows * cols != self.data.len() {
            return Err(GradFlowError::InvalidData {
                len: self.data.len(),
                rows,
                cols,
            });
        }
        Ok(Matrix {
            rows,
            cols,
            data: self.data.clone(),
        })
    }

    /// Row `i` as a 1 x cols matrix.
    pub fn row(&self, i: usize) -> Self {
        let start = i * self.cols;
        Matrix {
            rows: 1,
            cols: self.cols,
            data: self.data[start..start + self.cols].to_vec(),
        }
    }

    pub fn ones_like(&self) -> Self {
        ones(self.rows, self.cols)
    }

    pub fn zeros_like(&self) -> Self {
        zeros(self.rows, self.cols)
    }
}
