#[cfg(test)]
#[path = "../../../tests/unit/models/common/matrix_test.rs"]
mod matrix_test;

use rosomaxa::utils::{GenericError, GenericResult};

/// An immutable dense two dimensional table of measures stored in row-major order.
#[derive(Clone, Debug)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Creates a new square matrix of the given side filled with default values.
    pub fn new(side: usize) -> Self {
        Self { rows: side, cols: side, data: vec![T::default(); side * side] }
    }

    /// Creates a matrix from the given row-major data.
    pub fn from_data(rows: usize, cols: usize, data: Vec<T>) -> GenericResult<Self> {
        if data.len() != rows * cols {
            return Err(GenericError::from(format!(
                "matrix data size mismatch: expected {} elements, got {}",
                rows * cols,
                data.len()
            )));
        }

        Ok(Self { rows, cols, data })
    }

    /// Returns the value at the given row and column.
    pub fn at(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    /// Sets the value at the given row and column.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// Returns the amount of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the amount of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Checks whether the matrix is square with the given side.
    pub fn is_square_of(&self, side: usize) -> bool {
        self.rows == side && self.cols == side
    }
}
