//! Row-major matrices and the vector type used throughout the scene graph.
//!
//! Vectors are plain [`glam::Vec3`] values: every operation returns a new
//! value, so a vector handed to an entity can never be mutated behind its
//! back. Matrices keep an explicit shape so that 3x3 normal matrices and 4x4
//! affine transforms share one type, mirroring how they are uploaded.

use std::fmt;

use glam::{Mat4, Vec3};
use thiserror::Error;

/// Three component vector used for positions, rotations, scales and colours.
pub type Vector = Vec3;

/// Errors raised by matrix operations that are undefined for their inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    #[error("matrix dimensions must agree ({lhs_rows}x{lhs_cols} vs {rhs_rows}x{rhs_cols})")]
    DimensionMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },
    #[error("operation is only defined for {expected} matrices, got {rows}x{cols}")]
    UnsupportedShape {
        expected: &'static str,
        rows: usize,
        cols: usize,
    },
    #[error("array of {0} elements is not a square matrix")]
    NotSquare(usize),
    #[error("matrix is singular and cannot be inverted")]
    Singular,
}

/// Dense row-major matrix of `f32`.
///
/// Square matrices start out as the identity, anything else as zeros.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut data = vec![0.0; rows * cols];
        if rows == cols {
            for i in 0..rows {
                data[i * cols + i] = 1.0;
            }
        }
        Self { rows, cols, data }
    }

    /// 4x4 identity.
    pub fn identity() -> Self {
        Self::new(4, 4)
    }

    /// Builds a square matrix from `size * size` row-major values.
    pub fn square_from_slice(values: &[f32]) -> Result<Self, MathError> {
        let size = (values.len() as f64).sqrt() as usize;
        if size * size != values.len() {
            return Err(MathError::NotSquare(values.len()));
        }
        Ok(Self {
            rows: size,
            cols: size,
            data: values.to_vec(),
        })
    }

    /// 4x4 matrix from sixteen row-major values.
    pub fn from_rows(values: [f32; 16]) -> Self {
        Self {
            rows: 4,
            cols: 4,
            data: values.to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major element storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix, MathError> {
        if self.cols != rhs.rows {
            return Err(self.mismatch(rhs));
        }
        let mut result = Matrix {
            rows: self.rows,
            cols: rhs.cols,
            data: vec![0.0; self.rows * rhs.cols],
        };
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[i * self.cols + k] * rhs.data[k * rhs.cols + j];
                }
                result.data[i * rhs.cols + j] = sum;
            }
        }
        Ok(result)
    }

    /// Product of two 4x4 affine transforms built inside the crate. Use
    /// [`mul`](Self::mul) for matrices of unknown shape.
    pub(crate) fn compose(&self, rhs: &Matrix) -> Matrix {
        debug_assert!(self.is_4x4() && rhs.is_4x4());
        let mut data = vec![0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                data[i * 4 + j] = (0..4).map(|k| self.data[i * 4 + k] * rhs.data[k * 4 + j]).sum();
            }
        }
        Matrix {
            rows: 4,
            cols: 4,
            data,
        }
    }

    /// Applies the upper 3x4 block of a 4x4 matrix to a point (w = 1).
    pub fn transform_point(&self, point: Vector) -> Result<Vector, MathError> {
        self.require_4x4()?;
        let m = &self.data;
        Ok(Vector::new(
            m[0] * point.x + m[1] * point.y + m[2] * point.z + m[3],
            m[4] * point.x + m[5] * point.y + m[6] * point.z + m[7],
            m[8] * point.x + m[9] * point.y + m[10] * point.z + m[11],
        ))
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix, MathError> {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            return Err(self.mismatch(rhs));
        }
        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(a, b)| a + b)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Inverts a 4x4 matrix by cofactor expansion.
    pub fn invert(&self) -> Result<Matrix, MathError> {
        self.require_4x4()?;
        let m = &self.data;
        let mut r = [0.0f32; 16];

        r[0] = m[5] * m[10] * m[15] - m[5] * m[14] * m[11] - m[6] * m[9] * m[15]
            + m[6] * m[13] * m[11]
            + m[7] * m[9] * m[14]
            - m[7] * m[13] * m[10];
        r[1] = -m[1] * m[10] * m[15] + m[1] * m[14] * m[11] + m[2] * m[9] * m[15]
            - m[2] * m[13] * m[11]
            - m[3] * m[9] * m[14]
            + m[3] * m[13] * m[10];
        r[2] = m[1] * m[6] * m[15] - m[1] * m[14] * m[7] - m[2] * m[5] * m[15]
            + m[2] * m[13] * m[7]
            + m[3] * m[5] * m[14]
            - m[3] * m[13] * m[6];
        r[3] = -m[1] * m[6] * m[11] + m[1] * m[10] * m[7] + m[2] * m[5] * m[11]
            - m[2] * m[9] * m[7]
            - m[3] * m[5] * m[10]
            + m[3] * m[9] * m[6];

        r[4] = -m[4] * m[10] * m[15] + m[4] * m[14] * m[11] + m[6] * m[8] * m[15]
            - m[6] * m[12] * m[11]
            - m[7] * m[8] * m[14]
            + m[7] * m[12] * m[10];
        r[5] = m[0] * m[10] * m[15] - m[0] * m[14] * m[11] - m[2] * m[8] * m[15]
            + m[2] * m[12] * m[11]
            + m[3] * m[8] * m[14]
            - m[3] * m[12] * m[10];
        r[6] = -m[0] * m[6] * m[15] + m[0] * m[14] * m[7] + m[2] * m[4] * m[15]
            - m[2] * m[12] * m[7]
            - m[3] * m[4] * m[14]
            + m[3] * m[12] * m[6];
        r[7] = m[0] * m[6] * m[11] - m[0] * m[10] * m[7] - m[2] * m[4] * m[11]
            + m[2] * m[8] * m[7]
            + m[3] * m[4] * m[10]
            - m[3] * m[8] * m[6];

        r[8] = m[4] * m[9] * m[15] - m[4] * m[13] * m[11] - m[5] * m[8] * m[15]
            + m[5] * m[12] * m[11]
            + m[7] * m[8] * m[13]
            - m[7] * m[12] * m[9];
        r[9] = -m[0] * m[9] * m[15] + m[0] * m[13] * m[11] + m[1] * m[8] * m[15]
            - m[1] * m[12] * m[11]
            - m[3] * m[8] * m[13]
            + m[3] * m[12] * m[9];
        r[10] = m[0] * m[5] * m[15] - m[0] * m[13] * m[7] - m[1] * m[4] * m[15]
            + m[1] * m[12] * m[7]
            + m[3] * m[4] * m[13]
            - m[3] * m[12] * m[5];
        r[11] = -m[0] * m[5] * m[11] + m[0] * m[9] * m[7] + m[1] * m[4] * m[11]
            - m[1] * m[8] * m[7]
            - m[3] * m[4] * m[9]
            + m[3] * m[8] * m[5];

        r[12] = -m[4] * m[9] * m[14] + m[4] * m[13] * m[10] + m[5] * m[8] * m[14]
            - m[5] * m[12] * m[10]
            - m[6] * m[8] * m[13]
            + m[6] * m[12] * m[9];
        r[13] = m[0] * m[9] * m[14] - m[0] * m[13] * m[10] - m[1] * m[8] * m[14]
            + m[1] * m[12] * m[10]
            + m[2] * m[8] * m[13]
            - m[2] * m[12] * m[9];
        r[14] = -m[0] * m[5] * m[14] + m[0] * m[13] * m[6] + m[1] * m[4] * m[14]
            - m[1] * m[12] * m[6]
            - m[2] * m[4] * m[13]
            + m[2] * m[12] * m[5];
        r[15] = m[0] * m[5] * m[10] - m[0] * m[9] * m[6] - m[1] * m[4] * m[10]
            + m[1] * m[8] * m[6]
            + m[2] * m[4] * m[9]
            - m[2] * m[8] * m[5];

        let det = m[0] * r[0] + m[1] * r[4] + m[2] * r[8] + m[3] * r[12];
        if det == 0.0 || !det.is_finite() {
            return Err(MathError::Singular);
        }
        for value in &mut r {
            *value /= det;
        }

        Ok(Matrix {
            rows: 4,
            cols: 4,
            data: r.to_vec(),
        })
    }

    /// Transpose of the upper-left 3x3 block of a 4x4 matrix.
    pub fn transpose3x3(&self) -> Result<Matrix, MathError> {
        self.require_4x4()?;
        let m = &self.data;
        Ok(Matrix {
            rows: 3,
            cols: 3,
            data: vec![m[0], m[4], m[8], m[1], m[5], m[9], m[2], m[6], m[10]],
        })
    }

    /// Normal matrix: `transpose(inverse(self))`, upper-left 3x3.
    pub fn normal_matrix(&self) -> Result<Matrix, MathError> {
        self.invert()?.transpose3x3()
    }

    pub fn translate(v: Vector) -> Self {
        let mut result = Self::identity();
        result.data[3] = v.x;
        result.data[7] = v.y;
        result.data[11] = v.z;
        result
    }

    pub fn scale(v: Vector) -> Self {
        let mut result = Self::identity();
        result.data[0] = v.x;
        result.data[5] = v.y;
        result.data[10] = v.z;
        result
    }

    pub fn rotate_x(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut result = Self::identity();
        result.data[5] = cos;
        result.data[6] = sin;
        result.data[9] = -sin;
        result.data[10] = cos;
        result
    }

    pub fn rotate_y(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut result = Self::identity();
        result.data[0] = cos;
        result.data[2] = -sin;
        result.data[8] = sin;
        result.data[10] = cos;
        result
    }

    pub fn rotate_z(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut result = Self::identity();
        result.data[0] = cos;
        result.data[1] = sin;
        result.data[4] = -sin;
        result.data[5] = cos;
        result
    }

    /// Converts a 4x4 matrix to glam's column-major representation.
    pub fn to_mat4(&self) -> Result<Mat4, MathError> {
        self.require_4x4()?;
        let mut values = [0.0; 16];
        values.copy_from_slice(&self.data);
        Ok(Mat4::from_cols_array(&values).transpose())
    }

    pub fn from_mat4(matrix: Mat4) -> Self {
        Self {
            rows: 4,
            cols: 4,
            data: matrix.transpose().to_cols_array().to_vec(),
        }
    }

    fn is_4x4(&self) -> bool {
        self.rows == 4 && self.cols == 4
    }

    fn require_4x4(&self) -> Result<(), MathError> {
        if self.is_4x4() {
            Ok(())
        } else {
            Err(MathError::UnsupportedShape {
                expected: "4x4",
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    fn mismatch(&self, rhs: &Matrix) -> MathError {
        MathError::DimensionMismatch {
            lhs_rows: self.rows,
            lhs_cols: self.cols,
            rhs_rows: rhs.rows,
            rhs_cols: rhs.cols,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{} [", self.rows, self.cols)?;
        for row in self.data.chunks(self.cols.max(1)) {
            writeln!(f, "  {row:?}")?;
        }
        write!(f, "]")
    }
}
