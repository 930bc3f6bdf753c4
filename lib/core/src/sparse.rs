//! Compressed sparse matrices.
//!
//! Only what the relevance pipeline needs: CSR and CSC storage, thresholded
//! conversion from dense `ndarray` matrices, a sparse-sparse product and
//! coordinate (COO) output. Indices inside every row (CSR) or column (CSC)
//! are kept sorted, so positions always line up with the caller's row and
//! column order.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Compressed sparse row matrix.
///
/// Row `i` has its column indices at `indices[indptr[i]..indptr[i + 1]]`
/// with values parallel in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

/// Compressed sparse column matrix.
///
/// Column `j` has its row indices at `indices[indptr[j]..indptr[j + 1]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CscMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

/// Coordinate triples, row-major ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    data: Vec<f32>,
}

/// An entry survives sparsification when its magnitude reaches the threshold.
#[inline]
fn keep(value: f32, threshold: f32) -> bool {
    value != 0.0 && value.abs() >= threshold
}

fn check_compressed(
    layout: &str,
    major: usize,
    minor: usize,
    indptr: &[usize],
    indices: &[usize],
    data: &[f32],
) -> Result<()> {
    if indptr.len() != major + 1 {
        return Err(Error::MalformedMatrix(format!(
            "{} indptr has {} entries, expected {}",
            layout,
            indptr.len(),
            major + 1
        )));
    }
    if indices.len() != data.len() {
        return Err(Error::MalformedMatrix(format!(
            "{} has {} indices but {} values",
            layout,
            indices.len(),
            data.len()
        )));
    }
    if indptr[0] != 0 || indptr[major] != indices.len() {
        return Err(Error::MalformedMatrix(format!(
            "{} indptr must span 0..{}",
            layout,
            indices.len()
        )));
    }
    for (lane, bounds) in indptr.windows(2).enumerate() {
        if bounds[0] > bounds[1] || bounds[1] > indices.len() {
            return Err(Error::MalformedMatrix(format!(
                "{} indptr out of order at {}",
                layout, lane
            )));
        }
        let lane_indices = &indices[bounds[0]..bounds[1]];
        if lane_indices.iter().any(|&idx| idx >= minor) {
            return Err(Error::MalformedMatrix(format!(
                "{} index out of range in lane {} (bound {})",
                layout, lane, minor
            )));
        }
        if lane_indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::MalformedMatrix(format!(
                "{} indices in lane {} are not strictly increasing",
                layout, lane
            )));
        }
    }
    Ok(())
}

/// Compress a dense matrix along its rows (`by_rows`) or columns.
fn compress_dense(
    dense: ArrayView2<'_, f32>,
    threshold: f32,
    by_rows: bool,
) -> (Vec<usize>, Vec<usize>, Vec<f32>) {
    let (lanes, n_lanes) = if by_rows {
        (dense.rows(), dense.nrows())
    } else {
        (dense.columns(), dense.ncols())
    };
    let mut indptr = Vec::with_capacity(n_lanes + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();
    indptr.push(0);
    for lane in lanes {
        for (idx, &value) in lane.iter().enumerate() {
            if keep(value, threshold) {
                indices.push(idx);
                data.push(value);
            }
        }
        indptr.push(indices.len());
    }
    (indptr, indices, data)
}

/// Swap the compressed axis: CSR arrays become CSC arrays and vice versa.
/// Minor indices of the output come out sorted because majors are visited in order.
fn transpose_compressed(
    minor: usize,
    indptr: &[usize],
    indices: &[usize],
    data: &[f32],
) -> (Vec<usize>, Vec<usize>, Vec<f32>) {
    let mut counts = vec![0usize; minor + 1];
    for &idx in indices {
        counts[idx + 1] += 1;
    }
    for i in 0..minor {
        counts[i + 1] += counts[i];
    }
    let out_indptr = counts.clone();

    let mut next = counts;
    let mut out_indices = vec![0usize; indices.len()];
    let mut out_data = vec![0.0f32; data.len()];
    for (major, bounds) in indptr.windows(2).enumerate() {
        for pos in bounds[0]..bounds[1] {
            let slot = next[indices[pos]];
            out_indices[slot] = major;
            out_data[slot] = data[pos];
            next[indices[pos]] += 1;
        }
    }
    (out_indptr, out_indices, out_data)
}

impl CsrMatrix {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self> {
        let matrix = Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    #[must_use]
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from unordered `(row, col, value)` triples. Repeated coordinates are summed
    /// and entries that end up exactly zero are not stored.
    pub fn from_triplets<I>(n_rows: usize, n_cols: usize, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut triplets: Vec<(usize, usize, f32)> = triplets.into_iter().collect();
        if let Some(&(row, col, _)) = triplets
            .iter()
            .find(|(row, col, _)| *row >= n_rows || *col >= n_cols)
        {
            return Err(Error::MalformedMatrix(format!(
                "entry ({}, {}) outside a {}x{} matrix",
                row, col, n_rows, n_cols
            )));
        }
        triplets.sort_by_key(|&(row, col, _)| (row, col));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut data: Vec<f32> = Vec::with_capacity(triplets.len());
        let mut rows: Vec<usize> = Vec::with_capacity(triplets.len());

        for (row, col, value) in triplets {
            match (rows.last(), indices.last()) {
                (Some(&last_row), Some(&last_col)) if last_row == row && last_col == col => {
                    if let Some(last) = data.last_mut() {
                        *last += value;
                    }
                }
                _ => {
                    rows.push(row);
                    indices.push(col);
                    data.push(value);
                }
            }
        }

        let mut kept_indices = Vec::with_capacity(indices.len());
        let mut kept_data = Vec::with_capacity(data.len());
        for ((row, col), value) in rows.into_iter().zip(indices).zip(data) {
            if value != 0.0 {
                indptr[row + 1] += 1;
                kept_indices.push(col);
                kept_data.push(value);
            }
        }
        for i in 0..n_rows {
            indptr[i + 1] += indptr[i];
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices: kept_indices,
            data: kept_data,
        })
    }

    /// Sparsify a dense matrix, dropping entries with `|v| < threshold`.
    #[must_use]
    pub fn from_dense(dense: ArrayView2<'_, f32>, threshold: f32) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let (indptr, indices, data) = compress_dense(dense, threshold, true);
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_compressed(
            "CSR",
            self.n_rows,
            self.n_cols,
            &self.indptr,
            &self.indices,
            &self.data,
        )
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Column indices and values of one row
    #[inline]
    pub fn row(&self, row: usize) -> (&[usize], &[f32]) {
        let range = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[range.clone()], &self.data[range])
    }

    /// Stored entries as `(row, col, value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.n_rows).flat_map(move |row| {
            let (cols, values) = self.row(row);
            cols.iter()
                .zip(values.iter())
                .map(move |(&col, &value)| (row, col, value))
        })
    }

    #[must_use]
    pub fn to_csc(&self) -> CscMatrix {
        let (indptr, indices, data) =
            transpose_compressed(self.n_cols, &self.indptr, &self.indices, &self.data);
        CscMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }

    #[must_use]
    pub fn to_coo(&self) -> CooMatrix {
        let mut rows = Vec::with_capacity(self.nnz());
        let mut cols = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for (row, col, value) in self.iter() {
            rows.push(row);
            cols.push(col);
            data.push(value);
        }
        CooMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            rows,
            cols,
            data,
        }
    }

    #[must_use]
    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for (row, col, value) in self.iter() {
            dense[[row, col]] = value;
        }
        dense
    }

    /// Sparse product `self * rhs`.
    ///
    /// Row-by-row accumulation (Gustavson). The right-hand side is re-laid out
    /// by rows once, so cost is proportional to the multiplications actually
    /// performed rather than to `rows * cols` of the result. Sums that cancel
    /// to exactly zero are not stored.
    pub fn matmul_csc(&self, rhs: &CscMatrix) -> Result<CsrMatrix> {
        if self.n_cols != rhs.n_rows {
            return Err(Error::DimensionMismatch {
                context: "sparse product inner dimension",
                expected: self.n_cols,
                actual: rhs.n_rows,
            });
        }

        let rhs_rows = rhs.to_csr();
        let n_cols = rhs.n_cols;

        let mut sums = vec![0.0f32; n_cols];
        let mut seen = vec![false; n_cols];
        let mut touched: Vec<usize> = Vec::new();

        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for row in 0..self.n_rows {
            let (inner, weights) = self.row(row);
            for (&k, &a) in inner.iter().zip(weights) {
                let (cols, values) = rhs_rows.row(k);
                for (&col, &b) in cols.iter().zip(values) {
                    if !seen[col] {
                        seen[col] = true;
                        touched.push(col);
                    }
                    sums[col] += a * b;
                }
            }

            touched.sort_unstable();
            for &col in &touched {
                if sums[col] != 0.0 {
                    indices.push(col);
                    data.push(sums[col]);
                }
                sums[col] = 0.0;
                seen[col] = false;
            }
            touched.clear();
            indptr.push(indices.len());
        }

        Ok(CsrMatrix {
            n_rows: self.n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }
}

impl CscMatrix {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self> {
        let matrix = Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Sparsify a dense matrix column by column, dropping entries with `|v| < threshold`.
    #[must_use]
    pub fn from_dense(dense: ArrayView2<'_, f32>, threshold: f32) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let (indptr, indices, data) = compress_dense(dense, threshold, false);
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_compressed(
            "CSC",
            self.n_cols,
            self.n_rows,
            &self.indptr,
            &self.indices,
            &self.data,
        )
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Row indices and values of one column
    #[inline]
    pub fn column(&self, col: usize) -> (&[usize], &[f32]) {
        let range = self.indptr[col]..self.indptr[col + 1];
        (&self.indices[range.clone()], &self.data[range])
    }

    #[must_use]
    pub fn to_csr(&self) -> CsrMatrix {
        let (indptr, indices, data) =
            transpose_compressed(self.n_rows, &self.indptr, &self.indices, &self.data);
        CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }
}

impl CooMatrix {
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[inline]
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.data.iter())
            .map(|((&row, &col), &value)| (row, col, value))
    }
}
