//! Fitted low-rank models.
//!
//! Training happens elsewhere; this module only describes what a fitted model
//! must offer the relevance projector, plus a truncated-SVD implementation
//! that can be loaded from its serialized components.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::sparse::{CscMatrix, CsrMatrix};
use crate::{Error, Result};

/// Reduces item-space rows to the latent space of a fitted model.
pub trait LatentTransform {
    /// Number of latent components
    fn n_components(&self) -> usize;

    /// Number of item columns the model was fitted on
    fn n_features(&self) -> usize;

    /// Project a batch of item-space rows, one latent row per input row.
    fn transform(&self, rows: &CsrMatrix) -> Result<Array2<f32>>;
}

/// A fitted model that can also map latent rows back into item space.
pub trait LowRankModel: LatentTransform {
    /// Dense reconstruction of latent rows. Only sensible for small batches.
    fn reconstruct(&self, latent: ArrayView2<'_, f32>) -> Result<Array2<f32>>;

    /// Give up the component basis, consuming the model.
    fn into_basis(self) -> ComponentBasis
    where
        Self: Sized;
}

/// Component basis of a fitted model: one row per latent component, one column per item.
///
/// Sparsification consumes the basis, so a caller that hands it over cannot
/// keep using the dense values afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentBasis {
    components: Array2<f32>,
}

impl ComponentBasis {
    #[inline]
    #[must_use]
    pub fn new(components: Array2<f32>) -> Self {
        Self { components }
    }

    #[inline]
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.components.ncols()
    }

    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.components.view()
    }

    /// Reject an empty basis or one holding NaN or infinite weights.
    pub fn validate(&self) -> Result<()> {
        if self.n_components() == 0 || self.n_items() == 0 {
            return Err(Error::Model(format!(
                "component basis must be non-empty, got {}x{}",
                self.n_components(),
                self.n_items()
            )));
        }
        if self.components.iter().any(|w| !w.is_finite()) {
            return Err(Error::Model(
                "component basis contains non-finite weights".to_string(),
            ));
        }
        Ok(())
    }

    /// Zero every weight with `|w| < threshold` in place and compress the
    /// result column by column.
    #[must_use]
    pub fn sparsify(mut self, threshold: f32) -> CscMatrix {
        self.components.mapv_inplace(|w| if w.abs() < threshold { 0.0 } else { w });
        CscMatrix::from_dense(self.components.view(), 0.0)
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Array2<f32> {
        self.components
    }
}

/// Truncated SVD as produced by the usual `fit` implementations.
///
/// `transform(M) = M * Cᵀ` and `reconstruct(X) = X * C`, where `C` holds the
/// right singular vectors as rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedSvd {
    components: ComponentBasis,
}

impl TruncatedSvd {
    pub fn new(components: Array2<f32>) -> Result<Self> {
        let model = Self {
            components: ComponentBasis::new(components),
        };
        model.validate()?;
        Ok(model)
    }

    /// Reject empty or non-finite components, e.g. after loading from disk.
    pub fn validate(&self) -> Result<()> {
        self.components.validate()
    }

    #[inline]
    pub fn components(&self) -> &ComponentBasis {
        &self.components
    }
}

impl LatentTransform for TruncatedSvd {
    fn n_components(&self) -> usize {
        self.components.n_components()
    }

    fn n_features(&self) -> usize {
        self.components.n_items()
    }

    fn transform(&self, rows: &CsrMatrix) -> Result<Array2<f32>> {
        if rows.n_cols() != self.n_features() {
            return Err(Error::DimensionMismatch {
                context: "model transform input columns",
                expected: self.n_features(),
                actual: rows.n_cols(),
            });
        }

        let basis = self.components.view();
        let mut latent = Array2::zeros((rows.n_rows(), self.n_components()));
        for (row, mut out) in latent.rows_mut().into_iter().enumerate() {
            let (items, values) = rows.row(row);
            for (&item, &value) in items.iter().zip(values) {
                out.scaled_add(value, &basis.column(item));
            }
        }
        Ok(latent)
    }
}

impl LowRankModel for TruncatedSvd {
    fn reconstruct(&self, latent: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        if latent.ncols() != self.n_components() {
            return Err(Error::DimensionMismatch {
                context: "model reconstruct input columns",
                expected: self.n_components(),
                actual: latent.ncols(),
            });
        }
        Ok(latent.dot(&self.components.view()))
    }

    fn into_basis(self) -> ComponentBasis {
        self.components
    }
}
