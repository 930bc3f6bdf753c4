//! Relevance projection.
//!
//! Projects the user x story interaction matrix through a fitted low-rank
//! model and back into story space. The dense reconstruction `T(M) * C`
//! has `users * stories` entries, so both factors are sparsified first and
//! only their sparse product is materialised.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::comment::StoryId;
use crate::matrix::IndexedSparseMatrix;
use crate::model::{ComponentBasis, LatentTransform, LowRankModel};
use crate::sparse::CsrMatrix;
use crate::{Error, Result};

/// Latent weights below this magnitude do not take part in any score.
pub const DEFAULT_LATENT_THRESHOLD: f32 = 1.0;
/// Component weights below this magnitude do not contribute to any story.
pub const DEFAULT_BASIS_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    pub latent_threshold: f32,
    pub basis_threshold: f32,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            latent_threshold: DEFAULT_LATENT_THRESHOLD,
            basis_threshold: DEFAULT_BASIS_THRESHOLD,
        }
    }
}

impl ProjectorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("latent_threshold", self.latent_threshold),
            ("basis_threshold", self.basis_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// One reconstructed (user, story) score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceRecord {
    pub user_id: String,
    pub story_id: StoryId,
    pub relevance: f32,
}

/// Output of a projection run with the sizes of the intermediate sparse factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub records: Vec<RelevanceRecord>,
    pub latent_nnz: usize,
    pub basis_nnz: usize,
}

impl Projection {
    #[inline]
    #[must_use]
    pub fn into_records(self) -> Vec<RelevanceRecord> {
        self.records
    }
}

pub struct RelevanceProjector {
    config: ProjectorConfig,
}

impl RelevanceProjector {
    pub fn new(config: ProjectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Score every user against every story through `transform` and `basis`.
    ///
    /// The basis is taken by value: it is thresholded in place and dropped
    /// once its sparse form exists.
    pub fn project<T>(
        &self,
        transform: &T,
        basis: ComponentBasis,
        interactions: &IndexedSparseMatrix,
    ) -> Result<Projection>
    where
        T: LatentTransform + ?Sized,
    {
        interactions.validate()?;
        let latent = transform.transform(&interactions.matrix)?;
        self.project_latent(latent, basis, interactions)
    }

    /// Same as [`project`](Self::project) for a model that owns its basis.
    pub fn project_model<M: LowRankModel>(
        &self,
        model: M,
        interactions: &IndexedSparseMatrix,
    ) -> Result<Projection> {
        interactions.validate()?;
        let latent = model.transform(&interactions.matrix)?;
        self.project_latent(latent, model.into_basis(), interactions)
    }

    fn project_latent(
        &self,
        latent: Array2<f32>,
        basis: ComponentBasis,
        interactions: &IndexedSparseMatrix,
    ) -> Result<Projection> {
        let expected = (interactions.n_users(), basis.n_components());
        if latent.dim() != expected {
            return Err(Error::ShapeMismatch {
                context: "latent representation",
                expected,
                actual: latent.dim(),
            });
        }
        if basis.n_items() != interactions.n_stories() {
            return Err(Error::DimensionMismatch {
                context: "component basis items",
                expected: interactions.n_stories(),
                actual: basis.n_items(),
            });
        }
        if latent.iter().any(|x| !x.is_finite()) {
            return Err(Error::Model(
                "latent representation contains non-finite values".to_string(),
            ));
        }
        basis.validate()?;

        let sparse_latent = CsrMatrix::from_dense(latent.view(), self.config.latent_threshold);
        drop(latent);
        info!(
            "Sparse latent matrix: shape {:?}, {} non-zero",
            sparse_latent.shape(),
            sparse_latent.nnz()
        );

        let sparse_basis = basis.sparsify(self.config.basis_threshold);
        info!(
            "Sparse component basis: shape {:?}, {} non-zero",
            sparse_basis.shape(),
            sparse_basis.nnz()
        );

        let reconstructed = sparse_latent.matmul_csc(&sparse_basis)?;

        // Positions map straight onto the id indices below
        let index_shape = (interactions.row_index.len(), interactions.col_index.len());
        if reconstructed.shape() != index_shape {
            return Err(Error::ShapeMismatch {
                context: "reconstructed relevance matrix",
                expected: index_shape,
                actual: reconstructed.shape(),
            });
        }

        let coo = reconstructed.to_coo();
        let records: Vec<RelevanceRecord> = coo
            .iter()
            .map(|(row, col, relevance)| RelevanceRecord {
                user_id: interactions.row_index[row].clone(),
                story_id: interactions.col_index[col],
                relevance,
            })
            .collect();
        info!("Recommendations: {}", records.len());
        debug!(
            "Reconstruction density: {:.6}",
            records.len() as f64 / (index_shape.0.max(1) * index_shape.1.max(1)) as f64
        );

        Ok(Projection {
            records,
            latent_nnz: sparse_latent.nnz(),
            basis_nnz: sparse_basis.nnz(),
        })
    }

    /// Dense, unthresholded reconstruction `T(M) * C`.
    ///
    /// Materialises `users * stories` values; meant for checking the sparse
    /// approximation on small matrices.
    pub fn exact_reconstruction<M: LowRankModel>(
        model: &M,
        interactions: &IndexedSparseMatrix,
    ) -> Result<Array2<f32>> {
        interactions.validate()?;
        let latent = model.transform(&interactions.matrix)?;
        model.reconstruct(latent.view())
    }
}

impl Default for RelevanceProjector {
    fn default() -> Self {
        Self {
            config: ProjectorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TruncatedSvd;
    use ndarray::array;

    /// Transform that hands back a fixed latent matrix.
    struct FixedLatent(Array2<f32>);

    impl LatentTransform for FixedLatent {
        fn n_components(&self) -> usize {
            self.0.ncols()
        }

        fn n_features(&self) -> usize {
            0
        }

        fn transform(&self, _rows: &CsrMatrix) -> Result<Array2<f32>> {
            Ok(self.0.clone())
        }
    }

    fn two_by_two() -> IndexedSparseMatrix {
        let matrix =
            CsrMatrix::from_triplets(2, 2, vec![(0, 0, 2.0), (1, 1, 3.0)]).unwrap();
        IndexedSparseMatrix::new(
            matrix,
            vec!["alice".to_string(), "bob".to_string()],
            vec![10, 20],
        )
        .unwrap()
    }

    fn by_key(mut records: Vec<RelevanceRecord>) -> Vec<RelevanceRecord> {
        records.sort_by(|a, b| (&a.user_id, a.story_id).cmp(&(&b.user_id, b.story_id)));
        records
    }

    #[test]
    fn test_identity_model_maps_positions_to_ids() {
        let model = TruncatedSvd::new(array![[1.0f32, 0.0], [0.0, 1.0]]).unwrap();
        let projection = RelevanceProjector::default()
            .project_model(model, &two_by_two())
            .unwrap();

        assert_eq!(
            by_key(projection.records),
            vec![
                RelevanceRecord {
                    user_id: "alice".to_string(),
                    story_id: 10,
                    relevance: 2.0
                },
                RelevanceRecord {
                    user_id: "bob".to_string(),
                    story_id: 20,
                    relevance: 3.0
                },
            ]
        );
        assert_eq!(projection.latent_nnz, 2);
        assert_eq!(projection.basis_nnz, 2);
    }

    #[test]
    fn test_latent_threshold_prunes_users() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[0.9f32, 0.0], [0.0, 1.5]]);
        let basis = ComponentBasis::new(array![[1.0f32, 1.0], [0.5, 0.5]]);

        let projection = RelevanceProjector::default()
            .project(&transform, basis, &interactions)
            .unwrap();

        assert_eq!(projection.records.len(), 2);
        assert!(projection.records.iter().all(|r| r.user_id == "bob"));
        assert!(projection
            .records
            .iter()
            .all(|r| (r.relevance - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_basis_threshold_prunes_stories() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[2.0f32], [1.0]]);
        let basis = ComponentBasis::new(array![[0.005f32, 0.4]]);

        let projection = RelevanceProjector::default()
            .project(&transform, basis, &interactions)
            .unwrap();

        assert_eq!(projection.basis_nnz, 1);
        assert!(projection.records.iter().all(|r| r.story_id == 20));
        assert_eq!(projection.records.len(), 2);
    }

    #[test]
    fn test_zero_thresholds_match_exact_reconstruction() {
        let components = array![[0.6f32, 0.8, 0.0], [0.0, 0.6, -0.8]];
        let model = TruncatedSvd::new(components).unwrap();
        let matrix = CsrMatrix::from_triplets(
            3,
            3,
            vec![(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0), (2, 2, 1.0)],
        )
        .unwrap();
        let interactions = IndexedSparseMatrix::new(
            matrix,
            vec!["u1".into(), "u2".into(), "u3".into()],
            vec![1, 2, 3],
        )
        .unwrap();

        let exact = RelevanceProjector::exact_reconstruction(&model, &interactions).unwrap();
        let projector = RelevanceProjector::new(ProjectorConfig {
            latent_threshold: 0.0,
            basis_threshold: 0.0,
        })
        .unwrap();
        let projection = projector.project_model(model, &interactions).unwrap();

        let expected_nnz = exact.iter().filter(|v| v.abs() > 1e-6).count();
        assert_eq!(projection.records.len(), expected_nnz);
        for record in &projection.records {
            let row = interactions
                .row_index
                .iter()
                .position(|u| *u == record.user_id)
                .unwrap();
            let col = interactions
                .col_index
                .iter()
                .position(|s| *s == record.story_id)
                .unwrap();
            assert!((exact[[row, col]] - record.relevance).abs() < 1e-5);
        }
    }

    #[test]
    fn test_latent_shape_mismatch() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[1.0f32, 1.0]]);
        let basis = ComponentBasis::new(array![[1.0f32, 1.0], [1.0, 1.0]]);

        let err = RelevanceProjector::default()
            .project(&transform, basis, &interactions)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_basis_width_mismatch() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[1.0f32], [1.0]]);
        let basis = ComponentBasis::new(array![[1.0f32, 1.0, 1.0]]);

        let err = RelevanceProjector::default()
            .project(&transform, basis, &interactions)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_non_finite_latent_rejected() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[f32::INFINITY], [1.0]]);
        let basis = ComponentBasis::new(array![[1.0f32, 1.0]]);

        assert!(matches!(
            RelevanceProjector::default().project(&transform, basis, &interactions),
            Err(Error::Model(_))
        ));
    }

    #[test]
    fn test_non_finite_basis_rejected() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[1.0f32], [-1.0]]);
        let basis = ComponentBasis::new(array![[0.01f32, f32::NAN]]);

        assert!(matches!(
            RelevanceProjector::default().project(&transform, basis, &interactions),
            Err(Error::Model(_))
        ));
    }

    #[test]
    fn test_boundary_values_are_kept() {
        let interactions = two_by_two();
        let transform = FixedLatent(array![[1.0f32], [-1.0]]);
        let basis = ComponentBasis::new(array![[0.01f32, 0.005]]);

        let projector = RelevanceProjector::new(ProjectorConfig::default()).unwrap();
        assert_eq!(projector.config(), &ProjectorConfig::default());
        let projection = projector.project(&transform, basis, &interactions).unwrap();

        assert_eq!(projection.latent_nnz, 2);
        assert_eq!(projection.basis_nnz, 1);
        assert_eq!(
            by_key(projection.records),
            vec![
                RelevanceRecord {
                    user_id: "alice".to_string(),
                    story_id: 10,
                    relevance: 0.01
                },
                RelevanceRecord {
                    user_id: "bob".to_string(),
                    story_id: 10,
                    relevance: -0.01
                },
            ]
        );
    }

    #[test]
    fn test_invalid_thresholds() {
        for config in [
            ProjectorConfig {
                latent_threshold: -1.0,
                basis_threshold: 0.01,
            },
            ProjectorConfig {
                latent_threshold: 1.0,
                basis_threshold: f32::NAN,
            },
        ] {
            assert!(RelevanceProjector::new(config).is_err());
        }
    }
}
