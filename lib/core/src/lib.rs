//! # storyrank Core
//!
//! Core library for storyrank.
//!
//! This crate provides the two batch transforms of the pipeline and the
//! pieces they are built from:
//!
//! - [`TreeResolver`] - attributes every comment to the story at the root of its thread
//! - [`RelevanceProjector`] - scores users against stories through a fitted low-rank model
//! - [`CsrMatrix`] / [`CscMatrix`] - compressed sparse storage and the sparse product
//! - [`LatentTransform`] / [`LowRankModel`] - the seam a fitted model plugs into
//! - [`InteractionMatrixBuilder`] - user x story matrix from resolved comments
//!
//! ## Example
//!
//! ```rust
//! use storyrank_core::{
//!     Comment, InteractionMatrixBuilder, RelevanceProjector, Story, TreeResolver, TruncatedSvd,
//! };
//! use ndarray::array;
//!
//! let stories = vec![Story::new(100), Story::new(200)];
//! let comments = vec![
//!     Comment::new(1, "alice", 100),
//!     Comment::new(2, "bob", 1),
//!     Comment::new(3, "bob", 200),
//! ];
//!
//! let resolution = TreeResolver::default().resolve(&stories, &comments);
//! assert_eq!(resolution.records.len(), 3);
//!
//! let mut builder = InteractionMatrixBuilder::new();
//! builder.extend(&resolution.records);
//! let interactions = builder.build().unwrap();
//!
//! let model = TruncatedSvd::new(array![[1.0f32, 1.0]]).unwrap();
//! let projection = RelevanceProjector::default()
//!     .project_model(model, &interactions)
//!     .unwrap();
//! assert!(!projection.records.is_empty());
//! ```

pub mod comment;
pub mod components;
pub mod config;
pub mod error;
pub mod matrix;
pub mod model;
pub mod projector;
pub mod resolver;
pub mod sparse;

pub use comment::{Comment, CommentId, CommentStory, Story, StoryId};
pub use components::{component_top_stories, ComponentTopStory};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use matrix::{IndexedSparseMatrix, InteractionMatrixBuilder};
pub use model::{ComponentBasis, LatentTransform, LowRankModel, TruncatedSvd};
pub use projector::{Projection, ProjectorConfig, RelevanceProjector, RelevanceRecord};
pub use resolver::{Resolution, ResolverConfig, TreeResolver};
pub use sparse::{CooMatrix, CscMatrix, CsrMatrix};
