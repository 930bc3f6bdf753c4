//! # storyrank
//!
//! Attributes discussion comments to the stories they belong to and scores
//! stories for users through a fitted low-rank model of who commented where.
//!
//! ## Quick Start
//!
//! ### As a Batch Job
//!
//! ```bash
//! storyrank --data-dir ./data resolve
//! storyrank --data-dir ./data build-matrix
//! storyrank --data-dir ./data recommend --model ./model.json
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use storyrank::prelude::*;
//!
//! let stories = vec![Story::new(100)];
//! let comments = vec![Comment::new(1, "a", 100), Comment::new(2, "b", 1)];
//!
//! let resolution = TreeResolver::default().resolve(&stories, &comments);
//! assert_eq!(resolution.records.len(), 2);
//! assert_eq!(resolution.rounds, 2);
//! ```
//!
//! ## Crate Structure
//!
//! - `storyrank-core` - comment tree resolution, sparse algebra, relevance projection
//! - `storyrank-storage` - JSON-lines tables and objects on local disk
//! - [`pipeline`] - the batch stages wiring the two together

pub mod pipeline;

// Re-export core types
pub use storyrank_core::{
    component_top_stories, Comment, CommentStory, ComponentBasis, ComponentTopStory, CsrMatrix,
    CscMatrix, Error, IndexedSparseMatrix, InteractionMatrixBuilder, LatentTransform,
    LowRankModel, PipelineConfig, Projection, ProjectorConfig, RelevanceProjector,
    RelevanceRecord, Resolution, ResolverConfig, Result, Story, TreeResolver, TruncatedSvd,
};

// Re-export storage
pub use storyrank_storage::{load_model, TableStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Comment, CommentStory, ComponentBasis, IndexedSparseMatrix, InteractionMatrixBuilder,
        LatentTransform, LowRankModel, PipelineConfig, ProjectorConfig, RelevanceProjector,
        RelevanceRecord, ResolverConfig, Story, TableStore, TreeResolver, TruncatedSvd,
    };
}
