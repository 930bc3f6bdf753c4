// Well-known tables of the story recommender and typed access to them
use anyhow::{Context, Result};
use std::path::Path;
use storyrank_core::{IndexedSparseMatrix, TruncatedSvd};

use crate::table::{read_json, TableStore};

pub const STORIES: &str = "hackernews.stories";
pub const COMMENTS: &str = "hackernews.comments";
pub const COMMENT_STORIES: &str = "hackernews.comment_stories";
pub const USER_TOP_RECOMMENDED_STORIES: &str = "hackernews.user_top_recommended_stories";
pub const COMPONENT_TOP_STORIES: &str = "hackernews.component_top_stories";
pub const USER_STORY_MATRIX: &str = "user_story_matrix";

impl TableStore {
    /// Load the user x story matrix and check its indices against its shape.
    pub fn load_interactions(&self) -> Result<IndexedSparseMatrix> {
        let interactions: IndexedSparseMatrix = self.load_object(USER_STORY_MATRIX)?;
        interactions
            .validate()
            .context("Stored user_story_matrix is inconsistent")?;
        Ok(interactions)
    }
}

/// Load a fitted truncated SVD from a JSON (or `.json.gz`) file.
pub fn load_model(path: &Path) -> Result<TruncatedSvd> {
    let model: TruncatedSvd = read_json(path)?;
    model
        .validate()
        .with_context(|| format!("Rejected model {}", path.display()))?;
    Ok(model)
}
