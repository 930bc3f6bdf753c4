//! Batch stages of the story recommender.
//!
//! Each stage reads its inputs from a [`TableStore`], runs one core
//! transform and writes its output table back. Stages are independent so a
//! scheduler can rerun any of them on its own.

use anyhow::{Context, Result};
use storyrank_core::{
    component_top_stories, Comment, CommentStory, InteractionMatrixBuilder, PipelineConfig,
    RelevanceProjector, RelevanceRecord, Resolution, Story, TreeResolver, TruncatedSvd,
};
use storyrank_storage::catalog::{
    COMMENTS, COMMENT_STORIES, COMPONENT_TOP_STORIES, STORIES, USER_STORY_MATRIX,
    USER_TOP_RECOMMENDED_STORIES,
};
use storyrank_storage::TableStore;
use tracing::info;

/// Resolve `hackernews.comments` against `hackernews.stories` into `hackernews.comment_stories`.
pub fn build_comment_stories(store: &TableStore, config: &PipelineConfig) -> Result<Resolution> {
    let stories: Vec<Story> = store.load_table(STORIES)?;
    let comments: Vec<Comment> = store.load_table(COMMENTS)?;

    let resolver = TreeResolver::new(config.resolver)?;
    let resolution = resolver.resolve(&stories, &comments);
    store.save_table(COMMENT_STORIES, &resolution.records)?;
    Ok(resolution)
}

/// Turn `hackernews.comment_stories` into the `user_story_matrix` object. Returns its shape.
pub fn build_user_story_matrix(store: &TableStore) -> Result<(usize, usize)> {
    let comment_stories: Vec<CommentStory> = store.load_table(COMMENT_STORIES)?;

    let mut builder = InteractionMatrixBuilder::new();
    builder.extend(&comment_stories);
    let interactions = builder
        .build()
        .context("Failed to build user story matrix")?;
    info!(
        "User story matrix: {} users x {} stories, {} interactions",
        interactions.n_users(),
        interactions.n_stories(),
        interactions.matrix.nnz()
    );

    store.save_object(USER_STORY_MATRIX, &interactions)?;
    Ok(interactions.matrix.shape())
}

/// Score users against stories and write `hackernews.user_top_recommended_stories`.
///
/// Consumes the model: its basis is sparsified in place.
pub fn build_user_top_recommended_stories(
    store: &TableStore,
    model: TruncatedSvd,
    config: &PipelineConfig,
) -> Result<Vec<RelevanceRecord>> {
    let interactions = store.load_interactions()?;
    let projector = RelevanceProjector::new(config.projector)?;
    let records = projector
        .project_model(model, &interactions)
        .context("Relevance projection failed")?
        .into_records();

    store.save_table(USER_TOP_RECOMMENDED_STORIES, &records)?;
    Ok(records)
}

/// Write the heaviest stories of every model component to `hackernews.component_top_stories`.
pub fn build_component_top_stories(
    store: &TableStore,
    model: &TruncatedSvd,
    config: &PipelineConfig,
) -> Result<usize> {
    let interactions = store.load_interactions()?;
    let top = component_top_stories(
        model.components(),
        &interactions.col_index,
        config.top_stories_per_component,
    )?;

    store.save_table(COMPONENT_TOP_STORIES, &top)?;
    Ok(top.len())
}

/// Every stage in order: resolve, build the matrix, component top stories, recommendations.
pub fn run(store: &TableStore, model: TruncatedSvd, config: &PipelineConfig) -> Result<()> {
    let resolution = build_comment_stories(store, config)?;
    let (users, stories) = build_user_story_matrix(store)?;
    let components = build_component_top_stories(store, &model, config)?;
    let recommendations = build_user_top_recommended_stories(store, model, config)?;

    info!(
        "Pipeline finished: {} comment stories ({} dropped), {}x{} matrix, {} component stories, {} recommendations",
        resolution.records.len(),
        resolution.dropped(),
        users,
        stories,
        components,
        recommendations.len()
    );
    Ok(())
}
