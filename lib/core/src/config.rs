use serde::{Deserialize, Serialize};

use crate::projector::ProjectorConfig;
use crate::resolver::ResolverConfig;
use crate::Result;

/// Stories listed per latent component by default.
pub const DEFAULT_TOP_STORIES_PER_COMPONENT: usize = 10;

/// Settings for one batch run of the pipeline.
///
/// Every field has a default, so a config file only needs the values it changes:
///
/// ```
/// use storyrank_core::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"projector": {"latent_threshold": 0.5}}"#).unwrap();
/// assert_eq!(config.projector.latent_threshold, 0.5);
/// assert_eq!(config.projector.basis_threshold, 0.01);
/// assert_eq!(config.resolver.max_depth, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub projector: ProjectorConfig,
    pub top_stories_per_component: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            projector: ProjectorConfig::default(),
            top_stories_per_component: DEFAULT_TOP_STORIES_PER_COMPONENT,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;
        self.projector.validate()
    }
}
