// Top stories per latent component
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::comment::StoryId;
use crate::model::ComponentBasis;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTopStory {
    pub component_index: usize,
    pub story_id: StoryId,
    pub weight: f32,
}

/// The `limit` heaviest stories of every component, heaviest first.
///
/// Ties keep column order. `col_index` maps basis columns to story ids.
pub fn component_top_stories(
    basis: &ComponentBasis,
    col_index: &[StoryId],
    limit: usize,
) -> Result<Vec<ComponentTopStory>> {
    if basis.n_items() != col_index.len() {
        return Err(Error::DimensionMismatch {
            context: "component basis items",
            expected: col_index.len(),
            actual: basis.n_items(),
        });
    }

    let mut top = Vec::with_capacity(basis.n_components() * limit.min(col_index.len()));
    for (component_index, weights) in basis.view().rows().into_iter().enumerate() {
        let mut ranked: Vec<(usize, f32)> = weights.iter().copied().enumerate().collect();
        ranked.sort_by_key(|&(col, weight)| (std::cmp::Reverse(OrderedFloat(weight)), col));
        top.extend(
            ranked
                .into_iter()
                .take(limit)
                .map(|(col, weight)| ComponentTopStory {
                    component_index,
                    story_id: col_index[col],
                    weight,
                }),
        );
    }
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_top_stories_per_component() {
        let basis = ComponentBasis::new(array![[0.1f32, 0.7, -0.9, 0.7], [0.5, 0.0, 0.2, 0.1]]);
        let top = component_top_stories(&basis, &[11, 12, 13, 14], 2).unwrap();

        let summary: Vec<(usize, StoryId)> =
            top.iter().map(|t| (t.component_index, t.story_id)).collect();
        assert_eq!(summary, vec![(0, 12), (0, 14), (1, 11), (1, 13)]);
        assert_eq!(top[0].weight, 0.7);
    }

    #[test]
    fn test_limit_larger_than_items() {
        let basis = ComponentBasis::new(array![[1.0f32, 2.0]]);
        let top = component_top_stories(&basis, &[1, 2], 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].story_id, 2);
    }

    #[test]
    fn test_index_mismatch() {
        let basis = ComponentBasis::new(array![[1.0f32, 2.0]]);
        assert!(component_top_stories(&basis, &[1], 1).is_err());
    }
}
