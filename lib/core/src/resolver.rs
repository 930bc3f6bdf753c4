//! Comment tree resolution.
//!
//! Attributes every comment to the story at the root of its reply chain.
//! Resolution runs in rounds over the whole pending set instead of walking
//! each chain, so total work is bounded by `max_depth * comments` no matter
//! how deep individual threads go.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::comment::{Comment, CommentId, CommentStory, Story, StoryId};
use crate::{Error, Result};

/// Default number of resolution rounds. Replies nested deeper than this are dropped.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "resolver max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a resolver run.
///
/// Comments that never reach a story are not errors; they are counted here
/// by the reason they were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub records: Vec<CommentStory>,
    /// Rounds actually executed
    pub rounds: usize,
    /// Parent matched neither a story nor a known comment
    pub dangling: usize,
    /// Path compression pointed a comment back at itself
    pub cyclic: usize,
    /// Still pending when the depth bound ran out
    pub exhausted: usize,
    /// Repeated comment ids, ignored after the first occurrence
    pub duplicates: usize,
}

impl Resolution {
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dangling + self.cyclic + self.exhausted
    }

    #[inline]
    #[must_use]
    pub fn into_records(self) -> Vec<CommentStory> {
        self.records
    }
}

/// A comment still climbing towards its story.
#[derive(Debug, Clone)]
struct Pending<'a> {
    comment_id: CommentId,
    author_id: &'a str,
    parent: i64,
}

pub struct TreeResolver {
    config: ResolverConfig,
}

impl TreeResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }

    /// Resolve every comment to its root story.
    ///
    /// Each round first settles comments whose parent is a story, then moves
    /// every other pending comment one hop up by replacing its parent with
    /// the parent's parent.
    pub fn resolve(&self, stories: &[Story], comments: &[Comment]) -> Resolution {
        let story_ids: AHashSet<StoryId> = stories.iter().map(|s| s.id).collect();

        let mut parents: AHashMap<CommentId, i64> = AHashMap::with_capacity(comments.len());
        let mut pending: Vec<Pending<'_>> = Vec::with_capacity(comments.len());
        let mut resolution = Resolution::default();

        for comment in comments {
            if parents.contains_key(&comment.id) {
                resolution.duplicates += 1;
                continue;
            }
            parents.insert(comment.id, comment.parent);
            pending.push(Pending {
                comment_id: comment.id,
                author_id: &comment.author_id,
                parent: comment.parent,
            });
        }

        if resolution.duplicates > 0 {
            warn!(
                "Ignored {} comments with duplicate ids",
                resolution.duplicates
            );
        }

        while !pending.is_empty() && resolution.rounds < self.config.max_depth {
            resolution.rounds += 1;
            let before = pending.len();

            let mut climbing = Vec::with_capacity(pending.len());
            for mut item in pending {
                if story_ids.contains(&item.parent) {
                    resolution.records.push(CommentStory::new(
                        item.comment_id,
                        item.parent,
                        item.author_id,
                    ));
                    continue;
                }

                match parents.get(&item.parent) {
                    Some(&grandparent) if grandparent == item.comment_id => {
                        resolution.cyclic += 1;
                    }
                    Some(&grandparent) => {
                        item.parent = grandparent;
                        climbing.push(item);
                    }
                    None => resolution.dangling += 1,
                }
            }
            pending = climbing;

            debug!(
                round = resolution.rounds,
                resolved = resolution.records.len(),
                pending = pending.len(),
                "Resolution round finished ({} left the working set)",
                before - pending.len()
            );
        }

        resolution.exhausted = pending.len();

        info!(
            "Resolved {} comments to stories in {} rounds ({} dropped: {} dangling, {} cyclic, {} past depth {})",
            resolution.records.len(),
            resolution.rounds,
            resolution.dropped(),
            resolution.dangling,
            resolution.cyclic,
            resolution.exhausted,
            self.config.max_depth,
        );
        if resolution.exhausted > 0 {
            warn!(
                "{} comments did not reach a story within {} rounds",
                resolution.exhausted, self.config.max_depth
            );
        }

        resolution
    }
}

impl Default for TreeResolver {
    fn default() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A single thread hanging off story 1000: comment `i` replies to `i - 1`.
    fn chain(len: i64) -> Vec<Comment> {
        (1..=len)
            .map(|i| {
                let parent = if i == 1 { 1000 } else { i - 1 };
                Comment::new(i, format!("user{}", i), parent)
            })
            .collect()
    }

    fn sorted(mut records: Vec<CommentStory>) -> Vec<CommentStory> {
        records.sort_by_key(|r| r.comment_id);
        records
    }

    #[test]
    fn test_two_level_thread() {
        let comments = vec![Comment::new(1, "a", 100), Comment::new(2, "b", 1)];
        let stories = vec![Story::new(100)];

        let resolution = TreeResolver::default().resolve(&stories, &comments);

        assert_eq!(resolution.rounds, 2);
        assert_eq!(resolution.dropped(), 0);
        assert_eq!(
            sorted(resolution.records),
            vec![CommentStory::new(1, 100, "a"), CommentStory::new(2, 100, "b")]
        );
    }

    #[test]
    fn test_top_level_comment_resolves_in_one_round() {
        let comments = vec![Comment::new(5, "x", 42)];
        let resolution = TreeResolver::default().resolve(&[Story::new(42)], &comments);

        assert_eq!(resolution.rounds, 1);
        assert_eq!(resolution.records, vec![CommentStory::new(5, 42, "x")]);
    }

    #[test]
    fn test_depth_bound() {
        let stories = [Story::new(1000)];
        let resolver = TreeResolver::default();

        let resolution = resolver.resolve(&stories, &chain(10));
        assert_eq!(resolution.records.len(), 10);
        assert_eq!(resolution.exhausted, 0);

        let resolution = resolver.resolve(&stories, &chain(11));
        assert_eq!(resolution.records.len(), 10);
        assert_eq!(resolution.exhausted, 1);
        assert!(resolution.records.iter().all(|r| r.comment_id != 11));
    }

    #[test]
    fn test_custom_depth() {
        let resolver = TreeResolver::new(ResolverConfig { max_depth: 3 }).unwrap();
        assert_eq!(resolver.max_depth(), 3);
        let resolution = resolver.resolve(&[Story::new(1000)], &chain(5));

        let ids: Vec<_> = sorted(resolution.records)
            .into_iter()
            .map(|r| r.comment_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(resolution.exhausted, 2);
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(TreeResolver::new(ResolverConfig { max_depth: 0 }).is_err());
    }

    #[test]
    fn test_dangling_parent_dropped() {
        let comments = vec![
            Comment::new(1, "a", 100),
            Comment::new(2, "b", 999),
            Comment::new(3, "c", 2),
        ];
        let resolution = TreeResolver::default().resolve(&[Story::new(100)], &comments);

        assert_eq!(resolution.records, vec![CommentStory::new(1, 100, "a")]);
        assert_eq!(resolution.dangling, 2);
        assert_eq!(resolution.exhausted, 0);
    }

    #[test]
    fn test_cycles_are_dropped() {
        // 1 <-> 2 form a loop, 3 hangs below it
        let comments = vec![
            Comment::new(1, "a", 2),
            Comment::new(2, "b", 1),
            Comment::new(3, "c", 1),
            Comment::new(4, "d", 100),
        ];
        let resolution = TreeResolver::default().resolve(&[Story::new(100)], &comments);

        assert_eq!(resolution.records, vec![CommentStory::new(4, 100, "d")]);
        assert_eq!(resolution.dropped(), 3);
        assert_eq!(resolution.cyclic, 2);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let comments = vec![Comment::new(1, "a", 100), Comment::new(1, "z", 100)];
        let resolution = TreeResolver::default().resolve(&[Story::new(100)], &comments);

        assert_eq!(resolution.records, vec![CommentStory::new(1, 100, "a")]);
        assert_eq!(resolution.duplicates, 1);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let mut comments = chain(12);
        comments.push(Comment::new(50, "q", 2000));
        comments.push(Comment::new(51, "r", 50));
        let stories = [Story::new(1000), Story::new(2000)];
        let resolver = TreeResolver::default();

        let first = sorted(resolver.resolve(&stories, &comments).records);
        comments.reverse();
        let second = sorted(resolver.resolve(&stories, &comments).records);

        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn test_empty_input() {
        let resolution = TreeResolver::default().resolve(&[], &[]);
        assert_eq!(resolution.rounds, 0);
        assert!(resolution.records.is_empty());
    }
}
