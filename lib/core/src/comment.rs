// Discussion records - stories, comments and the attribution between them
use serde::{Deserialize, Serialize};

pub type StoryId = i64;
pub type CommentId = i64;

/// A root content item. Comments ultimately hang off one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
}

/// A raw comment as delivered by the warehouse.
///
/// `parent` is either a story id or another comment's id. The two id spaces
/// are told apart by membership in the known story set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_id: String,
    pub parent: i64,
}

/// Output of the tree resolver: the story a comment belongs to and who wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentStory {
    pub comment_id: CommentId,
    pub story_id: StoryId,
    pub commenter_id: String,
}

impl Story {
    #[inline]
    #[must_use]
    pub fn new(id: StoryId) -> Self {
        Self { id }
    }
}

impl From<StoryId> for Story {
    fn from(id: StoryId) -> Self {
        Story { id }
    }
}

impl Comment {
    #[inline]
    #[must_use]
    pub fn new(id: CommentId, author_id: impl Into<String>, parent: i64) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            parent,
        }
    }
}

impl CommentStory {
    #[inline]
    #[must_use]
    pub fn new(comment_id: CommentId, story_id: StoryId, commenter_id: impl Into<String>) -> Self {
        Self {
            comment_id,
            story_id,
            commenter_id: commenter_id.into(),
        }
    }
}
