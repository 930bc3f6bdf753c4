// User x story interaction matrix with positional id indices
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::comment::{CommentStory, StoryId};
use crate::sparse::CsrMatrix;
use crate::{Error, Result};

/// A sparse matrix whose row `i` belongs to `row_index[i]` and column `j` to `col_index[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSparseMatrix {
    pub matrix: CsrMatrix,
    pub row_index: Vec<String>,
    pub col_index: Vec<StoryId>,
}

impl IndexedSparseMatrix {
    pub fn new(matrix: CsrMatrix, row_index: Vec<String>, col_index: Vec<StoryId>) -> Result<Self> {
        let indexed = Self {
            matrix,
            row_index,
            col_index,
        };
        indexed.validate()?;
        Ok(indexed)
    }

    /// Check the matrix structure and that both indices cover its shape exactly.
    pub fn validate(&self) -> Result<()> {
        self.matrix.validate()?;
        let index_shape = (self.row_index.len(), self.col_index.len());
        if self.matrix.shape() != index_shape {
            return Err(Error::ShapeMismatch {
                context: "interaction matrix indices",
                expected: self.matrix.shape(),
                actual: index_shape,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn n_users(&self) -> usize {
        self.row_index.len()
    }

    #[inline]
    pub fn n_stories(&self) -> usize {
        self.col_index.len()
    }
}

/// Builds the user x story matrix from resolved comments.
///
/// Each distinct (commenter, story) pair contributes a single 1.0 no matter
/// how many comments the user left on the story. Users and stories are
/// indexed in ascending id order.
#[derive(Debug, Default)]
pub struct InteractionMatrixBuilder {
    pairs: BTreeSet<(String, StoryId)>,
}

impl InteractionMatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &CommentStory) {
        self.pairs
            .insert((record.commenter_id.clone(), record.story_id));
    }

    pub fn extend<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a CommentStory>,
    {
        for record in records {
            self.add(record);
        }
    }

    /// Number of distinct (user, story) pairs seen so far
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn build(self) -> Result<IndexedSparseMatrix> {
        let stories: BTreeSet<StoryId> = self.pairs.iter().map(|(_, story)| *story).collect();
        let col_index: Vec<StoryId> = stories.into_iter().collect();

        let mut row_index: Vec<String> = Vec::new();
        let mut triplets = Vec::with_capacity(self.pairs.len());
        for (user, story) in self.pairs {
            if row_index.last() != Some(&user) {
                row_index.push(user);
            }
            let row = row_index.len() - 1;
            // col_index is sorted and contains every story seen in pairs
            let col = col_index
                .binary_search(&story)
                .map_err(|_| Error::MalformedMatrix(format!("story {} missing from index", story)))?;
            triplets.push((row, col, 1.0f32));
        }

        let matrix = CsrMatrix::from_triplets(row_index.len(), col_index.len(), triplets)?;
        IndexedSparseMatrix::new(matrix, row_index, col_index)
    }
}
