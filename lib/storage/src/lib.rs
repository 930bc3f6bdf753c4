//! # storyrank Storage
//!
//! Local-disk persistence for the pipeline's tables: JSON lines for row
//! tables, JSON for single objects such as the interaction matrix, optional
//! gzip, atomic replacement on write.

pub mod catalog;
pub mod table;

pub use catalog::load_model;
pub use table::{read_json, read_jsonl, write_json, write_jsonl, TableStore};
