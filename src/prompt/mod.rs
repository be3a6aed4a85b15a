//! Prompt construction and commit-type catalogs.

pub mod builder;
pub mod catalog;

pub use builder::{build_structured_prompt, build_text_prompt};
pub use catalog::{CommitType, CommitTypeCatalog, DEFAULT_COMMIT_TYPES};
