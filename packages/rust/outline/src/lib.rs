//! Outline parsing and the heading tree it produces.
//!
//! The generation service answers an outline request with a numbered list
//! (`1: Heading`, `1.1: Subheading`, ...). This crate turns that text into one
//! [`SectionTree`] per top-level number:
//! - [`parse_outline`]: text → trees
//! - [`SectionTree`]: arena-backed ordered tree of [`Heading`]s

mod parser;
mod tree;

pub use parser::{build_tree, extract_headings, group_by_top_level, parse_outline};
pub use tree::{Heading, NodeId, SectionTree, Walk};
