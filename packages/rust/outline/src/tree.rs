//! Heading and section tree types.

use std::fmt;

/// Indentation unit used when rendering a tree as text.
const INDENT: &str = "    ";

// ---------------------------------------------------------------------------
// Heading
// ---------------------------------------------------------------------------

/// A single outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Dot-separated positional index, e.g. `3.5.1`.
    pub index: String,
    /// Heading text.
    pub title: String,
    /// Generated body; `None` until content generation completes.
    pub content: Option<String>,
}

impl Heading {
    pub fn new(index: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            title: title.into(),
            content: None,
        }
    }

    /// Number of dots in the index; `1` is depth 0, `1.2.3` is depth 2.
    pub fn depth(&self) -> usize {
        self.index.matches('.').count()
    }

    /// The leading top-level number of the index (`"3"` for `3.5.1`).
    pub fn top_level(&self) -> &str {
        self.index.split('.').next().unwrap_or_default()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// `"{index}: {title}"`, the form used in prompts and logs.
    pub fn label(&self) -> String {
        format!("{}: {}", self.index, self.title)
    }
}

// ---------------------------------------------------------------------------
// SectionTree
// ---------------------------------------------------------------------------

/// Handle to a node inside a [`SectionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    heading: Heading,
    children: Vec<NodeId>,
}

/// Ordered tree of headings for one top-level outline group.
///
/// Nodes live in an arena; the tree's own root is implicit, so the top-level
/// headings are listed in [`SectionTree::roots`]. Sibling order is insertion
/// order and never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `heading` under `parent` (`None` = the implicit root) as the
    /// last child, returning its handle.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn add_child(&mut self, parent: Option<NodeId>, heading: Heading) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            heading,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes in encounter order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn heading(&self, id: NodeId) -> &Heading {
        &self.nodes[id.0].heading
    }

    pub fn heading_mut(&mut self, id: NodeId) -> &mut Heading {
        &mut self.nodes[id.0].heading
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Title of the first top-level heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.roots.first().map(|id| self.heading(*id).title.as_str())
    }

    /// Pre-order traversal in document order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Leaf nodes in document order: the headings that receive generated
    /// content. Two calls on an unmodified tree return the same sequence.
    pub fn writable_headings(&self) -> Vec<NodeId> {
        self.walk()
            .filter(|(id, _)| self.is_leaf(*id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Store generated content on a heading.
    pub fn set_content(&mut self, id: NodeId, content: impl Into<String>) {
        self.nodes[id.0].heading.content = Some(content.into());
    }

    /// Deterministic indented rendering, one `index: title` line per node.
    ///
    /// Indentation follows the heading's dot-count, so the output parses back
    /// into the same shape.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (_, heading) in self.walk() {
            for _ in 0..heading.depth() {
                out.push_str(INDENT);
            }
            out.push_str(&heading.label());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for SectionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Pre-order iterator over a [`SectionTree`].
pub struct Walk<'a> {
    tree: &'a SectionTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a Heading);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some((id, self.tree.heading(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SectionTree {
        let mut tree = SectionTree::new();
        let a = tree.add_child(None, Heading::new("1", "Overview"));
        let b = tree.add_child(Some(a), Heading::new("1.1", "History"));
        tree.add_child(Some(b), Heading::new("1.1.1", "Origins"));
        tree.add_child(Some(a), Heading::new("1.2", "Usage"));
        tree
    }

    #[test]
    fn heading_depth_and_top_level() {
        let h = Heading::new("3.5.1", "Deep");
        assert_eq!(h.depth(), 2);
        assert_eq!(h.top_level(), "3");
        assert!(!h.has_content());
        assert_eq!(Heading::new("12", "Top").depth(), 0);
        assert_eq!(Heading::new("12.4", "x").top_level(), "12");
    }

    #[test]
    fn walk_is_preorder() {
        let tree = sample();
        let titles: Vec<_> = tree.walk().map(|(_, h)| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "History", "Origins", "Usage"]);
    }

    #[test]
    fn writable_headings_are_leaves_and_stable() {
        let tree = sample();
        let first = tree.writable_headings();
        let second = tree.writable_headings();
        assert_eq!(first, second);

        let titles: Vec<_> = first.iter().map(|id| tree.heading(*id).title.as_str()).collect();
        assert_eq!(titles, vec!["Origins", "Usage"]);
        assert!(first.iter().all(|id| tree.is_leaf(*id)));
    }

    #[test]
    fn set_content_marks_heading() {
        let mut tree = sample();
        let leaves = tree.writable_headings();
        tree.set_content(leaves[0], "body");
        assert!(tree.heading(leaves[0]).has_content());
        assert_eq!(tree.heading(leaves[0]).content.as_deref(), Some("body"));
        assert!(!tree.heading(leaves[1]).has_content());
        // Content does not affect the leaf set.
        assert_eq!(tree.writable_headings(), leaves);
    }

    #[test]
    fn render_indents_by_depth() {
        let tree = sample();
        assert_eq!(
            tree.render(),
            "1: Overview\n    1.1: History\n        1.1.1: Origins\n    1.2: Usage\n"
        );
        assert_eq!(tree.to_string(), tree.render());
        assert_eq!(tree.title(), Some("Overview"));
    }

    #[test]
    fn empty_tree() {
        let tree = SectionTree::new();
        assert!(tree.is_empty());
        assert!(tree.writable_headings().is_empty());
        assert_eq!(tree.render(), "");
        assert_eq!(tree.title(), None);
    }
}
