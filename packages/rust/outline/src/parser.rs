//! Numbered outline parser.
//!
//! Accepts the loosely formatted text the outline prompt produces:
//! - Heading lines: `<digits>(.<digits>)*: <title>`, optionally indented
//! - Anything else (preamble, blank lines, commentary) is ignored

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::tree::{Heading, NodeId, SectionTree};

/// Matches `1: Title`, `  2.3.1 : Title`.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)*)\s*:\s*(.+)$").expect("heading regex")
});

/// Parse outline text into one tree per distinct top-level number, in order
/// of first appearance. Malformed text yields fewer (possibly zero) trees;
/// it is never an error.
pub fn parse_outline(text: &str) -> Vec<SectionTree> {
    let headings = extract_headings(text);
    let total = headings.len();

    let trees: Vec<SectionTree> = group_by_top_level(headings)
        .into_iter()
        .map(build_tree)
        .collect();

    debug!(headings = total, trees = trees.len(), "outline parsed");
    trees
}

/// Extract every `(index, title)` line, trimming the title.
pub fn extract_headings(text: &str) -> Vec<Heading> {
    text.lines()
        .filter_map(|line| {
            let caps = HEADING_RE.captures(line)?;
            let title = caps[2].trim();
            if title.is_empty() {
                return None;
            }
            Some(Heading::new(&caps[1], title))
        })
        .collect()
}

/// Partition headings by their leading top-level number.
///
/// Groups appear in first-seen order; within a group, headings keep their
/// encounter order even when the group is interrupted by another number.
pub fn group_by_top_level(headings: Vec<Heading>) -> Vec<Vec<Heading>> {
    let mut keys: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<Heading>> = Vec::new();

    for heading in headings {
        let key = heading.top_level();
        match keys.iter().position(|k| k == key) {
            Some(pos) => groups[pos].push(heading),
            None => {
                keys.push(key.to_string());
                groups.push(vec![heading]);
            }
        }
    }

    groups
}

/// Build one tree from a group using a depth stack.
///
/// A deeper heading descends under the previously added node. A shallower
/// heading pops exactly one frame, however many levels the depth dropped, so
/// `1.2.3` followed by `1.4` attaches `1.4` under `1`, while `1.1.1` followed
/// by a repeated `1` also lands under `1`. Equal depth attaches as a sibling.
pub fn build_tree(headings: Vec<Heading>) -> SectionTree {
    let mut tree = SectionTree::new();
    // `None` is the tree's implicit root.
    let mut stack: Vec<Option<NodeId>> = vec![None];
    let mut last_depth = 0;
    let mut last_added: Option<NodeId> = None;

    for heading in headings {
        let depth = heading.depth();

        if depth > last_depth {
            stack.push(last_added);
        } else if depth < last_depth && stack.len() > 1 {
            stack.pop();
        }

        let parent = stack.last().copied().flatten();
        last_added = Some(tree.add_child(parent, heading));
        last_depth = depth;
    }

    tree
}
