//! Placement of classified nodes into the document tree.
//!
//! A node descends from the root along the chain of last children for as
//! long as it is indented deeper than the last child, or sits at the same
//! indentation as a directive that accepts it as a chained branch
//! (`- else` under `- if`). Filter bodies are routed separately through
//! [`open_filter`] before classification.

use crate::ast::{Filter, Node, NodeKind};
use crate::types::DirectiveRules;
use log::trace;

/// Attaches `node` under the deepest eligible parent below `root`.
pub fn insert(root: &mut Node, node: Node, rules: &DirectiveRules) {
    let mut current = root;
    let mut depth = 0;
    loop {
        let descend = current
            .children
            .last()
            .is_some_and(|last| should_nest(last, &node, rules));
        if !descend {
            trace!("line {}: attached at depth {}", node.line_no, depth);
            current.children.push(node);
            return;
        }
        let idx = current.children.len() - 1;
        current = &mut current.children[idx];
        depth += 1;
    }
}

fn should_nest(last: &Node, node: &Node, rules: &DirectiveRules) -> bool {
    node.indentation > last.indentation
        || (node.indentation == last.indentation && accepts_chained(last, node, rules))
}

/// Only directives chain, and only with the follow-ups their table lists.
fn accepts_chained(last: &Node, node: &Node, rules: &DirectiveRules) -> bool {
    match (last.keyword(), node.keyword()) {
        (Some(keyword), Some(follower)) => rules.chains(keyword, follower),
        _ => false,
    }
}

/// The filter whose body a line at `indentation` belongs to, if any.
pub fn open_filter(root: &mut Node, indentation: isize) -> Option<&mut Filter> {
    let mut current = root;
    loop {
        let last = current.children.last()?;
        if indentation <= last.indentation {
            return None;
        }
        let is_filter = matches!(last.kind, NodeKind::Filter(_));
        let idx = current.children.len() - 1;
        current = &mut current.children[idx];
        if is_filter {
            return match &mut current.kind {
                NodeKind::Filter(filter) => Some(filter),
                _ => None,
            };
        }
    }
}

/// Credits a blank source line to the most recently placed node, which is
/// always the end of the rightmost spine (or the last raw line of a filter).
pub fn mark_blank_line(root: &mut Node) {
    let mut current = root;
    while !current.children.is_empty() {
        let idx = current.children.len() - 1;
        current = &mut current.children[idx];
    }
    if current.indentation < 0 {
        return;
    }
    match &mut current.kind {
        NodeKind::Filter(filter) => match filter.lines.last_mut() {
            Some(line) => line.trailing_blank_lines += 1,
            None => current.trailing_blank_lines += 1,
        },
        _ => current.trailing_blank_lines += 1,
    }
}
