//! Comment tree reconstruction.
//!
//! Storage returns a thread's comments as a flat list. These functions turn it
//! into a depth-annotated reply tree for rendering and for the reply depth cap.

use std::collections::{HashMap, HashSet};

use super::types::Comment;

/// A comment with its computed depth and ordered replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment: Comment,
    /// 0 for a top-level comment, parent depth + 1 otherwise.
    pub depth: usize,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Builds the reply tree of a single thread.
///
/// Siblings keep the order they have in `comments`. Comments whose parent is
/// not in the list, and comments only reachable through a cycle, are left out.
/// A comment id is attached at most once.
pub fn build_comment_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    for (index, comment) in comments.iter().enumerate() {
        if !comment.is_root() {
            children_of.entry(comment.parent_id).or_default().push(index);
        }
    }

    let mut attached = HashSet::new();
    comments
        .iter()
        .filter(|comment| comment.is_root())
        .filter_map(|root| build_node(root, 0, comments, &children_of, &mut attached))
        .collect()
}

fn build_node(
    comment: &Comment,
    depth: usize,
    comments: &[Comment],
    children_of: &HashMap<i64, Vec<usize>>,
    attached: &mut HashSet<i64>,
) -> Option<CommentNode> {
    if !attached.insert(comment.id) {
        return None;
    }

    let children = children_of
        .get(&comment.id)
        .map(|indexes| {
            indexes
                .iter()
                .filter_map(|&i| build_node(&comments[i], depth + 1, comments, children_of, attached))
                .collect()
        })
        .unwrap_or_default();

    Some(CommentNode {
        comment: comment.clone(),
        depth,
        children,
    })
}

/// Pre-order walk of the tree, yielding each comment with its depth.
pub fn flatten_tree(tree: &[CommentNode]) -> Vec<(&Comment, usize)> {
    let mut flat = Vec::new();
    let mut stack: Vec<&CommentNode> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        flat.push((&node.comment, node.depth));
        stack.extend(node.children.iter().rev());
    }
    flat
}

/// Depth of the comment with `id`, if it is part of the tree.
pub fn find_depth(tree: &[CommentNode], id: i64) -> Option<usize> {
    flatten_tree(tree)
        .into_iter()
        .find(|(comment, _)| comment.id == id)
        .map(|(_, depth)| depth)
}

/// Whether a comment at `depth` may receive a reply under a `max_depth` cap.
pub fn can_reply(depth: usize, max_depth: usize) -> bool {
    depth < max_depth
}
