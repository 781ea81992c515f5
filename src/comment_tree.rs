//! Reconstruction of reply threads from flat comment rows.
//!
//! The store returns the comments of one resource as a flat list ordered by
//! creation time. [`build_comment_tree`] turns that list into a forest in two
//! passes over the input, keeping the input order among siblings.
//!
//! Referential problems never hide content: a comment whose parent is missing
//! from the list (deleted, or attached to another resource) becomes a root,
//! and so does the earliest member of any parent cycle.

use std::collections::HashMap;

use crate::models::{Comment, CommentNode};

/// build_comment_tree
///
/// Every input comment appears exactly once in the returned forest. Runs in
/// O(n) time and space without recursing. Dropping or serializing the
/// returned nodes does recurse, once per level, so a very deep reply chain
/// is still limited by stack in those steps.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let n = comments.len();

    // First pass: id -> position. The first occurrence of a duplicated id wins.
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(n);
    for (pos, comment) in comments.iter().enumerate() {
        index.entry(comment.id).or_insert(pos);
    }

    let mut parent: Vec<Option<usize>> = comments
        .iter()
        .map(|comment| comment.parent_id.and_then(|id| index.get(&id).copied()))
        .collect();
    break_cycles(&mut parent);

    // Second pass, in input order, so sibling lists inherit creation order.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (pos, link) in parent.iter().enumerate() {
        match link {
            Some(p) => children[*p].push(pos),
            None => roots.push(pos),
        }
    }

    // Pre-order walk from the roots; assembling in reverse pre-order guarantees
    // every child node is finished before its parent takes it.
    let mut preorder = Vec::with_capacity(n);
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(pos) = stack.pop() {
        preorder.push(pos);
        stack.extend(children[pos].iter().rev().copied());
    }

    let mut pending: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = (0..n).map(|_| None).collect();
    for &pos in preorder.iter().rev() {
        let node_children = children[pos]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(comment) = pending[pos].take() {
            built[pos] = Some(CommentNode::new(comment, node_children));
        }
    }

    roots
        .into_iter()
        .filter_map(|pos| built[pos].take())
        .collect()
}

/// Detaches one link of every parent cycle so each chain ends at a root.
/// The detached comment is the cycle member that came first in the input.
fn break_cycles(parent: &mut [Option<usize>]) {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parent.len()];
    let mut path = Vec::new();

    for start in 0..parent.len() {
        let mut cursor = Some(start);
        while let Some(pos) = cursor {
            match state[pos] {
                UNSEEN => {
                    state[pos] = ON_PATH;
                    path.push(pos);
                    cursor = parent[pos];
                }
                ON_PATH => {
                    // `pos` closes a cycle made of the path suffix starting at it.
                    let from = path.iter().rposition(|p| *p == pos).unwrap_or(0);
                    if let Some(first) = path[from..].iter().min().copied() {
                        parent[first] = None;
                    }
                    break;
                }
                _ => break,
            }
        }
        for pos in path.drain(..) {
            state[pos] = DONE;
        }
    }
}
