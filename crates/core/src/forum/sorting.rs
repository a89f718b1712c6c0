use std::cmp::Ordering;

use super::types::{Comment, Thread};

/// Sorts comments by score (highest first), then newest first.
///
/// This is the sibling order the tree builder preserves.
pub fn sort_comments_by_score(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.created.cmp(&a.created))
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Sorts comments newest first.
pub fn sort_comments_newest(comments: &mut [Comment]) {
    comments.sort_by(|a, b| newest_first(a.created, a.id, b.created, b.id));
}

/// Sorts threads by score (highest first), then newest first.
pub fn sort_threads_by_score(threads: &mut [Thread]) {
    threads.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| newest_first(a.created, a.id, b.created, b.id))
    });
}

/// Sorts threads newest first.
pub fn sort_threads_newest(threads: &mut [Thread]) {
    threads.sort_by(|a, b| newest_first(a.created, a.id, b.created, b.id));
}

fn newest_first<T: Ord>(a_created: T, a_id: i64, b_created: T, b_id: i64) -> Ordering {
    b_created.cmp(&a_created).then_with(|| b_id.cmp(&a_id))
}
