mod sorting;
mod tree;
mod types;

pub use sorting::{
    sort_comments_by_score, sort_comments_newest, sort_threads_by_score, sort_threads_newest,
};
pub use tree::{build_comment_tree, can_reply, find_depth, flatten_tree, CommentNode};
pub use types::{Comment, NewComment, NewThread, NewUser, Thread, User};
