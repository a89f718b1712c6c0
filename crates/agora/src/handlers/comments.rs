//! Comment listings and replies.

use axum::http::{Method, StatusCode};

use agora_core::{
    auth::CsrfGenerator,
    forum::{build_comment_tree, can_reply, find_depth, Comment, Thread},
    validation::{validate_comment, CommentForm, COMMENT_ACTION},
};

use crate::{context::RequestScope, error::PipelineError, pipeline::Next, views::View};

use super::{page, paginate, query_id, require_user, window};

/// `GET /newcomments`
pub fn newest(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let page = page(scope);
    let per_page = scope.config().comments_per_page;
    let (limit, offset) = window(page, per_page);
    let rows = scope.comments()?.list_newest(limit, offset)?;
    let (comments, pagination) = paginate(rows, page, per_page, |p| format!("/newcomments?p={p}"));
    scope.render(&View::CommentList {
        heading: String::new(),
        comments,
        pagination,
    })
}

/// `GET /threads?id=`: comments written by a user.
pub fn by_author(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let id = query_id(scope, "id")?;
    let user = scope
        .users()?
        .get_by_id(id)?
        .ok_or_else(|| PipelineError::NotFound(format!("user {id}")))?;
    let comments = scope.comments()?.list_by_author(user.id)?;
    scope.render(&View::CommentList {
        heading: format!("{}'s comments", user.username),
        comments,
        pagination: Default::default(),
    })
}

/// Where a reply goes: the thread and, below the top level, the parent.
struct ReplyTarget {
    thread: Thread,
    parent: Option<Comment>,
    /// Whether the parent is shallow enough to take a reply.
    open: bool,
}

fn reply_target(
    scope: &mut RequestScope,
    thread_id: i64,
    parent_id: i64,
) -> Result<ReplyTarget, PipelineError> {
    let mut thread = scope
        .threads()?
        .get_with_comments(thread_id)?
        .ok_or_else(|| PipelineError::NotFound(format!("thread {thread_id}")))?;
    let comments = std::mem::take(&mut thread.comments);
    if parent_id == 0 {
        return Ok(ReplyTarget {
            thread,
            parent: None,
            open: true,
        });
    }

    let tree = build_comment_tree(&comments);
    let depth = find_depth(&tree, parent_id)
        .ok_or_else(|| PipelineError::NotFound(format!("comment {parent_id}")))?;
    let parent = comments.into_iter().find(|c| c.id == parent_id);
    Ok(ReplyTarget {
        thread,
        parent,
        open: can_reply(depth, scope.config().comment_max_depth),
    })
}

/// `GET|POST /reply`
pub fn reply(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let user = require_user(scope)?;
    let subject = scope.csrf_subject();

    if scope.request().method != Method::POST {
        let query = scope.request().query();
        let thread_id = query_id(scope, "thread_id")?;
        let parent_id = query.int("parent_id").unwrap_or(0);
        let goto = query
            .get("goto")
            .map(str::to_string)
            .unwrap_or_else(|| format!("/item?id={thread_id}"));

        let target = reply_target(scope, thread_id, parent_id)?;
        if !target.open {
            return too_deep(scope);
        }
        let csrf = scope.csrf()?.generate(&subject, COMMENT_ACTION);
        return scope.render(&View::Reply {
            thread: target.thread,
            parent: target.parent,
            form: CommentForm {
                thread_id,
                parent_id,
                goto,
                csrf,
                ..CommentForm::default()
            },
        });
    }

    let mut form = CommentForm::from_fields(&scope.request().form());
    let validation = validate_comment(&mut form, &mut scope.csrf()?, &subject);
    let target = reply_target(scope, form.thread_id, form.parent_id)?;
    if !target.open {
        return too_deep(scope);
    }
    if validation.is_err() {
        scope.set_status(StatusCode::BAD_REQUEST);
        return scope.render(&View::Reply {
            thread: target.thread,
            parent: target.parent,
            form,
        });
    }

    let comment = scope.comments()?.create(form.to_new_comment(user.id))?;
    tracing::info!(
        comment_id = comment.id,
        thread_id = comment.thread_id,
        author_id = user.id,
        "comment created"
    );
    scope.redirect(&format!("{}#{}", form.goto, comment.id), StatusCode::FOUND)
}

fn too_deep(scope: &mut RequestScope) -> Result<(), PipelineError> {
    scope.set_status(StatusCode::BAD_REQUEST);
    scope.render(&View::Error {
        status: StatusCode::BAD_REQUEST.as_u16(),
        message: "This comment cannot receive more replies".to_string(),
    })
}
