//! Thread listings, the thread page and story submission.

use axum::http::{Method, StatusCode};

use agora_core::{
    auth::{CsrfGenerator, FlashKind},
    forum::build_comment_tree,
    validation::{validate_submission, CommentForm, SubmissionForm, COMMENT_ACTION, SUBMISSION_ACTION},
};

use crate::{context::RequestScope, error::PipelineError, pipeline::Next, views::View};

use super::{page, paginate, query_id, require_user, window};

/// `GET /`: threads by score.
pub fn index(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let page = page(scope);
    let per_page = scope.config().threads_per_page;
    let (limit, offset) = window(page, per_page);
    let rows = scope.threads()?.list_by_score(limit, offset)?;
    let (threads, pagination) = paginate(rows, page, per_page, |p| format!("/?p={p}"));
    scope.render(&View::ThreadList {
        heading: String::new(),
        threads,
        pagination,
    })
}

/// `GET /newest`
pub fn newest(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let page = page(scope);
    let per_page = scope.config().threads_per_page;
    let (limit, offset) = window(page, per_page);
    let rows = scope.threads()?.list_newest(limit, offset)?;
    let (threads, pagination) = paginate(rows, page, per_page, |p| format!("/newest?p={p}"));
    scope.render(&View::ThreadList {
        heading: String::new(),
        threads,
        pagination,
    })
}

/// `GET /from?site=`: threads linking to a site.
pub fn from(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let site = scope.request().query().text("site");
    let site = site.trim();
    if site.is_empty() {
        return Err(PipelineError::NotFound("missing `site`".to_string()));
    }
    let threads = scope.threads()?.list_by_url_like(site)?;
    scope.render(&View::ThreadList {
        heading: format!("Stories from {site}"),
        threads,
        pagination: Default::default(),
    })
}

/// `GET /submitted?id=`: threads submitted by a user.
pub fn submitted(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let id = query_id(scope, "id")?;
    let user = scope
        .users()?
        .get_by_id(id)?
        .ok_or_else(|| PipelineError::NotFound(format!("user {id}")))?;
    let threads = scope.threads()?.list_by_author(user.id)?;
    scope.render(&View::ThreadList {
        heading: format!("{}'s submissions", user.username),
        threads,
        pagination: Default::default(),
    })
}

/// `GET /item?id=`: a thread with its comment tree.
pub fn item(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let id = query_id(scope, "id")?;
    let mut thread = scope
        .threads()?
        .get_with_comments(id)?
        .ok_or_else(|| PipelineError::NotFound(format!("thread {id}")))?;
    let tree = build_comment_tree(&thread.comments);
    thread.comments.clear();

    let comment_form = if scope.current_user().is_some() {
        let subject = scope.csrf_subject();
        let csrf = scope.csrf()?.generate(&subject, COMMENT_ACTION);
        Some(CommentForm {
            thread_id: thread.id,
            goto: format!("/item?id={}", thread.id),
            csrf,
            ..CommentForm::default()
        })
    } else {
        None
    };

    scope.render(&View::ThreadShow {
        thread,
        tree,
        comment_form,
    })
}

/// `GET|POST /submit`
pub fn submit(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let user = require_user(scope)?;
    let subject = scope.csrf_subject();

    if scope.request().method != Method::POST {
        let csrf = scope.csrf()?.generate(&subject, SUBMISSION_ACTION);
        return scope.render(&View::Submit {
            form: SubmissionForm {
                csrf,
                ..SubmissionForm::default()
            },
        });
    }

    let mut form = SubmissionForm::from_fields(&scope.request().form());
    let validation = validate_submission(&mut form, &mut scope.csrf()?, &subject);
    if validation.is_err() {
        scope.set_status(StatusCode::BAD_REQUEST);
        return scope.render(&View::Submit { form });
    }

    let thread = scope.threads()?.create(form.to_new_thread(user.id))?;
    tracing::info!(thread_id = thread.id, author_id = user.id, "thread created");
    scope
        .session()?
        .add_flash(FlashKind::Success, "Story successfully created!");
    scope.redirect(&format!("/item?id={}", thread.id), StatusCode::FOUND)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{get, html, location, post, Fixture};
    use super::*;
    use crate::config::Config;

    // ==================== Listings ====================

    #[test]
    fn test_index_lists_threads() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        fx.thread(&alice, "First story");
        fx.thread(&alice, "Second story");

        let response = fx.routes.index.handle(get("/", None));

        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("First story"));
        assert!(page.contains("Second story"));
        assert!(!page.contains("class=\"more\""));
    }

    #[test]
    fn test_newest_is_paginated() {
        let fx = Fixture::with_config(Config {
            threads_per_page: 2,
            debug: false,
            secret: "test-secret".to_string(),
            ..Config::from_env()
        });
        let alice = fx.user("alice", "hunter22");
        for title in ["Story one", "Story two", "Story three"] {
            fx.thread(&alice, title);
        }

        let first = html(&fx.routes.newest.handle(get("/newest", None)));
        assert_eq!(first.matches("<li class=\"thread\"").count(), 2);
        assert!(first.contains("class=\"more\""));
        assert!(first.contains("p=2"));

        let second = html(&fx.routes.newest.handle(get("/newest?p=2", None)));
        assert_eq!(second.matches("<li class=\"thread\"").count(), 1);
        assert!(second.contains("3."));
        assert!(!second.contains("class=\"more\""));
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        fx.thread(&alice, "First story");

        let response = fx
            .routes
            .newest
            .handle(get("/newest?p=9223372036854775807", None));
        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert_eq!(page.matches("<li class=\"thread\"").count(), 0);
        assert!(!page.contains("class=\"more\""));

        let response = fx.routes.index.handle(get("/?p=9223372036854775807", None));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!html(&response).contains("First story"));
    }

    #[test]
    fn test_from_site() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        fx.thread(&alice, "Linked story");

        let response = fx.routes.from.handle(get("/from?site=example.com", None));
        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("Stories from example.com"));
        assert!(page.contains("Linked story"));

        let response = fx.routes.from.handle(get("/from", None));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_submitted_by_user() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let bob = fx.user("bob", "hunter22");
        fx.thread(&alice, "Alice writes");
        fx.thread(&bob, "Bob writes");

        let response = fx
            .routes
            .submitted
            .handle(get(&format!("/submitted?id={}", bob.id), None));

        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("Bob writes"));
        assert!(!page.contains("Alice writes"));
    }

    // ==================== Item ====================

    #[test]
    fn test_item_shows_comment_tree() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let thread = fx.thread(&alice, "First story");
        let top = fx.comment(&alice, thread.id, 0);
        fx.comment(&alice, thread.id, top.id);

        let response = fx
            .routes
            .item
            .handle(get(&format!("/item?id={}", thread.id), None));

        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("First story"));
        assert_eq!(page.matches("class=\"comment\"").count(), 2);
        assert!(page.contains("margin-left: 40px"));
        assert!(!page.contains("class=\"comment-form\""));
    }

    #[test]
    fn test_item_offers_comment_form_when_signed_in() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let thread = fx.thread(&alice, "First story");
        let cookie = fx.sign_in(&alice);

        let response = fx
            .routes
            .item
            .handle(get(&format!("/item?id={}", thread.id), Some(&cookie)));

        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("class=\"comment-form\""));
        assert!(page.contains("name=\"csrf\""));
    }

    // ==================== Submit ====================

    #[test]
    fn test_submit_creates_thread() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let cookie = fx.sign_in(&alice);
        let token = fx.token(&cookie, &format!("user:{}", alice.id), SUBMISSION_ACTION);

        let response = fx.routes.submit.handle(post(
            "/submit",
            &cookie,
            &format!("title=A+story+worth+reading&url=https%3A%2F%2Fexample.org&content=&csrf={token}"),
        ));

        assert_eq!(response.status(), StatusCode::FOUND);
        let threads = fx
            .state
            .repositories
            .threads()
            .list_by_author(alice.id)
            .unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title, "A story worth reading");
        assert_eq!(location(&response), format!("/item?id={}", threads[0].id));

        let page = html(&fx.routes.item.handle(get(location(&response), Some(&cookie))));
        assert!(page.contains("Story successfully created!"));
    }

    #[test]
    fn test_submit_with_invalid_input_rerenders_form() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let cookie = fx.sign_in(&alice);

        let response = fx.routes.submit.handle(post(
            "/submit",
            &cookie,
            "title=&url=&content=&csrf=forged",
        ));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let page = html(&response);
        assert!(page.contains("CSRF: invalid token"));
        assert!(page.contains("Title"));
        assert!(fx
            .state
            .repositories
            .threads()
            .list_by_author(alice.id)
            .unwrap()
            .is_empty());
    }
}
