//! Askama-backed [`TemplateRenderer`].
//!
//! Each view is mapped to a page struct of plain display values, so the
//! templates only need loops, conditions and escaping.

use askama::Template;
use chrono::{DateTime, Utc};

use agora_core::forum::{can_reply, flatten_tree, Comment, Thread};
use agora_core::validation::{CommentForm, ValidationErrors};

use super::{
    Pagination, TemplateEnvironment, TemplateError, TemplateProvider, TemplateRenderer, View,
};

/// Hands out an [`AskamaRenderer`] per request. Templates are compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskamaProvider;

impl TemplateProvider for AskamaProvider {
    fn create(&self, env: TemplateEnvironment) -> Result<Box<dyn TemplateRenderer>, TemplateError> {
        Ok(Box::new(AskamaRenderer::new(env)))
    }
}

#[derive(Debug, Clone)]
pub struct AskamaRenderer {
    env: TemplateEnvironment,
}

impl AskamaRenderer {
    pub fn new(env: TemplateEnvironment) -> Self {
        Self { env }
    }

    fn layout(&self) -> Layout {
        let env = &self.env;
        let user = env.current_user.as_ref();
        Layout {
            title: env.title.clone(),
            slogan: env.slogan.clone(),
            description: env.description.clone(),
            logged_in: user.is_some(),
            user_id: user.map(|u| u.id).unwrap_or_default(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            karma: user.map(|u| u.karma).unwrap_or_default(),
            flashes: env
                .flashes
                .iter()
                .map(|f| FlashRow {
                    kind: f.kind.as_str(),
                    message: f.message.clone(),
                })
                .collect(),
            request_dump: env.request_dump.clone().unwrap_or_default(),
        }
    }
}

impl TemplateRenderer for AskamaRenderer {
    fn environment(&self) -> &TemplateEnvironment {
        &self.env
    }

    fn set_environment(&mut self, env: TemplateEnvironment) {
        self.env = env;
    }

    fn render(&self, view: &View) -> Result<String, TemplateError> {
        let layout = self.layout();
        let now = Utc::now();
        let rendered = match view {
            View::ThreadList {
                heading,
                threads,
                pagination,
            } => ThreadListPage {
                layout: &layout,
                heading,
                rows: thread_rows(threads, pagination, now),
                next_href: next_href(pagination),
            }
            .render(),
            View::ThreadShow {
                thread,
                tree,
                comment_form,
            } => {
                let max_depth = self.env.comment_max_depth;
                let comments = flatten_tree(tree)
                    .into_iter()
                    .map(|(comment, depth)| CommentRow::new(comment, depth, max_depth, now))
                    .collect();
                ThreadShowPage {
                    layout: &layout,
                    thread: ThreadRow::new(thread, 1, now),
                    text: thread.content.clone().unwrap_or_default(),
                    comments,
                    form: comment_form.as_ref().map(CommentFormRow::from).unwrap_or_default(),
                    can_comment: comment_form.is_some(),
                }
                .render()
            }
            View::CommentList {
                heading,
                comments,
                pagination,
            } => CommentListPage {
                layout: &layout,
                heading,
                comments: comments
                    .iter()
                    .map(|c| CommentRow::new(c, 0, 0, now))
                    .collect(),
                next_href: next_href(pagination),
            }
            .render(),
            View::Login {
                login,
                registration,
                error,
            } => LoginPage {
                layout: &layout,
                error: error.as_deref().unwrap_or_default(),
                login_username: &login.username,
                login_csrf: &login.csrf,
                login_errors: messages(&login.errors),
                registration_username: &registration.username,
                registration_email: &registration.email,
                registration_csrf: &registration.csrf,
                registration_errors: messages(&registration.errors),
            }
            .render(),
            View::Submit { form } => SubmitPage {
                layout: &layout,
                title: &form.title,
                url: &form.url,
                content: &form.content,
                csrf: &form.csrf,
                errors: messages(&form.errors),
            }
            .render(),
            View::Reply {
                thread,
                parent,
                form,
            } => ReplyPage {
                layout: &layout,
                thread: ThreadRow::new(thread, 1, now),
                has_parent: parent.is_some(),
                parent: parent
                    .as_ref()
                    .map(|p| CommentRow::new(p, 0, 0, now))
                    .unwrap_or_default(),
                form: CommentFormRow::from(form),
            }
            .render(),
            View::UserProfile { user } => UserProfilePage {
                layout: &layout,
                user_id: user.id,
                username: &user.username,
                karma: user.karma,
                created: user.created.format("%Y-%m-%d").to_string(),
            }
            .render(),
            View::Error { status, message } => ErrorPage {
                layout: &layout,
                status: *status,
                message,
            }
            .render(),
        };

        rendered.map_err(|err| TemplateError::Render {
            view: view.name(),
            message: err.to_string(),
        })
    }
}

// ============================================================================
// Display rows
// ============================================================================

struct FlashRow {
    kind: &'static str,
    message: String,
}

struct Layout {
    title: String,
    slogan: String,
    description: String,
    logged_in: bool,
    user_id: i64,
    username: String,
    karma: i64,
    flashes: Vec<FlashRow>,
    request_dump: String,
}

struct ThreadRow {
    rank: usize,
    id: i64,
    title: String,
    href: String,
    host: String,
    author_id: i64,
    author_name: String,
    score: i64,
    comment_count: i64,
    age: String,
}

impl ThreadRow {
    fn new(thread: &Thread, rank: usize, now: DateTime<Utc>) -> Self {
        Self {
            rank,
            id: thread.id,
            title: thread.title.clone(),
            href: thread
                .url
                .clone()
                .unwrap_or_else(|| format!("/item?id={}", thread.id)),
            host: thread.host().unwrap_or_default(),
            author_id: thread.author_id,
            author_name: thread.author_name.clone(),
            score: thread.score,
            comment_count: thread.comment_count,
            age: age(thread.created, now),
        }
    }
}

#[derive(Default)]
struct CommentRow {
    id: i64,
    thread_id: i64,
    thread_title: String,
    author_id: i64,
    author_name: String,
    content: String,
    score: i64,
    age: String,
    indent: usize,
    can_reply: bool,
    reply_href: String,
}

impl CommentRow {
    fn new(comment: &Comment, depth: usize, max_depth: usize, now: DateTime<Utc>) -> Self {
        let goto = format!("/item?id={}", comment.thread_id);
        Self {
            id: comment.id,
            thread_id: comment.thread_id,
            thread_title: comment.thread_title.clone(),
            author_id: comment.author_id,
            author_name: comment.author_name.clone(),
            content: comment.content.clone(),
            score: comment.score,
            age: age(comment.created, now),
            indent: depth * 40,
            can_reply: can_reply(depth, max_depth),
            reply_href: format!(
                "/reply?thread_id={}&parent_id={}&goto={}",
                comment.thread_id,
                comment.id,
                urlencoding::encode(&goto)
            ),
        }
    }
}

#[derive(Default)]
struct CommentFormRow {
    thread_id: i64,
    parent_id: i64,
    goto: String,
    content: String,
    csrf: String,
    errors: Vec<String>,
}

impl From<&CommentForm> for CommentFormRow {
    fn from(form: &CommentForm) -> Self {
        Self {
            thread_id: form.thread_id,
            parent_id: form.parent_id,
            goto: form.goto.clone(),
            content: form.content.clone(),
            csrf: form.csrf.clone(),
            errors: messages(&form.errors),
        }
    }
}

fn thread_rows(threads: &[Thread], pagination: &Pagination, now: DateTime<Utc>) -> Vec<ThreadRow> {
    threads
        .iter()
        .enumerate()
        .map(|(i, thread)| ThreadRow::new(thread, pagination.offset + i + 1, now))
        .collect()
}

fn next_href(pagination: &Pagination) -> &str {
    pagination.next_href.as_deref().unwrap_or_default()
}

fn messages(errors: &ValidationErrors) -> Vec<String> {
    errors.messages()
}

/// Coarse relative age, e.g. "3 hours ago".
fn age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created).num_seconds().max(0);
    let (amount, unit) = match seconds {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s => (s / 86_400, "day"),
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

// ============================================================================
// Pages
// ============================================================================

#[derive(Template)]
#[template(path = "thread_list.html")]
struct ThreadListPage<'a> {
    layout: &'a Layout,
    heading: &'a str,
    rows: Vec<ThreadRow>,
    next_href: &'a str,
}

#[derive(Template)]
#[template(path = "thread_show.html")]
struct ThreadShowPage<'a> {
    layout: &'a Layout,
    thread: ThreadRow,
    text: String,
    comments: Vec<CommentRow>,
    form: CommentFormRow,
    can_comment: bool,
}

#[derive(Template)]
#[template(path = "comment_list.html")]
struct CommentListPage<'a> {
    layout: &'a Layout,
    heading: &'a str,
    comments: Vec<CommentRow>,
    next_href: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginPage<'a> {
    layout: &'a Layout,
    error: &'a str,
    login_username: &'a str,
    login_csrf: &'a str,
    login_errors: Vec<String>,
    registration_username: &'a str,
    registration_email: &'a str,
    registration_csrf: &'a str,
    registration_errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "submit.html")]
struct SubmitPage<'a> {
    layout: &'a Layout,
    title: &'a str,
    url: &'a str,
    content: &'a str,
    csrf: &'a str,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "reply.html")]
struct ReplyPage<'a> {
    layout: &'a Layout,
    thread: ThreadRow,
    has_parent: bool,
    parent: CommentRow,
    form: CommentFormRow,
}

#[derive(Template)]
#[template(path = "user_profile.html")]
struct UserProfilePage<'a> {
    layout: &'a Layout,
    user_id: i64,
    username: &'a str,
    karma: i64,
    created: String,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    layout: &'a Layout,
    status: u16,
    message: &'a str,
}
