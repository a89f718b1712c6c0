//! Page views and the template renderer capability.
//!
//! Controllers describe *what* to show with a [`View`]; a [`TemplateRenderer`]
//! turns it into HTML using the per-request [`TemplateEnvironment`].

mod html;

use agora_core::auth::Flash;
use agora_core::forum::{Comment, CommentNode, Thread, User};
use agora_core::validation::{CommentForm, LoginForm, RegistrationForm, SubmissionForm};
use thiserror::Error;

use crate::config::Config;

pub use html::{AskamaProvider, AskamaRenderer};

/// Values every page can use, injected once per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateEnvironment {
    pub title: String,
    pub slogan: String,
    pub description: String,
    pub debug: bool,
    pub comment_max_depth: usize,
    pub current_user: Option<User>,
    pub flashes: Vec<Flash>,
    /// Dump of the current request, only filled in debug mode.
    pub request_dump: Option<String>,
}

impl TemplateEnvironment {
    /// Site-wide values only, no user or flashes.
    pub fn base(config: &Config) -> Self {
        Self {
            title: config.title.clone(),
            slogan: config.slogan.clone(),
            description: config.description.clone(),
            debug: config.debug,
            comment_max_depth: config.comment_max_depth,
            ..Self::default()
        }
    }
}

/// Link to the next page of a listing, if there is one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of rows on earlier pages, used to number the rows.
    pub offset: usize,
    pub next_href: Option<String>,
}

/// A page to render.
#[derive(Debug, Clone)]
pub enum View {
    ThreadList {
        heading: String,
        threads: Vec<Thread>,
        pagination: Pagination,
    },
    ThreadShow {
        thread: Thread,
        tree: Vec<CommentNode>,
        /// Top-level comment form, only for signed in users.
        comment_form: Option<CommentForm>,
    },
    CommentList {
        heading: String,
        comments: Vec<Comment>,
        pagination: Pagination,
    },
    Login {
        login: LoginForm,
        registration: RegistrationForm,
        error: Option<String>,
    },
    Submit {
        form: SubmissionForm,
    },
    Reply {
        thread: Thread,
        parent: Option<Comment>,
        form: CommentForm,
    },
    UserProfile {
        user: User,
    },
    Error {
        status: u16,
        message: String,
    },
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ThreadList { .. } => "thread_list",
            Self::ThreadShow { .. } => "thread_show",
            Self::CommentList { .. } => "comment_list",
            Self::Login { .. } => "login",
            Self::Submit { .. } => "submit",
            Self::Reply { .. } => "reply",
            Self::UserProfile { .. } => "user_profile",
            Self::Error { .. } => "error",
        }
    }
}

/// Errors from building or running templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to render {view}: {message}")]
    Render { view: &'static str, message: String },
}

/// Renders views with an environment set once per request.
pub trait TemplateRenderer {
    fn environment(&self) -> &TemplateEnvironment;

    fn set_environment(&mut self, env: TemplateEnvironment);

    fn render(&self, view: &View) -> Result<String, TemplateError>;
}

/// Creates one renderer per request.
pub trait TemplateProvider: Send + Sync {
    fn create(&self, env: TemplateEnvironment) -> Result<Box<dyn TemplateRenderer>, TemplateError>;
}
