//! Shared setup for controller tests.

use std::net::SocketAddr;

use agora_auth::CsrfGuard;
use agora_core::{
    auth::{CsrfGenerator, SessionData, SessionId},
    forum::{Comment, NewComment, NewThread, NewUser, Thread, User},
};
use axum::http::{header, Method, Uri};

use crate::{
    app::Routes,
    config::Config,
    pipeline::{Request, ResponseSink},
    state::AppState,
};

pub const CLIENT: &str = "127.0.0.1:50000";

pub struct Fixture {
    pub state: AppState,
    pub routes: Routes,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_state(AppState::for_tests())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_state(AppState::for_tests_with(config))
    }

    fn with_state(state: AppState) -> Self {
        let routes = Routes::new(state.clone());
        Self { state, routes }
    }

    pub fn user(&self, username: &str, password: &str) -> User {
        let password_hash = self.state.hasher.hash(password).unwrap();
        self.state
            .repositories
            .users()
            .create(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash,
            })
            .unwrap()
    }

    /// Stores a signed in session for `user` and returns its cookie.
    pub fn sign_in(&self, user: &User) -> String {
        let id = format!("session-{}", user.id);
        let mut data = SessionData::new();
        data.set_user_id(user.id);
        self.save(&id, &data);
        format!("agora={id}")
    }

    /// Mints a CSRF token into the stored session behind `cookie`.
    pub fn token(&self, cookie: &str, subject: &str, action: &str) -> String {
        let id = SessionId::new(cookie.trim_start_matches("agora=").to_string());
        let mut data = self.state.sessions.load(&id).unwrap().unwrap_or_default();
        let guard = CsrfGuard::new(
            self.state.config.secret.clone(),
            self.state.session_config.csrf_ttl(),
        );
        let token = guard.bind(&mut data).generate(subject, action);
        self.save(id.as_str(), &data);
        token
    }

    pub fn thread(&self, author: &User, title: &str) -> Thread {
        self.state
            .repositories
            .threads()
            .create(NewThread {
                title: title.to_string(),
                url: Some("https://example.com/story".to_string()),
                content: None,
                author_id: author.id,
            })
            .unwrap()
    }

    pub fn comment(&self, author: &User, thread_id: i64, parent_id: i64) -> Comment {
        self.state
            .repositories
            .comments()
            .create(NewComment {
                parent_id,
                thread_id,
                author_id: author.id,
                content: format!("reply to {parent_id} in thread {thread_id}"),
            })
            .unwrap()
    }

    fn save(&self, id: &str, data: &SessionData) {
        self.state
            .sessions
            .save(
                &SessionId::new(id.to_string()),
                data,
                self.state.session_config.session_ttl(),
            )
            .unwrap();
    }
}

fn client() -> SocketAddr {
    CLIENT.parse().unwrap()
}

pub fn get(path: &str, cookie: Option<&str>) -> Request {
    let request =
        Request::new(Method::GET, path.parse::<Uri>().unwrap()).with_remote_addr(client());
    match cookie {
        Some(cookie) => request.with_header(header::COOKIE, cookie),
        None => request,
    }
}

pub fn post(path: &str, cookie: &str, body: &str) -> Request {
    Request::new(Method::POST, path.parse::<Uri>().unwrap())
        .with_remote_addr(client())
        .with_header(header::COOKIE, cookie)
        .with_header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .with_body(body.to_string())
}

pub fn html(response: &ResponseSink) -> String {
    String::from_utf8_lossy(response.body()).into_owned()
}

pub fn location(response: &ResponseSink) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
