use std::sync::Arc;

use axum::http::{
    header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
    HeaderName, HeaderValue, StatusCode,
};

use agora_auth::{build_session_cookie, session_id_from_headers, CsrfGuard, SessionCsrf};
use agora_core::{
    forum::User,
    storage::{CommentRepository, ThreadRepository, UserRepository},
};

use crate::{
    config::Config,
    error::PipelineError,
    pipeline::{Request, ResponseSink},
    state::AppState,
    views::{TemplateEnvironment, TemplateRenderer, View},
};

use super::{RequestId, Session};

/// Request-scoped dependency container.
///
/// One instance serves exactly one request and is never shared. Every
/// capability is resolved on first access and the same instance is returned
/// for the rest of the request.
pub struct RequestScope {
    state: AppState,
    request: Request,
    response: ResponseSink,
    request_id: RequestId,
    current_user: Option<User>,

    session: Option<Session>,
    csrf: Option<CsrfGuard>,
    templates: Option<Box<dyn TemplateRenderer>>,
    users: Option<Arc<dyn UserRepository>>,
    threads: Option<Arc<dyn ThreadRepository>>,
    comments: Option<Arc<dyn CommentRepository>>,
}

impl RequestScope {
    pub fn new(state: AppState, request: Request) -> Self {
        let request_id = RequestId::from_headers(&request.headers);
        Self {
            state,
            request,
            response: ResponseSink::new(),
            request_id,
            current_user: None,
            session: None,
            csrf: None,
            templates: None,
            users: None,
            threads: None,
            comments: None,
        }
    }

    // ========================================================================
    // Request data
    // ========================================================================

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn response(&self) -> &ResponseSink {
        &self.response
    }

    pub(crate) fn into_sink(self) -> ResponseSink {
        self.response
    }

    // ========================================================================
    // Current user
    // ========================================================================

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Sets the authenticated user. A user can be set once per request.
    pub fn set_current_user(&mut self, user: User) -> Result<(), PipelineError> {
        if let Some(existing) = &self.current_user {
            return Err(PipelineError::Internal(format!(
                "current user already set to {}",
                existing.id
            )));
        }
        self.current_user = Some(user);
        Ok(())
    }

    /// Forgets the authenticated user, as on logout.
    pub fn clear_current_user(&mut self) -> Option<User> {
        self.current_user.take()
    }

    /// Subject CSRF tokens are bound to: the user when signed in, otherwise
    /// the client address.
    pub fn csrf_subject(&self) -> String {
        match &self.current_user {
            Some(user) => format!("user:{}", user.id),
            None => format!(
                "addr:{}",
                self.request.client_ip().unwrap_or_else(|| "unknown".to_string())
            ),
        }
    }

    // ========================================================================
    // Lazily resolved capabilities
    // ========================================================================

    /// The session, loaded from the store through the session cookie.
    ///
    /// A missing cookie, or a cookie naming an unknown or expired session,
    /// yields a fresh session.
    pub fn session(&mut self) -> Result<&mut Session, PipelineError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.load_session()?,
        };
        Ok(self.session.insert(session))
    }

    fn load_session(&self) -> Result<Session, PipelineError> {
        let cookie_name = &self.state.session_config.cookie_name;
        if let Some(id) = session_id_from_headers(&self.request.headers, cookie_name) {
            if let Some(data) = self.state.sessions.load(&id)? {
                tracing::trace!(session_id = %id, "session loaded");
                return Ok(Session::existing(id, data));
            }
        }
        Ok(Session::fresh())
    }

    /// CSRF generator bound to this request's session.
    pub fn csrf(&mut self) -> Result<SessionCsrf<'_>, PipelineError> {
        self.session()?;
        let guard = self.csrf.get_or_insert_with(|| {
            CsrfGuard::new(
                self.state.config.secret.clone(),
                self.state.session_config.csrf_ttl(),
            )
        });
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PipelineError::Internal("session not loaded".to_string()))?;
        Ok(guard.bind(session))
    }

    /// The template renderer, created with the site-wide environment.
    pub fn templates(&mut self) -> Result<&mut dyn TemplateRenderer, PipelineError> {
        let renderer = match self.templates.take() {
            Some(renderer) => renderer,
            None => self
                .state
                .templates
                .create(TemplateEnvironment::base(&self.state.config))?,
        };
        Ok(&mut **self.templates.insert(renderer))
    }

    pub fn users(&mut self) -> Result<Arc<dyn UserRepository>, PipelineError> {
        let repositories = &self.state.repositories;
        Ok(Arc::clone(
            self.users.get_or_insert_with(|| repositories.users()),
        ))
    }

    pub fn threads(&mut self) -> Result<Arc<dyn ThreadRepository>, PipelineError> {
        let repositories = &self.state.repositories;
        Ok(Arc::clone(
            self.threads.get_or_insert_with(|| repositories.threads()),
        ))
    }

    pub fn comments(&mut self) -> Result<Arc<dyn CommentRepository>, PipelineError> {
        let repositories = &self.state.repositories;
        Ok(Arc::clone(
            self.comments.get_or_insert_with(|| repositories.comments()),
        ))
    }

    // ========================================================================
    // Response
    // ========================================================================

    pub fn set_status(&mut self, status: StatusCode) -> bool {
        self.response.set_status(status)
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        self.response.set_header(name, value)
    }

    /// Writes body bytes.
    ///
    /// The first write persists the session and attaches its cookie while
    /// headers can still change.
    pub fn write(&mut self, bytes: &[u8]) {
        if !self.response.is_written() {
            self.persist_session();
        }
        self.response.write_body(bytes);
    }

    fn persist_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.needs_saving() {
            return;
        }

        if let Some(previous) = session.take_rotated() {
            if let Err(err) = self.state.sessions.delete(&previous) {
                tracing::warn!(error = %err, "failed to delete rotated session");
            }
        }

        let ttl = self.state.session_config.session_ttl();
        if let Err(err) = self.state.sessions.save(session.id(), session.data(), ttl) {
            tracing::error!(error = %err, "failed to persist session");
            return;
        }

        let cookie = build_session_cookie(
            &self.state.session_config,
            session.id(),
            self.request.host(),
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                self.response.append_header(SET_COOKIE, value);
            }
            Err(err) => tracing::error!(error = %err, "invalid session cookie"),
        }
    }

    /// Renders a view as an HTML page with the current status.
    pub fn render(&mut self, view: &View) -> Result<(), PipelineError> {
        let html = self.templates()?.render(view)?;
        self.set_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.write(html.as_bytes());
        Ok(())
    }

    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Result<(), PipelineError> {
        let value = HeaderValue::from_str(location)
            .map_err(|err| PipelineError::Internal(format!("invalid redirect target: {err}")))?;
        self.set_status(status);
        self.set_header(LOCATION, value);
        self.write(&[]);
        Ok(())
    }

    /// Renders an error that reached the pipeline boundary.
    ///
    /// Before anything is written this is a full error page, with a plain
    /// text page as fallback when the templates fail too. After the first
    /// write only a plain text line is appended.
    pub fn fail(&mut self, err: &PipelineError) {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %err, status = status.as_u16(), "request failed");
        }

        let message = err.public_message(self.config().debug);
        if self.response.is_written() {
            self.write(format!("\n{message}\n").as_bytes());
            return;
        }

        self.set_status(status);
        let view = View::Error {
            status: status.as_u16(),
            message: message.clone(),
        };
        if let Err(render_err) = self.render(&view) {
            tracing::error!(error = %render_err, "failed to render error page");
            self.set_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            self.write(message.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{
        auth::{CsrfGenerator, SessionData, SessionId},
        forum::NewUser,
    };
    use axum::http::{header::COOKIE, Method, Uri};

    use crate::views::{TemplateError, TemplateProvider};

    fn scope_for(request: Request) -> RequestScope {
        RequestScope::new(AppState::for_tests(), request)
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path.parse::<Uri>().unwrap())
    }

    fn user(id: i64) -> User {
        let now = chrono::Utc::now();
        User {
            id,
            username: format!("user{id}"),
            password_hash: String::new(),
            email: format!("user{id}@example.com"),
            created: now,
            updated: now,
            karma: 1,
        }
    }

    // ==================== Memoization ====================

    #[test]
    fn test_session_is_resolved_once() {
        let mut scope = scope_for(get("/"));

        let first = scope.session().unwrap() as *const Session;
        let second = scope.session().unwrap() as *const Session;
        assert_eq!(first, second);

        scope.session().unwrap().set_user_id(3);
        assert_eq!(scope.session().unwrap().user_id(), Some(3));
    }

    #[test]
    fn test_repositories_are_memoized_per_request() {
        let state = AppState::for_tests();
        let mut first = RequestScope::new(state.clone(), get("/"));
        let mut second = RequestScope::new(state, get("/"));

        let a = first.users().unwrap();
        let b = first.users().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&first.threads().unwrap(), &first.threads().unwrap()));
        assert!(Arc::ptr_eq(
            &first.comments().unwrap(),
            &first.comments().unwrap()
        ));

        let other = second.users().unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_templates_are_memoized() {
        let mut scope = scope_for(get("/"));
        scope.templates().unwrap().set_environment(TemplateEnvironment {
            title: "custom".to_string(),
            ..TemplateEnvironment::default()
        });
        assert_eq!(scope.templates().unwrap().environment().title, "custom");
    }

    #[test]
    fn test_session_loaded_from_cookie() {
        let state = AppState::for_tests();
        let id = SessionId::new("known-session".to_string());
        let mut data = SessionData::new();
        data.set_user_id(12);
        state
            .sessions
            .save(&id, &data, state.session_config.session_ttl())
            .unwrap();

        let request = get("/").with_header(COOKIE, "agora=known-session");
        let mut scope = RequestScope::new(state, request);

        let session = scope.session().unwrap();
        assert!(!session.is_fresh());
        assert_eq!(session.id(), &id);
        assert_eq!(session.user_id(), Some(12));
    }

    #[test]
    fn test_unknown_cookie_gets_fresh_session() {
        let request = get("/").with_header(COOKIE, "agora=forged");
        let mut scope = scope_for(request);

        let session = scope.session().unwrap();
        assert!(session.is_fresh());
        assert_ne!(session.id().as_str(), "forged");
    }

    // ==================== Current user ====================

    #[test]
    fn test_current_user_set_once() {
        let mut scope = scope_for(get("/"));
        assert!(scope.current_user().is_none());

        scope.set_current_user(user(1)).unwrap();
        assert!(scope.set_current_user(user(2)).is_err());
        assert_eq!(scope.current_user().map(|u| u.id), Some(1));

        assert_eq!(scope.clear_current_user().map(|u| u.id), Some(1));
        scope.set_current_user(user(2)).unwrap();
        assert_eq!(scope.current_user().map(|u| u.id), Some(2));
    }

    #[test]
    fn test_csrf_subject() {
        let request = get("/").with_remote_addr("192.168.1.9:5000".parse().unwrap());
        let mut scope = scope_for(request);
        assert_eq!(scope.csrf_subject(), "addr:192.168.1.9");

        scope.set_current_user(user(5)).unwrap();
        assert_eq!(scope.csrf_subject(), "user:5");
    }

    // ==================== CSRF ====================

    #[test]
    fn test_csrf_tokens_live_in_the_session() {
        let mut scope = scope_for(get("/"));

        let token = scope.csrf().unwrap().generate("addr:1", "login");
        assert!(scope.session().unwrap().contains("csrf.login"));

        assert!(!scope.csrf().unwrap().valid(&token, "addr:2", "login"));
        let token = scope.csrf().unwrap().generate("addr:1", "login");
        assert!(scope.csrf().unwrap().valid(&token, "addr:1", "login"));
        assert!(!scope.csrf().unwrap().valid(&token, "addr:1", "login"));
    }

    // ==================== Response ====================

    #[test]
    fn test_first_write_persists_session_once() {
        let state = AppState::for_tests();
        let mut scope = RequestScope::new(
            state.clone(),
            get("/").with_header(axum::http::header::HOST, "forum.example.com:3000"),
        );
        scope.session().unwrap().set_user_id(8);

        scope.write(b"hello");
        let id = scope.session().unwrap().id().clone();
        scope.session().unwrap().set_user_id(9);
        scope.write(b" world");

        let stored = state.sessions.load(&id).unwrap().unwrap();
        assert_eq!(stored.user_id(), Some(8));

        let cookies: Vec<_> = scope.response().headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        let cookie = cookies[0].to_str().unwrap();
        assert!(cookie.starts_with(&format!("agora={}", id.as_str())));
        assert!(cookie.contains("Domain=forum.example.com"));
    }

    #[test]
    fn test_untouched_session_sets_no_cookie() {
        let mut scope = scope_for(get("/"));
        scope.session().unwrap();
        scope.write(b"hi");
        assert!(scope.response().headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_rotation_deletes_previous_session() {
        let state = AppState::for_tests();
        let old = SessionId::new("before-login".to_string());
        let mut data = SessionData::new();
        data.set_user_id(1);
        state
            .sessions
            .save(&old, &data, state.session_config.session_ttl())
            .unwrap();

        let mut scope = RequestScope::new(
            state.clone(),
            get("/").with_header(COOKIE, "agora=before-login"),
        );
        scope.session().unwrap().rotate();
        scope.write(b"");

        assert!(state.sessions.load(&old).unwrap().is_none());
        let new_id = scope.session().unwrap().id().clone();
        assert!(state.sessions.load(&new_id).unwrap().is_some());
    }

    /// Loads nothing and refuses every save.
    struct FailingSessions;

    impl agora_core::auth::SessionStore for FailingSessions {
        fn load(&self, _id: &SessionId) -> agora_core::auth::Result<Option<SessionData>> {
            Ok(None)
        }

        fn save(
            &self,
            _id: &SessionId,
            _data: &SessionData,
            _ttl: chrono::Duration,
        ) -> agora_core::auth::Result<()> {
            Err(agora_core::auth::AuthError::Storage("disk full".to_string()))
        }

        fn delete(&self, _id: &SessionId) -> agora_core::auth::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_session_save_still_writes_response() {
        let mut state = AppState::for_tests();
        state.sessions = Arc::new(FailingSessions);
        let mut scope = RequestScope::new(state, get("/"));
        scope.session().unwrap().set_user_id(4);
        scope.set_status(StatusCode::CREATED);

        scope.write(b"hello");

        let response = scope.into_sink();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body(), b"hello");
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_redirect() {
        let mut scope = scope_for(get("/"));
        scope.redirect("/item?id=3#12", StatusCode::FOUND).unwrap();

        let response = scope.into_sink();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/item?id=3#12");
        assert!(response.is_written());
    }

    #[test]
    fn test_fail_renders_error_page() {
        let mut scope = scope_for(get("/"));
        scope.fail(&PipelineError::Internal("secret detail".to_string()));

        let response = scope.into_sink();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8_lossy(response.body());
        assert!(body.contains("<html"));
        assert!(body.contains("Internal Server Error"));
        assert!(!body.contains("secret detail"));
    }

    #[test]
    fn test_fail_shows_detail_in_debug_mode() {
        let state = AppState::for_tests_with(Config {
            debug: true,
            ..Config::from_env()
        });
        let mut scope = RequestScope::new(state, get("/"));
        scope.fail(&PipelineError::Internal("secret detail".to_string()));

        let body = String::from_utf8_lossy(scope.response().body()).into_owned();
        assert!(body.contains("secret detail"));
    }

    #[test]
    fn test_fail_after_write_appends_plain_text() {
        let mut scope = scope_for(get("/"));
        scope.set_status(StatusCode::OK);
        scope.write(b"<html><body>half a page");
        assert!(scope.response().is_written());

        scope.fail(&PipelineError::Internal("boom".to_string()));

        let response = scope.into_sink();
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(response.body());
        assert_eq!(body.matches("<html").count(), 1);
        assert!(body.ends_with("\nInternal Server Error\n"));
    }

    struct BrokenTemplates;

    impl TemplateProvider for BrokenTemplates {
        fn create(
            &self,
            _env: TemplateEnvironment,
        ) -> Result<Box<dyn TemplateRenderer>, TemplateError> {
            Err(TemplateError::Render {
                view: "error",
                message: "templates missing".to_string(),
            })
        }
    }

    #[test]
    fn test_fail_without_templates_uses_plain_text() {
        let mut state = AppState::for_tests();
        state.templates = Arc::new(BrokenTemplates);
        let mut scope = RequestScope::new(state, get("/"));

        scope.fail(&PipelineError::NotFound("/nowhere".to_string()));

        let response = scope.into_sink();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.body(), b"Not Found");
    }

    #[test]
    fn test_repositories_share_backend_across_requests() {
        let state = AppState::for_tests();
        let mut first = RequestScope::new(state.clone(), get("/"));
        first
            .users()
            .unwrap()
            .create(NewUser {
                username: "shared".to_string(),
                email: "shared@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .unwrap();

        let mut second = RequestScope::new(state, get("/"));
        assert!(second
            .users()
            .unwrap()
            .get_by_username("shared")
            .unwrap()
            .is_some());
    }
}
