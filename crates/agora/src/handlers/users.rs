//! Login, registration, logout and user profiles.

use axum::http::{Method, StatusCode};

use agora_core::{
    auth::{CsrfGenerator, FlashKind},
    forum::NewUser,
    validation::{
        validate_login, validate_registration, LoginForm, RegistrationForm, LOGIN_ACTION,
        REGISTRATION_ACTION,
    },
};

use crate::{context::RequestScope, error::PipelineError, pipeline::Next, views::View};

use super::query_id;

/// Renders the login and registration forms with fresh tokens, keeping the
/// current status.
pub fn login_page(scope: &mut RequestScope) -> Result<(), PipelineError> {
    render_login(
        scope,
        LoginForm::default(),
        RegistrationForm::default(),
        None,
    )
}

/// Renders both forms, minting a token for any form that has none.
fn render_login(
    scope: &mut RequestScope,
    mut login: LoginForm,
    mut registration: RegistrationForm,
    error: Option<String>,
) -> Result<(), PipelineError> {
    let subject = scope.csrf_subject();
    {
        let mut csrf = scope.csrf()?;
        if login.csrf.is_empty() {
            login.csrf = csrf.generate(&subject, LOGIN_ACTION);
        }
        if registration.csrf.is_empty() {
            registration.csrf = csrf.generate(&subject, REGISTRATION_ACTION);
        }
    }
    login.password.clear();
    registration.password.clear();
    registration.password_confirmation.clear();
    scope.render(&View::Login {
        login,
        registration,
        error,
    })
}

/// `GET|POST /login`
pub fn login(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    if scope.request().method != Method::POST {
        return login_page(scope);
    }

    let subject = scope.csrf_subject();
    let mut form = LoginForm::from_fields(&scope.request().form());
    if validate_login(&mut form, &mut scope.csrf()?, &subject).is_err() {
        scope.set_status(StatusCode::BAD_REQUEST);
        return render_login(scope, form, RegistrationForm::default(), None);
    }

    let user = scope.users()?.get_by_username(form.username.trim())?;
    let verified = match &user {
        Some(user) => scope
            .state()
            .hasher
            .verify(&form.password, &user.password_hash)?,
        None => false,
    };
    let Some(user) = user.filter(|_| verified) else {
        tracing::info!(username = %form.username, "failed login");
        scope.set_status(StatusCode::BAD_REQUEST);
        return render_login(
            scope,
            form,
            RegistrationForm::default(),
            Some("Invalid Credentials".to_string()),
        );
    };

    let session = scope.session()?;
    session.set_user_id(user.id);
    session.rotate();
    tracing::info!(user_id = user.id, "user logged in");
    scope.redirect("/", StatusCode::FOUND)
}

/// `POST /register`
pub fn register(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let subject = scope.csrf_subject();
    let users = scope.users()?;
    let mut form = RegistrationForm::from_fields(&scope.request().form());
    let validation = validate_registration(&mut form, &mut scope.csrf()?, &subject, users.as_ref());
    if validation.is_err() {
        scope.set_status(StatusCode::BAD_REQUEST);
        return render_login(scope, LoginForm::default(), form, None);
    }

    let password_hash = scope.state().hasher.hash(&form.password)?;
    let user = users.create(NewUser {
        username: form.username,
        email: form.email,
        password_hash,
    })?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    scope
        .session()?
        .add_flash(FlashKind::Success, "Registration Successful, please login");
    scope.redirect("/login", StatusCode::FOUND)
}

/// `POST /logout`
pub fn logout(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let session = scope.session()?;
    session.clear_user_id();
    session.rotate();
    if let Some(user) = scope.clear_current_user() {
        tracing::info!(user_id = user.id, "user logged out");
    }
    scope.redirect("/", StatusCode::FOUND)
}

/// `GET /user?id=`
pub fn profile(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    let id = query_id(scope, "id")?;
    let user = scope
        .users()?
        .get_by_id(id)?
        .ok_or_else(|| PipelineError::NotFound(format!("user {id}")))?;
    scope.render(&View::UserProfile { user })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{get, html, location, post, Fixture, CLIENT};
    use super::*;
    use agora_core::auth::SessionId;
    use axum::http::header::SET_COOKIE;

    const ANONYMOUS: &str = "agora=anonymous";

    fn anonymous_subject() -> String {
        format!("addr:{}", CLIENT.split(':').next().unwrap())
    }

    /// Session id handed out by the response's `Set-Cookie` header.
    fn issued_session(response: &crate::pipeline::ResponseSink) -> SessionId {
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = cookie.split(';').next().unwrap();
        SessionId::new(pair.trim_start_matches("agora=").to_string())
    }

    // ==================== Login ====================

    #[test]
    fn test_login_page_mints_tokens_for_both_forms() {
        let fx = Fixture::new();

        let response = fx.routes.login.handle(get("/login", None));

        assert_eq!(response.status(), StatusCode::OK);
        let page = html(&response);
        assert!(page.contains("action=\"/login\""));
        assert!(page.contains("action=\"/register\""));
        assert_eq!(page.matches("name=\"csrf\"").count(), 2);

        let data = fx.state.sessions.load(&issued_session(&response)).unwrap().unwrap();
        assert!(data.contains("csrf.login"));
        assert!(data.contains("csrf.registration"));
    }

    #[test]
    fn test_login_rotates_session() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let token = fx.token(ANONYMOUS, &anonymous_subject(), LOGIN_ACTION);

        let response = fx.routes.login.handle(post(
            "/login",
            ANONYMOUS,
            &format!("username=alice&password=hunter22&csrf={token}"),
        ));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");

        let previous = SessionId::new("anonymous".to_string());
        assert!(fx.state.sessions.load(&previous).unwrap().is_none());

        let issued = issued_session(&response);
        assert_ne!(issued, previous);
        let data = fx.state.sessions.load(&issued).unwrap().unwrap();
        assert_eq!(data.user_id(), Some(alice.id));
    }

    #[test]
    fn test_login_with_wrong_password() {
        let fx = Fixture::new();
        fx.user("alice", "hunter22");
        let token = fx.token(ANONYMOUS, &anonymous_subject(), LOGIN_ACTION);

        let response = fx.routes.login.handle(post(
            "/login",
            ANONYMOUS,
            &format!("username=alice&password=wrong-password&csrf={token}"),
        ));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let page = html(&response);
        assert!(page.contains("Invalid Credentials"));
        assert!(!page.contains("wrong-password"));
        let data = fx
            .state
            .sessions
            .load(&SessionId::new("anonymous".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(data.user_id(), None);
    }

    #[test]
    fn test_login_without_token_is_rejected() {
        let fx = Fixture::new();
        fx.user("alice", "hunter22");

        let response = fx.routes.login.handle(post(
            "/login",
            ANONYMOUS,
            "username=alice&password=hunter22",
        ));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(html(&response).contains("CSRF: invalid token"));
    }

    // ==================== Registration ====================

    #[test]
    fn test_register_creates_user() {
        let fx = Fixture::new();
        let token = fx.token(ANONYMOUS, &anonymous_subject(), REGISTRATION_ACTION);

        let response = fx.routes.register.handle(post(
            "/register",
            ANONYMOUS,
            &format!(
                "username=carol&email=carol%40example.com&password=hunter22&password_confirmation=hunter22&csrf={token}"
            ),
        ));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login");
        let carol = fx
            .state
            .repositories
            .users()
            .get_by_username("carol")
            .unwrap()
            .unwrap();
        assert_ne!(carol.password_hash, "hunter22");
        assert!(fx.state.hasher.verify("hunter22", &carol.password_hash).unwrap());
    }

    #[test]
    fn test_register_rejects_taken_username_and_mismatch() {
        let fx = Fixture::new();
        fx.user("carol", "hunter22");
        let token = fx.token(ANONYMOUS, &anonymous_subject(), REGISTRATION_ACTION);

        let response = fx.routes.register.handle(post(
            "/register",
            ANONYMOUS,
            &format!(
                "username=carol&email=other%40example.com&password=hunter22&password_confirmation=hunter23&csrf={token}"
            ),
        ));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let page = html(&response);
        assert!(page.contains("please choose another username"));
        assert!(page.contains("PasswordConfirmation"));
        assert!(fx
            .state
            .repositories
            .users()
            .get_by_email("other@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_register_trims_before_checking_username() {
        let fx = Fixture::new();
        fx.user("carol", "hunter22");

        let token = fx.token(ANONYMOUS, &anonymous_subject(), REGISTRATION_ACTION);
        let response = fx.routes.register.handle(post(
            "/register",
            ANONYMOUS,
            &format!(
                "username=+carol&email=other%40example.com&password=hunter22&password_confirmation=hunter22&csrf={token}"
            ),
        ));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(html(&response).contains("please choose another username"));

        let token = fx.token(ANONYMOUS, &anonymous_subject(), REGISTRATION_ACTION);
        let response = fx.routes.register.handle(post(
            "/register",
            ANONYMOUS,
            &format!(
                "username=dave+&email=dave%40example.com&password=hunter22&password_confirmation=hunter22&csrf={token}"
            ),
        ));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(html(&response).contains("should be at least 5 characters long"));
        assert!(fx
            .state
            .repositories
            .users()
            .get_by_username("dave")
            .unwrap()
            .is_none());
    }

    // ==================== Logout ====================

    #[test]
    fn test_logout_drops_user_from_session() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");
        let cookie = fx.sign_in(&alice);

        let response = fx.routes.logout.handle(post("/logout", &cookie, ""));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
        let previous = SessionId::new(format!("session-{}", alice.id));
        assert!(fx.state.sessions.load(&previous).unwrap().is_none());
        let data = fx
            .state
            .sessions
            .load(&issued_session(&response))
            .unwrap()
            .unwrap_or_default();
        assert_eq!(data.user_id(), None);
    }

    // ==================== Profile ====================

    #[test]
    fn test_profile() {
        let fx = Fixture::new();
        let alice = fx.user("alice", "hunter22");

        let response = fx
            .routes
            .user
            .handle(get(&format!("/user?id={}", alice.id), None));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(html(&response).contains("alice"));

        let response = fx.routes.user.handle(get("/user?id=42", None));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
