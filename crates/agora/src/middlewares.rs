//! Pipeline stages shared by the routes.
//!
//! Order matters: `session_init` before `refresh_user`, and `refresh_user`
//! before `template_environment` and `authenticated_only`.

use std::{fmt::Write as _, time::Instant};

use axum::http::{
    header::{ALLOW, REFERER, USER_AGENT},
    HeaderValue, Method, StatusCode,
};

use agora_core::auth::FlashKind;

use crate::{
    context::RequestScope,
    error::PipelineError,
    handlers,
    pipeline::{Next, Request},
    views::TemplateEnvironment,
};

/// Logs how long the rest of the chain took.
pub fn stop_watch(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    let started = Instant::now();
    let result = next.run(scope);
    tracing::debug!(
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "request handled"
    );
    result
}

/// Logs one common log format line per request.
///
/// Errors and panics from later stages are rendered here so the logged
/// status is the one the client receives.
pub fn access_log(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    if let Err(err) = next.run_contained(scope) {
        scope.fail(&err);
    }

    let request = scope.request();
    let response = scope.response();
    let remote = request.client_ip().unwrap_or_else(|| "-".to_string());
    let (user_id, username) = scope
        .current_user()
        .map(|u| (u.id, u.username.as_str()))
        .unwrap_or((0, "-"));
    let referer = request.header(REFERER).unwrap_or("-");
    let user_agent = request.header(USER_AGENT).unwrap_or("-");
    let status = response.status().as_u16();
    let bytes = response.current_size();

    tracing::info!(
        remote_addr = %remote,
        user_id,
        username,
        method = %request.method,
        uri = %request.uri,
        protocol = ?request.version,
        status,
        bytes,
        referer,
        user_agent,
        "{remote} - {username} [{time}] \"{method} {uri} {version:?}\" {status} {bytes} \"{referer}\" \"{user_agent}\"",
        time = chrono::Utc::now().format("%d/%b/%Y:%H:%M:%S %z"),
        method = request.method,
        uri = request.uri,
        version = request.version,
    );
    Ok(())
}

/// Loads the session before anything else needs it.
pub fn session_init(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    scope.session()?;
    next.run(scope)
}

/// Resolves the signed in user from the session.
///
/// A missing user, or a lookup failure, leaves the request anonymous.
pub fn refresh_user(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    if let Some(id) = scope.session()?.user_id() {
        match scope.users()?.get_by_id(id) {
            Ok(Some(user)) => scope.set_current_user(user)?,
            Ok(None) => tracing::debug!(user_id = id, "session refers to a missing user"),
            Err(err) => tracing::warn!(user_id = id, error = %err, "failed to refresh user"),
        }
    }
    next.run(scope)
}

/// Injects the per-request template environment.
pub fn template_environment(
    scope: &mut RequestScope,
    next: Next<'_>,
) -> Result<(), PipelineError> {
    let flashes = scope.session()?.take_flashes();
    let mut env = TemplateEnvironment::base(scope.config());
    env.current_user = scope.current_user().cloned();
    env.flashes = flashes;
    if env.debug {
        env.request_dump = Some(request_dump(scope.request()));
    }
    scope.templates()?.set_environment(env);
    next.run(scope)
}

/// Lets signed in users through and answers everyone else with the login
/// page and `401 Unauthorized`.
pub fn authenticated_only(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    if scope.current_user().is_some() {
        return next.run(scope);
    }

    let session = scope.session()?;
    session.clear_user_id();
    session.add_flash(FlashKind::Danger, "Unauthorized");
    show_pending_flashes(scope)?;
    scope.set_status(StatusCode::UNAUTHORIZED);
    handlers::users::login_page(scope)
}

/// Only `/` itself continues; every other path is a 404.
pub fn not_found(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    let path = scope.request().path();
    if path != "/" {
        return Err(PipelineError::NotFound(path.to_string()));
    }
    next.run(scope)
}

pub fn post_only(scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
    if scope.request().method == Method::POST {
        return next.run(scope);
    }
    scope.set_header(ALLOW, HeaderValue::from_static("POST"));
    Err(PipelineError::MethodNotAllowed)
}

/// Answers favicon requests with an empty body.
pub fn favicon(scope: &mut RequestScope, _next: Next<'_>) -> Result<(), PipelineError> {
    scope.set_status(StatusCode::NO_CONTENT);
    scope.write(&[]);
    Ok(())
}

/// Moves flashes added during this request into the template environment.
pub(crate) fn show_pending_flashes(scope: &mut RequestScope) -> Result<(), PipelineError> {
    let flashes = scope.session()?.take_flashes();
    let templates = scope.templates()?;
    let mut env = templates.environment().clone();
    env.flashes.extend(flashes);
    templates.set_environment(env);
    Ok(())
}

fn request_dump(request: &Request) -> String {
    let mut dump = format!("{} {} {:?}\n", request.method, request.uri, request.version);
    for (name, value) in &request.headers {
        let _ = writeln!(dump, "{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    dump
}
