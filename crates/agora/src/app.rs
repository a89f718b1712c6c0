use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
    Router,
};
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    context::ScopeFactory,
    handlers::{comments, threads, users},
    middlewares::{
        access_log, authenticated_only, favicon, not_found, post_only, refresh_user,
        session_init, stop_watch, template_environment,
    },
    pipeline::{stage, Pipeline, Request, Stack},
    state::AppState,
};

/// Largest request body the host reads before running a pipeline.
const BODY_LIMIT: usize = 1024 * 1024;

/// Stages every page runs through before its controller.
pub fn default_stack(factory: ScopeFactory) -> Stack {
    Stack::new(factory)
        .push(stop_watch)
        .push(access_log)
        .push(session_init)
        .push(refresh_user)
        .push(template_environment)
}

/// One pipeline per route, derived from the default stack.
#[derive(Clone)]
pub struct Routes {
    pub index: Pipeline,
    pub newest: Pipeline,
    pub newcomments: Pipeline,
    pub item: Pipeline,
    pub from: Pipeline,
    pub user: Pipeline,
    pub submitted: Pipeline,
    pub threads: Pipeline,
    pub reply: Pipeline,
    pub submit: Pipeline,
    pub login: Pipeline,
    pub logout: Pipeline,
    pub register: Pipeline,
    pub favicon: Pipeline,
}

impl Routes {
    pub fn new(state: AppState) -> Self {
        let factory = ScopeFactory::new(state);
        let default = default_stack(factory.clone());
        let signed_in = default.clone().push(authenticated_only);
        let post = default.clone().push(post_only);

        Self {
            index: default.clone().push(not_found).build([stage(threads::index)]),
            newest: default.build([stage(threads::newest)]),
            newcomments: default.build([stage(comments::newest)]),
            item: default.build([stage(threads::item)]),
            from: default.build([stage(threads::from)]),
            user: default.build([stage(users::profile)]),
            submitted: default.build([stage(threads::submitted)]),
            threads: default.build([stage(comments::by_author)]),
            reply: signed_in.build([stage(comments::reply)]),
            submit: signed_in.build([stage(threads::submit)]),
            login: default.build([stage(users::login)]),
            logout: post.build([stage(users::logout)]),
            register: post.build([stage(users::register)]),
            favicon: Stack::new(factory).build([stage(favicon)]),
        }
    }
}

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();
    let timeout = state.config.request_timeout();
    let routes = Routes::new(state);

    Router::new()
        .route("/", endpoint(&routes.index))
        .route("/newest", endpoint(&routes.newest))
        .route("/newcomments", endpoint(&routes.newcomments))
        .route("/item", endpoint(&routes.item))
        .route("/from", endpoint(&routes.from))
        .route("/user", endpoint(&routes.user))
        .route("/submitted", endpoint(&routes.submitted))
        .route("/threads", endpoint(&routes.threads))
        .route("/reply", endpoint(&routes.reply))
        .route("/submit", endpoint(&routes.submit))
        .route("/login", endpoint(&routes.login))
        .route("/logout", endpoint(&routes.logout))
        .route("/register", endpoint(&routes.register))
        .route("/favicon.ico", endpoint(&routes.favicon))
        .nest_service("/public", ServeDir::new(public_dir))
        .fallback_service(endpoint(&routes.index))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
}

fn endpoint(pipeline: &Pipeline) -> MethodRouter {
    let pipeline = pipeline.clone();
    any(move |request: axum::extract::Request| serve(pipeline.clone(), request))
}

/// Reads the body, then runs the pipeline on the blocking pool.
async fn serve(pipeline: Pipeline, request: axum::extract::Request) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };
    let request = Request::from_parts(parts, body, remote_addr);

    match tokio::task::spawn_blocking(move || pipeline.handle(request)).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "pipeline task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
