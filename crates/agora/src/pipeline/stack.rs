use std::sync::Arc;

use axum::http::StatusCode;

use crate::{
    context::{RequestScope, ScopeFactory},
    error::PipelineError,
};

use super::{panic, Request, ResponseSink};

/// One stage of a pipeline.
///
/// A stage continues the chain by calling [`Next::run`] once, or
/// short-circuits by returning without calling it. `Next` is consumed by
/// `run`, so a stage cannot continue twice.
pub trait Middleware: Send + Sync {
    fn handle(&self, scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError>;

    /// Name used in trace logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut RequestScope, Next<'_>) -> Result<(), PipelineError> + Send + Sync,
{
    fn handle(&self, scope: &mut RequestScope, next: Next<'_>) -> Result<(), PipelineError> {
        self(scope, next)
    }
}

/// Pins a closure to the middleware signature so its argument lifetimes
/// are inferred as higher-ranked.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&mut RequestScope, Next<'_>) -> Result<(), PipelineError> + Send + Sync,
{
    f
}

pub fn stage<M: Middleware + 'static>(middleware: M) -> Arc<dyn Middleware> {
    Arc::new(middleware)
}

/// Cursor over the stages that have not run yet.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Middleware>]) -> Self {
        Self { stages }
    }

    /// Runs the rest of the chain.
    ///
    /// Past the last stage, a request that produced no response gets an
    /// empty `204 No Content`.
    pub fn run(self, scope: &mut RequestScope) -> Result<(), PipelineError> {
        match self.stages.split_first() {
            Some((current, rest)) => {
                tracing::trace!(stage = current.name(), "entering stage");
                current.handle(scope, Next { stages: rest })
            }
            None => {
                if !scope.response().is_written() {
                    scope.set_status(StatusCode::NO_CONTENT);
                    scope.write(&[]);
                }
                Ok(())
            }
        }
    }

    /// Runs the rest of the chain, turning a panic into
    /// [`PipelineError::Panic`]. The panic is logged here with its backtrace.
    pub fn run_contained(self, scope: &mut RequestScope) -> Result<(), PipelineError> {
        match panic::contain(|| self.run(scope)) {
            Ok(result) => result,
            Err(caught) => {
                tracing::error!(
                    panic = %caught.message,
                    backtrace = %caught.backtrace,
                    "recovered from panic"
                );
                Err(PipelineError::Panic(caught.message))
            }
        }
    }
}

/// An ordered list of middlewares sharing one scope factory.
///
/// Cloning copies the list of stage handles, so route variants can be
/// derived from a base stack without touching it.
#[derive(Clone)]
pub struct Stack {
    middlewares: Vec<Arc<dyn Middleware>>,
    factory: ScopeFactory,
}

impl Stack {
    pub fn new(factory: ScopeFactory) -> Self {
        Self {
            middlewares: Vec::new(),
            factory,
        }
    }

    /// Appends a stage.
    pub fn push(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(stage(middleware));
        self
    }

    /// Prepends a stage.
    #[allow(dead_code)]
    pub fn shift(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.insert(0, stage(middleware));
        self
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Freezes the stack followed by `handlers` into a pipeline.
    pub fn build(&self, handlers: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Pipeline {
        let stages: Vec<_> = self.middlewares.iter().cloned().chain(handlers).collect();
        Pipeline {
            stages: stages.into(),
            factory: self.factory.clone(),
        }
    }
}

/// A frozen stack, ready to serve requests.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Middleware>]>,
    factory: ScopeFactory,
}

impl Pipeline {
    /// Runs the chain for one request.
    ///
    /// Errors and panics from any stage are rendered here, once. Nothing
    /// unwinds past this call.
    pub fn handle(&self, request: Request) -> ResponseSink {
        let mut scope = self.factory.create(request);
        let span = tracing::info_span!(
            "request",
            request_id = %scope.request_id(),
            method = %scope.request().method,
            path = %scope.request().path(),
        );
        let _enter = span.enter();

        if let Err(err) = Next::new(&self.stages).run_contained(&mut scope) {
            if let Err(caught) = panic::contain(|| scope.fail(&err)) {
                tracing::error!(panic = %caught.message, "error page panicked");
                return ResponseSink::plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                );
            }
        }

        scope.into_sink()
    }
}
