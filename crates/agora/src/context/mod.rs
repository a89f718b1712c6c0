//! Request-scoped context module.
//!
//! Provides [`RequestScope`], the per-request container that lazily resolves
//! the session, CSRF guard, template renderer and repositories on top of the
//! application-scoped [`AppState`].

mod scope;
mod session;
mod types;

pub use scope::RequestScope;
pub use session::Session;
pub use types::RequestId;

use crate::{pipeline::Request, state::AppState};

/// Creates one [`RequestScope`] per request over shared state.
#[derive(Clone)]
pub struct ScopeFactory {
    state: AppState,
}

impl ScopeFactory {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn create(&self, request: Request) -> RequestScope {
        RequestScope::new(self.state.clone(), request)
    }
}
