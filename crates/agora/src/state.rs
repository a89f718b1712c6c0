//! Application state shared by every request.
//!
//! Holds the configuration snapshot and the capability backends the scoped
//! context resolves per request. The backends are selected by feature flags.

use std::sync::Arc;

use agora_auth::{Argon2Hasher, SessionConfig};
use agora_core::{
    auth::{PasswordHasher, SessionStore},
    storage::RepositoryProvider,
};

use crate::{
    config::Config,
    views::{AskamaProvider, TemplateProvider},
};

/// Shared application state.
///
/// Cheap to clone. Built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session_config: Arc<SessionConfig>,
    /// Hands out repository handles, one set per request.
    pub repositories: Arc<dyn RepositoryProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub templates: Arc<dyn TemplateProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        session_config: SessionConfig,
        repositories: Arc<dyn RepositoryProvider>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
        templates: Arc<dyn TemplateProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            session_config: Arc::new(session_config),
            repositories,
            sessions,
            hasher,
            templates,
        }
    }

    /// Creates state with in-memory storage and sessions.
    #[cfg(feature = "inmemory")]
    pub fn from_config(config: Config, session_config: SessionConfig) -> anyhow::Result<Self> {
        use crate::storage::InMemoryRepository;
        use agora_auth::InMemorySessionStore;

        tracing::info!("using in-memory storage, data is lost on restart");
        Ok(Self::new(
            config,
            session_config,
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(Argon2Hasher::new()),
            Arc::new(AskamaProvider),
        ))
    }

    /// Creates state with SQLite storage and sessions in the same file.
    #[cfg(feature = "sqlite")]
    pub fn from_config(config: Config, session_config: SessionConfig) -> anyhow::Result<Self> {
        use crate::storage::SqliteRepository;
        use agora_auth::SqliteSessionStore;

        tracing::info!(path = %config.sqlite_path, "using SQLite storage");
        let repositories = SqliteRepository::new(&config.sqlite_path)?;
        let sessions = SqliteSessionStore::new(&config.sqlite_path)?;
        Ok(Self::new(
            config,
            session_config,
            Arc::new(repositories),
            Arc::new(sessions),
            Arc::new(Argon2Hasher::new()),
            Arc::new(AskamaProvider),
        ))
    }

    /// In-memory state with cheap password hashing and a fixed secret.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::for_tests_with(Config {
            debug: false,
            secret: "test-secret".to_string(),
            ..Config::from_env()
        })
    }

    #[cfg(test)]
    pub fn for_tests_with(config: Config) -> Self {
        let hasher = Argon2Hasher::with_cost(8, 1, 1).expect("valid argon2 parameters");
        Self::new(
            config,
            SessionConfig::default(),
            Arc::new(crate::storage::inmemory::InMemoryRepository::new()),
            Arc::new(agora_auth::InMemorySessionStore::new()),
            Arc::new(hasher),
            Arc::new(AskamaProvider),
        )
    }
}
