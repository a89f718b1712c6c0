mod error;
#[cfg(feature = "auth")]
mod functions;
mod traits;
mod types;

pub use error::AuthError;
#[cfg(feature = "auth")]
pub use functions::{calculate_expiry, generate_session_id, generate_token, is_expired};
pub use traits::{CsrfGenerator, PasswordHasher, Result, SessionStore};
pub use types::{CsrfEntry, Flash, FlashKind, SessionData, SessionId, USER_ID_KEY};
