use std::ops::{Deref, DerefMut};

use agora_core::auth::{generate_session_id, SessionData, SessionId};

/// The session of the current request.
///
/// Wraps the stored [`SessionData`] with its id and whether it came from
/// the store. Derefs to the data, so typed accessors such as
/// `user_id()` and `add_flash()` are available directly.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    data: SessionData,
    fresh: bool,
    rotated_from: Option<SessionId>,
}

impl Session {
    /// A new, empty session with a random id.
    pub fn fresh() -> Self {
        Self {
            id: generate_session_id(),
            data: SessionData::new(),
            fresh: true,
            rotated_from: None,
        }
    }

    /// A session loaded from the store.
    pub fn existing(id: SessionId, data: SessionData) -> Self {
        Self {
            id,
            data,
            fresh: false,
            rotated_from: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Moves the session to a new id, keeping its data.
    ///
    /// The stored copy under the old id is deleted when the session is
    /// persisted.
    pub fn rotate(&mut self) {
        let previous = std::mem::replace(&mut self.id, generate_session_id());
        if !self.fresh && self.rotated_from.is_none() {
            self.rotated_from = Some(previous);
        }
    }

    pub(crate) fn take_rotated(&mut self) -> Option<SessionId> {
        self.rotated_from.take()
    }

    /// Fresh sessions that never received data are not worth storing.
    pub(crate) fn needs_saving(&self) -> bool {
        !(self.is_fresh() && self.data.is_empty())
    }
}

impl Deref for Session {
    type Target = SessionData;

    fn deref(&self) -> &SessionData {
        &self.data
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }
}
