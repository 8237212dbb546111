//! Room membership: whether the local user is joined, to which room, and
//! under which display name.
//!
//! Joining is optimistic: once a join passes validation it counts as joined
//! without waiting for a server ack. Any connection state other than
//! `Connected` forces the membership back to not-joined, so a stale join can
//! never be used to send over a new socket. The last room and name are
//! remembered across a leave for rejoining.

#[cfg(test)]
#[path = "membership_test.rs"]
mod membership_test;

use crate::error::ValidationError;
use crate::state::ConnectionStatus;

/// A validated, trimmed join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: String,
    pub display_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Membership {
    room: Option<String>,
    display_name: Option<String>,
    joined: bool,
}

impl Membership {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a join.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the trimmed name or room is empty,
    /// when `connection` is not `Connected`, or when already joined. The
    /// membership is unchanged on error.
    pub fn request_join(
        &mut self,
        room: &str,
        display_name: &str,
        connection: ConnectionStatus,
    ) -> Result<JoinRequest, ValidationError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::EmptyDisplayName);
        }
        let room = room.trim();
        if room.is_empty() {
            return Err(ValidationError::EmptyRoom);
        }
        if connection != ConnectionStatus::Connected {
            return Err(ValidationError::NotConnected);
        }
        if self.joined {
            return Err(ValidationError::AlreadyJoined);
        }

        self.room = Some(room.to_owned());
        self.display_name = Some(display_name.to_owned());
        self.joined = true;
        Ok(JoinRequest {
            room: room.to_owned(),
            display_name: display_name.to_owned(),
        })
    }

    /// Drop the join locally. Returns whether the user was joined.
    pub fn leave(&mut self) -> bool {
        std::mem::replace(&mut self.joined, false)
    }

    /// Enforce the joined-only-while-connected rule for a new connection state.
    pub fn on_connection_change(&mut self, connection: ConnectionStatus) {
        if connection != ConnectionStatus::Connected {
            self.leave();
        }
    }

    /// Room and name of the most recent join, joined or not.
    #[must_use]
    pub fn last_join(&self) -> Option<JoinRequest> {
        Some(JoinRequest {
            room: self.room.clone()?,
            display_name: self.display_name.clone()?,
        })
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// The joined room, `None` when not joined.
    #[must_use]
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref().filter(|_| self.joined)
    }

    /// The joined display name, `None` when not joined.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|_| self.joined)
    }

    /// Forget the remembered room and name as well.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
