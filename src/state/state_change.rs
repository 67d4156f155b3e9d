// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection state transition records.

use serde::{Deserialize, Serialize};

use super::ConnectionState;

/// A connection state transition, delivered to device listeners.
///
/// `error` is set when the transition was caused by a transport failure
/// (failed connect, failed write, lost link).
///
/// # Examples
///
/// ```
/// use brickctl::state::{ConnectionState, StateChange};
///
/// let change = StateChange::new(ConnectionState::Connecting, ConnectionState::Disconnected)
///     .with_error("connection failed: out of range");
///
/// assert!(change.is_failure());
/// assert_eq!(change.current, ConnectionState::Disconnected);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// State before the transition.
    pub previous: ConnectionState,
    /// State after the transition.
    pub current: ConnectionState,
    /// Failure description, if the transition was caused by an error.
    pub error: Option<String>,
}

impl StateChange {
    /// Creates a transition without an error.
    #[must_use]
    pub const fn new(previous: ConnectionState, current: ConnectionState) -> Self {
        Self {
            previous,
            current,
            error: None,
        }
    }

    /// Attaches a failure description.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns `true` if the transition carries an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_error() {
        let change = StateChange::new(ConnectionState::Connecting, ConnectionState::Connected);
        assert!(!change.is_failure());
        assert_eq!(change.previous, ConnectionState::Connecting);
    }

    #[test]
    fn serializes_states_and_error() {
        let change = StateChange::new(ConnectionState::Connected, ConnectionState::Disconnected)
            .with_error("link lost");
        let json = serde_json::to_value(&change).unwrap();

        assert_eq!(json["previous"], "Connected");
        assert_eq!(json["current"], "Disconnected");
        assert_eq!(json["error"], "link lost");
    }
}
