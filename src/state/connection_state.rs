// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection states and their allowed edges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No link. Initial and terminal state.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The link is up and the output loop is running.
    Connected,
    /// A disconnect was requested and is being carried out.
    Disconnecting,
}

impl ConnectionState {
    /// Returns `true` if `connect()` is accepted from this state.
    #[must_use]
    pub const fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns `true` if `disconnect()` is accepted from this state.
    #[must_use]
    pub const fn can_disconnect(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Returns `true` if the device is connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if moving from `self` to `next` follows a defined edge.
    ///
    /// Every non-terminal state may fall back to `Disconnected`, which
    /// covers transport failures and link loss.
    #[must_use]
    pub const fn allows(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting | Self::Connected, Self::Disconnecting)
                | (
                    Self::Connecting | Self::Connected | Self::Disconnecting,
                    Self::Disconnected
                )
        )
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
