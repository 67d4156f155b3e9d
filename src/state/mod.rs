// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection state machine.
//!
//! ```text
//!                connect()              services discovered
//! Disconnected ───────────► Connecting ─────────────────────► Connected
//!      ▲                        │                                 │
//!      │                        │ disconnect()       disconnect() │
//!      │                        ▼                                 │
//!      └──────────────── Disconnecting ◄──────────────────────────┘
//! ```
//!
//! Transport failures and link loss move any non-terminal state straight
//! back to [`ConnectionState::Disconnected`].

mod connection_state;
mod state_change;

pub use connection_state::ConnectionState;
pub use state_change::StateChange;
