// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `BrickCtl` library.
//!
//! This module provides the error hierarchy for the device control layer:
//! value parsing, transport communication, persistent storage, and device
//! lifecycle operations.
//!
//! Two conditions are deliberately absent from the hierarchy:
//!
//! - An out-of-range channel value is clamped to the family's range.
//! - A channel index outside the device's channel count is a caller bug and
//!   panics (see [`Device::set_output`](crate::Device::set_output)).

use thiserror::Error;
use uuid::Uuid;

use crate::state::ConnectionState;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while parsing a value.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the transport.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred in the persistent device store.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Error occurred during a device operation.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Device was not found in the repository.
    #[error("device not found")]
    DeviceNotFound,
}

/// Errors related to value parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The device family name is not one of the known families.
    #[error("unknown device family: {0}")]
    UnknownFamily(String),
}

/// Errors related to transport communication.
///
/// Every variant is a transport failure: it is reported through the device's
/// state observable and the device returns to
/// [`ConnectionState::Disconnected`]. Nothing is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Connecting to the peripheral failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The peripheral does not expose a service the family needs.
    #[error("service {0} not found")]
    ServiceNotFound(Uuid),

    /// Writing a characteristic failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Reading a characteristic failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Scanning for peripherals failed.
    #[error("scan failed: {0}")]
    ScanFailed(String),

    /// The link dropped without a disconnect request.
    #[error("link lost")]
    LinkLost,

    /// The session is not connected.
    #[error("not connected")]
    NotConnected,
}

/// Errors related to the persistent device store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The storage backend rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors related to device operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The requested action is not allowed from the current connection state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// The state the device was in.
        state: ConnectionState,
        /// The rejected action.
        action: &'static str,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
