// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport capability used by devices.
//!
//! The radio stack itself lives outside this crate. Devices only need a
//! small capability surface, expressed by two traits:
//!
//! - [`Transport`]: scan for advertisements and open a [`Session`] to an address
//! - [`Session`]: discover services, read/write characteristics, disconnect,
//!   and report link loss
//!
//! [`MemoryTransport`] is an in-process implementation that records every
//! write. It backs the test suite and the loopback demo.

mod memory;

pub use memory::{MemoryPeripheral, MemorySession, MemoryTransport};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ProtocolError;

/// Device Information Service (0x180A).
pub const DEVICE_INFORMATION_SERVICE: Uuid =
    Uuid::from_u128(0x0000_180a_0000_1000_8000_0080_5f9b_34fb);

/// Model Number String characteristic (0x2A24).
pub const MODEL_NUMBER_CHAR: Uuid = Uuid::from_u128(0x0000_2a24_0000_1000_8000_0080_5f9b_34fb);

/// Firmware Revision String characteristic (0x2A26).
pub const FIRMWARE_REVISION_CHAR: Uuid =
    Uuid::from_u128(0x0000_2a26_0000_1000_8000_0080_5f9b_34fb);

/// A `(service, characteristic)` pair identifying a GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// The service UUID.
    pub service: Uuid,
    /// The characteristic UUID.
    pub characteristic: Uuid,
}

impl Endpoint {
    /// Creates an endpoint.
    #[must_use]
    pub const fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.characteristic)
    }
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Transport address of the peripheral.
    pub address: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
}

/// Entry point into the transport stack.
///
/// Implementations are shared between every device of a repository, so they
/// must be cheap to reference through an `Arc`.
pub trait Transport: Send + Sync + 'static {
    /// The session type produced by [`connect`](Self::connect).
    type Session: Session;

    /// Scans for advertising peripherals for up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ScanFailed`] if the radio cannot scan.
    fn scan(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Advertisement>, ProtocolError>> + Send;

    /// Opens a link to the peripheral at `address`.
    ///
    /// There is no timeout at this level; the transport's own connection
    /// timeout is the only bound.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionFailed`] if the link cannot be opened.
    fn connect(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Session, ProtocolError>> + Send;
}

/// An open link to one peripheral.
///
/// A session is owned by exactly one device at a time.
pub trait Session: Send + Sync + 'static {
    /// Discovers the peripheral's services and returns their UUIDs.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if discovery fails.
    fn discover_services(&self) -> impl Future<Output = Result<Vec<Uuid>, ProtocolError>> + Send;

    /// Reads a characteristic value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ReadFailed`] if the read fails.
    fn read_characteristic(
        &self,
        endpoint: Endpoint,
    ) -> impl Future<Output = Result<Vec<u8>, ProtocolError>> + Send;

    /// Writes a characteristic value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::WriteFailed`] if the write fails.
    fn write_characteristic(
        &self,
        endpoint: Endpoint,
        data: &[u8],
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Closes the link.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the transport reports a failure while
    /// closing. The link is considered closed either way.
    fn disconnect(&self) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Completes when the link drops without a disconnect request.
    fn link_lost(&self) -> impl Future<Output = ()> + Send;
}
