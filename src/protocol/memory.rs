// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory transport.
//!
//! Peripherals are registered up front; connecting to one opens a
//! [`MemorySession`] whose writes are recorded so they can be inspected.
//! Failures and link loss can be injected per peripheral.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use crate::command::FamilyCodec;
use crate::error::ProtocolError;
use crate::protocol::{Advertisement, Endpoint, Session, Transport};
use crate::types::DeviceFamily;

/// A simulated peripheral registered with a [`MemoryTransport`].
///
/// # Examples
///
/// ```
/// use brickctl::protocol::{MemoryPeripheral, MemoryTransport};
/// use brickctl::types::DeviceFamily;
///
/// let transport = MemoryTransport::new();
/// transport.add_peripheral(
///     MemoryPeripheral::for_family(DeviceFamily::BuWizz, "00:11:22:33:44:55")
///         .with_name("BuWizz"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MemoryPeripheral {
    address: String,
    name: Option<String>,
    services: Vec<Uuid>,
    values: HashMap<Endpoint, Vec<u8>>,
    connect_delay: Duration,
    stall_discovery: bool,
}

impl MemoryPeripheral {
    /// Creates a peripheral with no services.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            services: Vec::new(),
            values: HashMap::new(),
            connect_delay: Duration::ZERO,
            stall_discovery: false,
        }
    }

    /// Creates a peripheral exposing the primary service of `family`.
    #[must_use]
    pub fn for_family(family: DeviceFamily, address: impl Into<String>) -> Self {
        Self::new(address).with_service(FamilyCodec::for_family(family).service())
    }

    /// Sets the advertised name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an advertised service.
    #[must_use]
    pub fn with_service(mut self, service: Uuid) -> Self {
        if !self.services.contains(&service) {
            self.services.push(service);
        }
        self
    }

    /// Adds a readable characteristic value, exposing its service too.
    #[must_use]
    pub fn with_value(mut self, endpoint: Endpoint, value: impl Into<Vec<u8>>) -> Self {
        self = self.with_service(endpoint.service);
        self.values.insert(endpoint, value.into());
        self
    }

    /// Delays every connection attempt by `delay`.
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Makes service discovery never complete, like a stack whose
    /// discovery callback never fires.
    #[must_use]
    pub fn with_stalled_discovery(mut self) -> Self {
        self.stall_discovery = true;
        self
    }

    fn advertisement(&self) -> Advertisement {
        Advertisement {
            address: self.address.clone(),
            name: self.name.clone(),
            services: self.services.clone(),
        }
    }
}

#[derive(Debug)]
struct PeripheralSlot {
    peripheral: MemoryPeripheral,
    writes: Vec<(Endpoint, Vec<u8>)>,
    fail_connect: Option<String>,
    fail_writes: bool,
    link: Option<watch::Sender<bool>>,
    connections: usize,
    disconnects: usize,
}

type Registry = Arc<Mutex<HashMap<String, PeripheralSlot>>>;

/// Transport backed by in-process simulated peripherals.
///
/// Cloning yields a handle to the same set of peripherals.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    registry: Registry,
}

impl MemoryTransport {
    /// Creates a transport with no peripherals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a peripheral.
    pub fn add_peripheral(&self, peripheral: MemoryPeripheral) {
        let slot = PeripheralSlot {
            peripheral,
            writes: Vec::new(),
            fail_connect: None,
            fail_writes: false,
            link: None,
            connections: 0,
            disconnects: 0,
        };
        self.registry
            .lock()
            .insert(slot.peripheral.address.clone(), slot);
    }

    /// Makes the next connection attempt to `address` fail with `reason`.
    pub fn fail_next_connect(&self, address: &str, reason: impl Into<String>) {
        if let Some(slot) = self.registry.lock().get_mut(address) {
            slot.fail_connect = Some(reason.into());
        }
    }

    /// Makes every write to `address` fail while `fail` is set.
    pub fn fail_writes(&self, address: &str, fail: bool) {
        if let Some(slot) = self.registry.lock().get_mut(address) {
            slot.fail_writes = fail;
        }
    }

    /// Drops the link to `address` as if the peripheral went out of range.
    ///
    /// Returns `true` if a session was open.
    pub fn drop_link(&self, address: &str) -> bool {
        let mut registry = self.registry.lock();
        let Some(link) = registry.get_mut(address).and_then(|slot| slot.link.take()) else {
            return false;
        };
        link.send_replace(true);
        true
    }

    /// Returns every payload written to `address`, oldest first.
    #[must_use]
    pub fn writes(&self, address: &str) -> Vec<Vec<u8>> {
        self.registry
            .lock()
            .get(address)
            .map(|slot| slot.writes.iter().map(|(_, bytes)| bytes.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns every `(endpoint, payload)` written to `address`, oldest first.
    #[must_use]
    pub fn written_frames(&self, address: &str) -> Vec<(Endpoint, Vec<u8>)> {
        self.registry
            .lock()
            .get(address)
            .map(|slot| slot.writes.clone())
            .unwrap_or_default()
    }

    /// Forgets the recorded writes of `address`.
    pub fn clear_writes(&self, address: &str) {
        if let Some(slot) = self.registry.lock().get_mut(address) {
            slot.writes.clear();
        }
    }

    /// Returns `true` if a session to `address` is open.
    #[must_use]
    pub fn is_connected(&self, address: &str) -> bool {
        self.registry
            .lock()
            .get(address)
            .is_some_and(|slot| slot.link.is_some())
    }

    /// Returns how many sessions were opened and closed for `address`.
    #[must_use]
    pub fn session_counts(&self, address: &str) -> (usize, usize) {
        self.registry
            .lock()
            .get(address)
            .map_or((0, 0), |slot| (slot.connections, slot.disconnects))
    }
}

impl Transport for MemoryTransport {
    type Session = MemorySession;

    async fn scan(&self, _timeout: Duration) -> Result<Vec<Advertisement>, ProtocolError> {
        let mut found: Vec<Advertisement> = self
            .registry
            .lock()
            .values()
            .map(|slot| slot.peripheral.advertisement())
            .collect();
        found.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(found)
    }

    async fn connect(&self, address: &str) -> Result<MemorySession, ProtocolError> {
        let delay = {
            let mut registry = self.registry.lock();
            let slot = registry.get_mut(address).ok_or_else(|| {
                ProtocolError::ConnectionFailed(format!("no peripheral at {address}"))
            })?;
            if let Some(reason) = slot.fail_connect.take() {
                return Err(ProtocolError::ConnectionFailed(reason));
            }
            slot.peripheral.connect_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut registry = self.registry.lock();
        let slot = registry.get_mut(address).ok_or_else(|| {
            ProtocolError::ConnectionFailed(format!("peripheral {address} went away"))
        })?;
        let (link_tx, link_rx) = watch::channel(false);
        slot.link = Some(link_tx);
        slot.connections += 1;

        tracing::debug!(address = %address, "Memory session opened");

        Ok(MemorySession {
            address: address.to_string(),
            registry: Arc::clone(&self.registry),
            link_rx,
            closed: AtomicBool::new(false),
        })
    }
}

/// Session opened by a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemorySession {
    address: String,
    registry: Registry,
    link_rx: watch::Receiver<bool>,
    closed: AtomicBool,
}

impl MemorySession {
    fn check_open(&self) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::NotConnected);
        }
        if *self.link_rx.borrow() {
            return Err(ProtocolError::LinkLost);
        }
        Ok(())
    }
}

impl Session for MemorySession {
    async fn discover_services(&self) -> Result<Vec<Uuid>, ProtocolError> {
        self.check_open()?;
        let (services, stall) = self
            .registry
            .lock()
            .get(&self.address)
            .map(|slot| (slot.peripheral.services.clone(), slot.peripheral.stall_discovery))
            .ok_or(ProtocolError::NotConnected)?;

        if stall {
            return std::future::pending().await;
        }
        Ok(services)
    }

    async fn read_characteristic(&self, endpoint: Endpoint) -> Result<Vec<u8>, ProtocolError> {
        self.check_open()?;
        self.registry
            .lock()
            .get(&self.address)
            .and_then(|slot| slot.peripheral.values.get(&endpoint).cloned())
            .ok_or_else(|| ProtocolError::ReadFailed(format!("{endpoint} is not readable")))
    }

    async fn write_characteristic(
        &self,
        endpoint: Endpoint,
        data: &[u8],
    ) -> Result<(), ProtocolError> {
        self.check_open()?;
        let mut registry = self.registry.lock();
        let slot = registry
            .get_mut(&self.address)
            .ok_or(ProtocolError::NotConnected)?;
        if slot.fail_writes {
            return Err(ProtocolError::WriteFailed(format!(
                "write to {endpoint} rejected"
            )));
        }
        slot.writes.push((endpoint, data.to_vec()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(slot) = self.registry.lock().get_mut(&self.address) {
            slot.link = None;
            slot.disconnects += 1;
        }
        tracing::debug!(address = %self.address, "Memory session closed");
        Ok(())
    }

    async fn link_lost(&self) {
        let mut link_rx = self.link_rx.clone();
        // A dropped sender means the transport forgot the link
        let _ = link_rx.wait_for(|lost| *lost).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::OutputCodec;

    const ADDR: &str = "00:11:22:33:44:55";

    fn transport() -> MemoryTransport {
        let transport = MemoryTransport::new();
        transport.add_peripheral(
            MemoryPeripheral::for_family(DeviceFamily::BuWizz, ADDR).with_name("BuWizz"),
        );
        transport
    }

    #[tokio::test]
    async fn scan_lists_peripherals() {
        let found = transport().scan(Duration::from_secs(1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, ADDR);
        assert_eq!(found[0].name.as_deref(), Some("BuWizz"));
    }

    #[tokio::test]
    async fn connect_unknown_address_fails() {
        let err = transport().connect("nowhere").await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn injected_connect_failure_is_one_shot() {
        let transport = transport();
        transport.fail_next_connect(ADDR, "out of range");

        let err = transport.connect(ADDR).await.unwrap_err();
        assert_eq!(err, ProtocolError::ConnectionFailed("out of range".into()));
        assert!(transport.connect(ADDR).await.is_ok());
    }

    #[tokio::test]
    async fn writes_are_recorded() {
        let transport = transport();
        let session = transport.connect(ADDR).await.unwrap();
        let endpoint = FamilyCodec::for_family(DeviceFamily::BuWizz).endpoint();

        session.write_characteristic(endpoint, &[1, 2, 3]).await.unwrap();

        assert_eq!(transport.writes(ADDR), vec![vec![1, 2, 3]]);
        assert_eq!(transport.written_frames(ADDR)[0].0, endpoint);
    }

    #[tokio::test]
    async fn write_after_disconnect_fails() {
        let transport = transport();
        let session = transport.connect(ADDR).await.unwrap();
        session.disconnect().await.unwrap();

        let endpoint = FamilyCodec::for_family(DeviceFamily::BuWizz).endpoint();
        let err = session.write_characteristic(endpoint, &[0]).await.unwrap_err();

        assert_eq!(err, ProtocolError::NotConnected);
        assert!(!transport.is_connected(ADDR));
        assert_eq!(transport.session_counts(ADDR), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_discovery_never_completes() {
        let transport = MemoryTransport::new();
        transport.add_peripheral(
            MemoryPeripheral::for_family(DeviceFamily::BuWizz, ADDR).with_stalled_discovery(),
        );
        let session = transport.connect(ADDR).await.unwrap();

        let pending =
            tokio::time::timeout(Duration::from_secs(60), session.discover_services()).await;
        assert!(pending.is_err());

        assert!(transport.drop_link(ADDR));
        assert_eq!(session.discover_services().await, Err(ProtocolError::LinkLost));
    }

    #[tokio::test]
    async fn drop_link_completes_link_lost() {
        let transport = transport();
        let session = transport.connect(ADDR).await.unwrap();

        assert!(transport.drop_link(ADDR));
        session.link_lost().await;

        let endpoint = FamilyCodec::for_family(DeviceFamily::BuWizz).endpoint();
        let err = session.write_characteristic(endpoint, &[0]).await.unwrap_err();
        assert_eq!(err, ProtocolError::LinkLost);
    }

    #[tokio::test]
    async fn read_returns_registered_value() {
        let endpoint = Endpoint::new(
            crate::protocol::DEVICE_INFORMATION_SERVICE,
            crate::protocol::MODEL_NUMBER_CHAR,
        );
        let transport = MemoryTransport::new();
        transport.add_peripheral(MemoryPeripheral::new(ADDR).with_value(endpoint, "SBrick"));

        let session = transport.connect(ADDR).await.unwrap();
        let services = session.discover_services().await.unwrap();

        assert_eq!(services, vec![endpoint.service]);
        assert_eq!(session.read_characteristic(endpoint).await.unwrap(), b"SBrick");
    }
}
