// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device abstraction.
//!
//! A [`Device`] wraps one physical unit: its identity, its connection state
//! machine, its channel values, and the codec of its family. `Device` is a
//! cheap handle; clones share the same underlying unit, so a rename made
//! through the repository is visible to every holder.
//!
//! # Lifecycle
//!
//! [`connect`](Device::connect) and [`disconnect`](Device::disconnect)
//! return immediately. Progress is reported through
//! [`subscribe`](Device::subscribe) listeners and the
//! [`watch_state`](Device::watch_state) channel.
//!
//! ```no_run
//! use std::sync::Arc;
//! use brickctl::{ConnectionState, ControlConfig, Device};
//! use brickctl::protocol::MemoryTransport;
//! use brickctl::types::DeviceFamily;
//!
//! # async fn example() -> brickctl::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let device = Device::new(
//!     DeviceFamily::BuWizz,
//!     "Crane",
//!     "00:11:22:33:44:55",
//!     transport,
//!     ControlConfig::default(),
//! );
//!
//! device.connect()?;
//! let mut state = device.watch_state();
//! state.wait_for(|s| *s != ConnectionState::Connecting).await.ok();
//!
//! device.set_output(0, 75);
//! # Ok(())
//! # }
//! ```

mod channels;
mod info;
mod output_loop;
mod supervisor;

pub use info::DeviceInfo;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::config::ControlConfig;
use crate::command::{FamilyCodec, OutputCodec};
use crate::error::{DeviceError, Error, ProtocolError};
use crate::protocol::Transport;
use crate::state::{ConnectionState, StateChange};
use crate::subscription::{CallbackRegistry, SubscriptionId};
use crate::types::{ChannelRange, ChannelValue, DeviceFamily};

use channels::ChannelBank;

/// A controllable device of one of the known families.
///
/// Equality and hashing use the device id only, which is derived from the
/// family and the transport address. The name is not part of identity.
pub struct Device<T: Transport> {
    shared: Arc<Shared<T>>,
}

/// State shared between device handles and the supervisor task.
pub(crate) struct Shared<T: Transport> {
    id: Arc<str>,
    family: DeviceFamily,
    address: String,
    name: RwLock<String>,
    codec: FamilyCodec,
    transport: Arc<T>,
    config: ControlConfig,
    channels: Arc<ChannelBank>,
    lifecycle: Mutex<Lifecycle>,
    state_tx: watch::Sender<ConnectionState>,
    listeners: CallbackRegistry<StateChange>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: ConnectionState,
    stop_tx: Option<watch::Sender<bool>>,
    info: Option<DeviceInfo>,
}

impl<T: Transport> Device<T> {
    /// Creates a disconnected device.
    #[must_use]
    pub fn new(
        family: DeviceFamily,
        name: impl Into<String>,
        address: impl Into<String>,
        transport: Arc<T>,
        config: ControlConfig,
    ) -> Self {
        let address = address.into();
        let codec = FamilyCodec::for_family(family);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            shared: Arc::new(Shared {
                id: Arc::from(family.device_id(&address)),
                family,
                address,
                name: RwLock::new(name.into()),
                codec,
                transport,
                config,
                channels: Arc::new(ChannelBank::new(codec.channel_count(), codec.range())),
                lifecycle: Mutex::new(Lifecycle::default()),
                state_tx,
                listeners: CallbackRegistry::new(),
            }),
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Returns the stable device id, e.g. `"BuWizz-00:11:22:33:44:55"`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Returns the user-assigned name.
    #[must_use]
    pub fn name(&self) -> String {
        self.shared.name.read().clone()
    }

    pub(crate) fn set_name(&self, name: impl Into<String>) {
        *self.shared.name.write() = name.into();
    }

    /// Returns the transport address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Returns the device family.
    #[must_use]
    pub fn family(&self) -> DeviceFamily {
        self.shared.family
    }

    /// Returns the number of output channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.shared.channels.len()
    }

    /// Returns the accepted channel value range.
    #[must_use]
    pub fn channel_range(&self) -> ChannelRange {
        self.shared.codec.range()
    }

    /// Returns the information read during the current connection, if any.
    #[must_use]
    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.shared.lifecycle.lock().info.clone()
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Returns the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lifecycle.lock().state
    }

    /// Starts connecting.
    ///
    /// Returns once the device is `Connecting`; the outcome is reported to
    /// listeners. Channel values are reset to neutral first, so nothing from
    /// an earlier session is replayed.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidTransition`] unless the device is
    /// `Disconnected`. The state is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn connect(&self) -> Result<(), Error> {
        let (change, stop_rx) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if !lifecycle.state.can_connect() {
                return Err(DeviceError::InvalidTransition {
                    state: lifecycle.state,
                    action: "connect",
                }
                .into());
            }

            self.shared.channels.reset();
            let (stop_tx, stop_rx) = watch::channel(false);
            lifecycle.stop_tx = Some(stop_tx);
            let change = self
                .shared
                .transition(&mut lifecycle, ConnectionState::Connecting, None);
            (change, stop_rx)
        };

        tracing::info!(device = %self.shared.id, "Connect requested");
        self.shared.publish(&change);

        tokio::spawn(supervisor::run(Arc::clone(&self.shared), stop_rx));
        Ok(())
    }

    /// Starts disconnecting.
    ///
    /// Stops the output loop, or cancels the connection attempt in flight,
    /// then closes the link. The device reaches `Disconnected` once the
    /// output loop has been joined and the session closed.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidTransition`] unless the device is
    /// `Connecting` or `Connected`. The state is left unchanged.
    pub fn disconnect(&self) -> Result<(), Error> {
        let (change, stop_tx) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if !lifecycle.state.can_disconnect() {
                return Err(DeviceError::InvalidTransition {
                    state: lifecycle.state,
                    action: "disconnect",
                }
                .into());
            }

            let change = self
                .shared
                .transition(&mut lifecycle, ConnectionState::Disconnecting, None);
            (change, lifecycle.stop_tx.take())
        };

        tracing::info!(device = %self.shared.id, "Disconnect requested");
        self.shared.publish(&change);

        if let Some(stop_tx) = stop_tx {
            stop_tx.send_replace(true);
        }
        Ok(())
    }

    /// Registers a listener for connection state transitions.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    /// Returns a receiver that always holds the latest connection state.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    /// Sets one channel's target value.
    ///
    /// Accepted in any state; values only reach the hardware while
    /// connected. Out-of-range values are clamped to
    /// [`channel_range`](Self::channel_range). Returns the stored value.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= channel_count()`.
    pub fn set_output(&self, channel: usize, value: i32) -> i32 {
        let stored = self.shared.channels.set(channel, value);
        tracing::trace!(device = %self.shared.id, channel, value = stored, "Output set");
        stored
    }

    /// Sets several channels. Each entry is applied as by
    /// [`set_output`](Self::set_output).
    ///
    /// # Panics
    ///
    /// Panics if any channel index is out of range. No value is applied in
    /// that case.
    pub fn set_outputs(&self, values: &[ChannelValue]) {
        for cv in values {
            self.shared.channels.check_channel(cv.channel);
        }
        for cv in values {
            self.set_output(cv.channel, cv.value);
        }
    }

    /// Returns a snapshot of the current channel values.
    #[must_use]
    pub fn outputs(&self) -> Vec<i32> {
        self.shared.channels.snapshot()
    }
}

impl<T: Transport> Shared<T> {
    /// Applies a transition under the lifecycle lock.
    fn transition(
        &self,
        lifecycle: &mut Lifecycle,
        next: ConnectionState,
        error: Option<String>,
    ) -> StateChange {
        debug_assert!(
            lifecycle.state.allows(next),
            "illegal transition {} -> {next}",
            lifecycle.state
        );
        let change = StateChange {
            previous: lifecycle.state,
            current: next,
            error,
        };
        lifecycle.state = next;
        self.state_tx.send_replace(next);
        change
    }

    fn publish(&self, change: &StateChange) {
        tracing::debug!(
            device = %self.id,
            previous = %change.previous,
            current = %change.current,
            error = ?change.error,
            "Connection state changed"
        );
        self.listeners.dispatch(change);
    }

    /// Moves `Connecting` to `Connected`. Returns `false` if a disconnect
    /// was requested in the meantime.
    fn enter_connected(&self, info: Option<DeviceInfo>) -> bool {
        let change = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ConnectionState::Connecting {
                return false;
            }
            lifecycle.info = info;
            self.transition(&mut lifecycle, ConnectionState::Connected, None)
        };

        tracing::info!(device = %self.id, "Connected");
        self.publish(&change);
        true
    }

    /// Ends a connection attempt: back to `Disconnected`, outputs neutral.
    fn finish(&self, result: Result<(), ProtocolError>) {
        let change = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.stop_tx = None;
            lifecycle.info = None;
            self.channels.reset();

            if lifecycle.state == ConnectionState::Disconnected {
                return;
            }

            let requested = lifecycle.state == ConnectionState::Disconnecting;
            let error = match &result {
                Ok(()) => None,
                Err(ProtocolError::LinkLost) if requested => None,
                Err(e) => Some(e.to_string()),
            };
            self.transition(&mut lifecycle, ConnectionState::Disconnected, error)
        };

        match &result {
            Ok(()) => tracing::info!(device = %self.id, "Disconnected"),
            Err(ProtocolError::LinkLost) => {
                tracing::warn!(device = %self.id, "Link lost");
            }
            Err(e) => tracing::error!(device = %self.id, error = %e, "Connection failed"),
        }
        self.publish(&change);
    }
}

impl<T: Transport> Clone for Device<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> PartialEq for Device<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}

impl<T: Transport> Eq for Device<T> {}

impl<T: Transport> Hash for Device<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.id.hash(state);
    }
}

impl<T: Transport> fmt::Debug for Device<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.shared.id)
            .field("name", &*self.shared.name.read())
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> fmt::Display for Device<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.shared.name.read(), self.shared.id)
    }
}
