// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `BrickCtl` - A Rust library to drive multi-channel Bluetooth LE motor and
//! light controllers.
//!
//! This library maps logical output channels to the wire commands of each
//! supported controller family, runs the connection lifecycle of every
//! device, and keeps a persistent list of known devices.
//!
//! # Supported Families
//!
//! - **BuWizz**: 4 channels, values -100..=100
//! - **SBrick**: 4 channels, values -255..=255
//!
//! # Features
//!
//! - **Output streaming**: while connected, channel values are re-sent every
//!   tick (60 ms by default); once every channel is neutral one last stop
//!   frame is sent and the link goes quiet
//! - **Connection lifecycle**: non-blocking `connect`/`disconnect` with state
//!   changes reported to listeners and `watch` receivers
//! - **Device repository**: cache of known devices backed by a store, with a
//!   reactive device list
//! - **Discovery**: scan results are turned into unsaved devices
//!
//! The radio stack is abstracted behind the [`Transport`](protocol::Transport)
//! and [`Session`](protocol::Session) traits. [`MemoryTransport`](protocol::MemoryTransport)
//! simulates peripherals in-process.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use brickctl::{ConnectionState, ControlConfig, DeviceFactory, DeviceRepository, JsonFileStore};
//! use brickctl::protocol::MemoryTransport;
//!
//! #[tokio::main]
//! async fn main() -> brickctl::Result<()> {
//!     let transport = Arc::new(MemoryTransport::new());
//!     let factory = DeviceFactory::new(transport, ControlConfig::default());
//!     let repository = DeviceRepository::new(JsonFileStore::open_default()?, factory);
//!
//!     repository.subscribe(|devices| {
//!         for device in devices {
//!             println!("{device}");
//!         }
//!     });
//!     repository.load_devices()?;
//!
//!     if let Some(device) = repository.devices().into_iter().next() {
//!         device.subscribe(|change| {
//!             println!("{} -> {}", change.previous, change.current);
//!         });
//!         device.connect()?;
//!
//!         let mut state = device.watch_state();
//!         state.wait_for(|s| *s != ConnectionState::Connecting).await.ok();
//!
//!         device.set_output(0, 60);
//!         device.set_output(1, -60);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
mod device;
pub mod error;
pub mod protocol;
pub mod repository;
pub mod state;
pub mod subscription;
pub mod types;

pub use command::{FamilyCodec, OutputCodec, OutputFrame};
pub use config::ControlConfig;
pub use device::{Device, DeviceInfo};
pub use error::{DeviceError, Error, ProtocolError, Result, StorageError, ValueError};
pub use repository::{
    DeviceFactory, DeviceRecord, DeviceRepository, DeviceStore, JsonFileStore, MemoryStore,
};
pub use state::{ConnectionState, StateChange};
pub use subscription::{CallbackRegistry, SubscriptionId};
pub use types::{ChannelRange, ChannelValue, DeviceFamily};
