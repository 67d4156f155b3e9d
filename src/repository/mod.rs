// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device repository, factory and persistent stores.
//!
//! - [`DeviceRepository`]: cache of live devices kept in step with a store
//! - [`DeviceFactory`]: builds devices from records and advertisements
//! - [`DeviceStore`]: persistence backend, with [`MemoryStore`] and
//!   [`JsonFileStore`] implementations

mod device_repository;
mod factory;
mod json_store;
mod store;

pub use device_repository::DeviceRepository;
pub use factory::DeviceFactory;
pub use json_store::JsonFileStore;
pub use store::{DeviceRecord, DeviceStore, MemoryStore};
