// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device cache kept consistent with a [`DeviceStore`].

use std::collections::HashMap;
use std::fmt;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::protocol::Transport;
use crate::subscription::{CallbackRegistry, SubscriptionId};

use super::factory::DeviceFactory;
use super::store::{DeviceRecord, DeviceStore};

/// Authoritative view of every known device.
///
/// Mutations write to the store first and touch the cache only once the
/// store has accepted the change. All operations on the cache are
/// serialized under one lock, so no caller ever sees a half-applied change.
///
/// After every load, store and delete the full device list, ordered by name
/// then id, is republished to [`subscribe`](Self::subscribe) listeners and
/// to [`watch_devices`](Self::watch_devices) receivers. Renames are not
/// republished: the renamed instance is the one already held by observers.
///
/// Listener deliveries never overlap, and each one carries the list that is
/// current when it starts, so the last list a listener receives is always
/// the current one.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use brickctl::ControlConfig;
/// use brickctl::protocol::MemoryTransport;
/// use brickctl::repository::{DeviceFactory, DeviceRepository, MemoryStore};
///
/// # async fn example() -> brickctl::Result<()> {
/// let factory = DeviceFactory::new(Arc::new(MemoryTransport::new()), ControlConfig::default());
/// let repository = DeviceRepository::new(MemoryStore::new(), factory);
///
/// repository.subscribe(|devices| println!("{} devices", devices.len()));
/// repository.load_devices()?;
///
/// for device in repository.discover_devices().await? {
///     repository.store_device(&device)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeviceRepository<S: DeviceStore, T: Transport> {
    store: S,
    factory: DeviceFactory<T>,
    cache: Mutex<HashMap<String, Device<T>>>,
    devices_tx: watch::Sender<Vec<Device<T>>>,
    listeners: CallbackRegistry<[Device<T>]>,
    // Taken after the cache lock is released; reentrant so a listener may
    // mutate the repository.
    publishing: ReentrantMutex<()>,
}

impl<S: DeviceStore, T: Transport> DeviceRepository<S, T> {
    /// Creates an empty repository. Call [`load_devices`](Self::load_devices)
    /// to read the store.
    #[must_use]
    pub fn new(store: S, factory: DeviceFactory<T>) -> Self {
        let (devices_tx, _) = watch::channel(Vec::new());
        Self {
            store,
            factory,
            cache: Mutex::new(HashMap::new()),
            devices_tx,
            listeners: CallbackRegistry::new(),
            publishing: ReentrantMutex::new(()),
        }
    }

    /// Returns the factory used to build devices.
    #[must_use]
    pub fn factory(&self) -> &DeviceFactory<T> {
        &self.factory
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Replaces the cache with the stored devices and republishes the list.
    ///
    /// Records of unknown families are skipped. A device that is already
    /// cached keeps its instance, so a connected device stays reachable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store cannot be read; the cache is
    /// left as it was.
    pub fn load_devices(&self) -> Result<Vec<Device<T>>> {
        let mut cache = self.cache.lock();
        let records = self.store.get_all()?;

        let mut previous = std::mem::take(&mut *cache);
        for record in &records {
            let device = match previous.remove(&record.device_id()) {
                Some(existing) => {
                    existing.set_name(record.name.clone());
                    existing
                }
                None => match self.factory.from_record(record) {
                    Some(device) => device,
                    None => {
                        tracing::warn!(
                            family = %record.family,
                            address = %record.address,
                            "Skipping stored device of unknown family"
                        );
                        continue;
                    }
                },
            };
            cache.insert(device.id().to_string(), device);
        }

        tracing::info!(count = cache.len(), "Devices loaded");
        let list = self.republish(cache);
        Ok(list)
    }

    /// Stores `device` and adds it to the cache.
    ///
    /// Storing a device that is already known replaces its record. The
    /// cached instance is kept and takes the name of `device`, so a connected
    /// instance stays reachable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store rejects the insert; the cache
    /// is left as it was.
    pub fn store_device(&self, device: &Device<T>) -> Result<()> {
        let mut cache = self.cache.lock();
        self.store.insert(DeviceRecord::from_device(device))?;
        match cache.get(device.id()) {
            Some(existing) => existing.set_name(device.name()),
            None => {
                cache.insert(device.id().to_string(), device.clone());
            }
        }

        tracing::info!(device = %device.id(), name = %device.name(), "Device stored");
        self.republish(cache);
        Ok(())
    }

    /// Renames a cached device and persists the new name.
    ///
    /// The cached instance is renamed in place. The list is not republished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the device is not cached, or
    /// [`Error::Storage`] if the store rejects the update. The name is left
    /// unchanged in both cases.
    pub fn update_device(&self, device: &Device<T>, name: &str) -> Result<()> {
        let cache = self.cache.lock();
        let cached = cache.get(device.id()).ok_or(Error::DeviceNotFound)?;

        let mut record = DeviceRecord::from_device(cached);
        record.name = name.to_string();
        self.store.update(&record)?;

        cached.set_name(name);
        device.set_name(name);

        tracing::info!(device = %device.id(), name, "Device renamed");
        Ok(())
    }

    /// Deletes `device` from the store and the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store rejects the delete; the cache
    /// is left as it was.
    pub fn delete_device(&self, device: &Device<T>) -> Result<()> {
        let mut cache = self.cache.lock();
        self.store.delete(&DeviceRecord::from_device(device))?;
        cache.remove(device.id());

        tracing::info!(device = %device.id(), "Device deleted");
        self.republish(cache);
        Ok(())
    }

    /// Deletes every device from the store and the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the store rejects the delete; the cache
    /// is left as it was.
    pub fn delete_all_devices(&self) -> Result<()> {
        let mut cache = self.cache.lock();
        self.store.delete_all()?;
        cache.clear();

        tracing::info!("All devices deleted");
        self.republish(cache);
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns the cached device with `id`.
    #[must_use]
    pub fn get_device(&self, id: &str) -> Option<Device<T>> {
        self.cache.lock().get(id).cloned()
    }

    /// Returns the cached devices, ordered by name then id.
    #[must_use]
    pub fn devices(&self) -> Vec<Device<T>> {
        sorted(&self.cache.lock())
    }

    /// Scans for peripherals and returns the devices not cached yet.
    ///
    /// Returned devices are not stored; pass the ones to keep to
    /// [`store_device`](Self::store_device).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the scan fails.
    pub async fn discover_devices(&self) -> Result<Vec<Device<T>>> {
        let timeout = self.factory.config().scan_timeout();
        tracing::debug!(timeout = ?timeout, "Scanning for devices");

        let advertisements = self.factory.transport().scan(timeout).await?;

        let cache = self.cache.lock();
        let mut found: Vec<Device<T>> = Vec::new();
        for advertisement in &advertisements {
            if let Some(device) = self.factory.from_advertisement(advertisement)
                && !cache.contains_key(device.id())
                && !found.contains(&device)
            {
                found.push(device);
            }
        }
        drop(cache);

        tracing::info!(
            seen = advertisements.len(),
            new = found.len(),
            "Device scan finished"
        );
        Ok(found)
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Registers a listener receiving the full device list on every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Device<T>]) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Returns a receiver that always holds the latest device list.
    #[must_use]
    pub fn watch_devices(&self) -> watch::Receiver<Vec<Device<T>>> {
        self.devices_tx.subscribe()
    }

    /// Publishes the current list. The watch is updated under the cache
    /// lock; listeners run after it is released, one delivery at a time,
    /// with whatever list the watch holds by then.
    fn republish(
        &self,
        cache: parking_lot::MutexGuard<'_, HashMap<String, Device<T>>>,
    ) -> Vec<Device<T>> {
        let list = sorted(&cache);
        self.devices_tx.send_replace(list.clone());
        drop(cache);

        let _publishing = self.publishing.lock();
        let current = self.devices_tx.borrow().clone();
        tracing::debug!(count = current.len(), "Device list published");
        self.listeners.dispatch(&current);
        list
    }
}

fn sorted<T: Transport>(cache: &HashMap<String, Device<T>>) -> Vec<Device<T>> {
    let mut list: Vec<Device<T>> = cache.values().cloned().collect();
    list.sort_by_cached_key(|device| (device.name(), device.id().to_string()));
    list
}

impl<S: DeviceStore, T: Transport> fmt::Debug for DeviceRepository<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRepository")
            .field("devices", &self.cache.lock().len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
