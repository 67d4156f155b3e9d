// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent device records.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::StorageError;
use crate::protocol::Transport;
use crate::types::DeviceFamily;

/// A persisted device: `(family, name, address)` plus the store's row id.
///
/// Records are identified by family and address; `row_id` is assigned by
/// the store on insert and otherwise opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Store-assigned row id, `None` until inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<u64>,
    /// Family name, e.g. `"BuWizz"`.
    pub family: String,
    /// User-assigned name.
    pub name: String,
    /// Transport address.
    pub address: String,
}

impl DeviceRecord {
    /// Creates a record that has not been stored yet.
    #[must_use]
    pub fn new(
        family: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            row_id: None,
            family: family.into(),
            name: name.into(),
            address: address.into(),
        }
    }

    /// Builds the record describing `device`.
    #[must_use]
    pub fn from_device<T: Transport>(device: &Device<T>) -> Self {
        Self::new(device.family().as_str(), device.name(), device.address())
    }

    /// Returns the id of the device this record describes.
    #[must_use]
    pub fn device_id(&self) -> String {
        match self.family.parse::<DeviceFamily>() {
            Ok(family) => family.device_id(&self.address),
            Err(_) => format!("{}-{}", self.family, self.address),
        }
    }

    /// Returns `true` if both records describe the same device.
    #[must_use]
    pub fn same_device(&self, other: &Self) -> bool {
        self.family.eq_ignore_ascii_case(&other.family) && self.address == other.address
    }
}

/// Backend holding the persisted device records.
///
/// Calls are synchronous and short; the repository serializes them under
/// its own lock.
pub trait DeviceStore: Send + Sync + 'static {
    /// Returns every stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_all(&self) -> Result<Vec<DeviceRecord>, StorageError>;

    /// Inserts a record and returns it with its row id.
    ///
    /// Inserting a device that is already stored replaces the stored record
    /// and keeps its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError>;

    /// Replaces the stored record of the same device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not stored or the write fails.
    fn update(&self, record: &DeviceRecord) -> Result<(), StorageError>;

    /// Removes the record of the same device. Removing a device that is
    /// not stored is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn delete(&self, record: &DeviceRecord) -> Result<(), StorageError>;

    /// Removes every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn delete_all(&self) -> Result<(), StorageError>;
}

/// Record set shared by the in-process and file-backed stores.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct RecordSet {
    #[serde(default)]
    next_row_id: u64,
    #[serde(default)]
    devices: Vec<DeviceRecord>,
}

impl RecordSet {
    pub(crate) fn records(&self) -> Vec<DeviceRecord> {
        self.devices.clone()
    }

    pub(crate) fn insert(&mut self, mut record: DeviceRecord) -> DeviceRecord {
        if let Some(existing) = self.devices.iter_mut().find(|r| r.same_device(&record)) {
            record.row_id = existing.row_id;
            *existing = record.clone();
            return record;
        }

        self.next_row_id += 1;
        record.row_id = Some(self.next_row_id);
        self.devices.push(record.clone());
        record
    }

    pub(crate) fn update(&mut self, record: &DeviceRecord) -> Result<(), StorageError> {
        let existing = self
            .devices
            .iter_mut()
            .find(|r| r.same_device(record))
            .ok_or_else(|| {
                StorageError::Backend(format!(
                    "no stored record for {}-{}",
                    record.family, record.address
                ))
            })?;
        existing.name.clone_from(&record.name);
        Ok(())
    }

    pub(crate) fn delete(&mut self, record: &DeviceRecord) {
        self.devices.retain(|r| !r.same_device(record));
    }

    pub(crate) fn clear(&mut self) {
        self.devices.clear();
    }
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<RecordSet>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `records`, assigning row ids.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let store = Self::new();
        {
            let mut set = store.records.lock();
            for record in records {
                set.insert(record);
            }
        }
        store
    }
}

impl DeviceStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        Ok(self.records.lock().records())
    }

    fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        Ok(self.records.lock().insert(record))
    }

    fn update(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        self.records.lock().update(record)
    }

    fn delete(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        self.records.lock().delete(record);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        self.records.lock().clear();
        Ok(())
    }
}
