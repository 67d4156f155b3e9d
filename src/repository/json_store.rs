// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device store backed by a single JSON document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StorageError;

use super::store::{DeviceRecord, DeviceStore, RecordSet};

const APP_DIR: &str = "brickctl";
const FILE_NAME: &str = "devices.json";

/// Store persisting records to a JSON file.
///
/// Every operation reads the document, applies the change and writes it
/// back through a temporary file that is renamed over the original, so a
/// crash never leaves a half-written document behind. A missing file is an
/// empty store.
///
/// # Examples
///
/// ```no_run
/// use brickctl::repository::{DeviceRecord, DeviceStore, JsonFileStore};
///
/// # fn example() -> Result<(), brickctl::error::StorageError> {
/// let store = JsonFileStore::open_default()?;
/// store.insert(DeviceRecord::new("BuWizz", "Crane", "00:11:22:33:44:55"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store writing to `path`. The file is created on the first
    /// write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns `<config_dir>/brickctl/devices.json`, or `None` if the
    /// platform has no configuration directory.
    #[must_use]
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Creates a store at [`default_location`](Self::default_location).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::default_location()
            .map(Self::new)
            .ok_or_else(|| StorageError::Backend("no configuration directory".to_string()))
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RecordSet, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RecordSet::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, records: &RecordSet) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Device store written");
        Ok(())
    }

    fn modify<R>(
        &self,
        change: impl FnOnce(&mut RecordSet) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        let result = change(&mut records)?;
        self.save(&records)?;
        Ok(result)
    }
}

impl DeviceStore for JsonFileStore {
    fn get_all(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.records())
    }

    fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        self.modify(|records| Ok(records.insert(record)))
    }

    fn update(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        self.modify(|records| records.update(record))
    }

    fn delete(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        self.modify(|records| {
            records.delete(record);
            Ok(())
        })
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        self.modify(|records| {
            records.clear();
            Ok(())
        })
    }
}
