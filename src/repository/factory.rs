// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device construction from stored records and advertisements.

use std::sync::Arc;

use crate::command::FamilyCodec;
use crate::config::ControlConfig;
use crate::device::Device;
use crate::protocol::{Advertisement, Transport};
use crate::types::DeviceFamily;

use super::store::DeviceRecord;

/// Builds devices sharing one transport and configuration.
#[derive(Debug)]
pub struct DeviceFactory<T: Transport> {
    transport: Arc<T>,
    config: ControlConfig,
}

impl<T: Transport> DeviceFactory<T> {
    /// Creates a factory handing `transport` to every device it builds.
    #[must_use]
    pub fn new(transport: Arc<T>, config: ControlConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the shared transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Returns the configuration given to new devices.
    #[must_use]
    pub fn config(&self) -> ControlConfig {
        self.config
    }

    /// Creates a device of the named family.
    ///
    /// Returns `None` if `family` is not a known family name.
    #[must_use]
    pub fn create_device(&self, family: &str, name: &str, address: &str) -> Option<Device<T>> {
        match family.parse::<DeviceFamily>() {
            Ok(family) => Some(self.build(family, name, address)),
            Err(e) => {
                tracing::warn!(family, address, error = %e, "Cannot create device");
                None
            }
        }
    }

    /// Creates the device described by a stored record.
    #[must_use]
    pub fn from_record(&self, record: &DeviceRecord) -> Option<Device<T>> {
        self.create_device(&record.family, &record.name, &record.address)
    }

    /// Creates an unsaved device for a scanned peripheral.
    ///
    /// The family is identified by the advertised services, then by the
    /// advertised name. Returns `None` for peripherals of no known family.
    #[must_use]
    pub fn from_advertisement(&self, advertisement: &Advertisement) -> Option<Device<T>> {
        let family = identify(advertisement)?;
        let name = advertisement
            .name
            .clone()
            .unwrap_or_else(|| family.as_str().to_string());
        Some(self.build(family, &name, &advertisement.address))
    }

    fn build(&self, family: DeviceFamily, name: &str, address: &str) -> Device<T> {
        Device::new(
            family,
            name,
            address,
            Arc::clone(&self.transport),
            self.config,
        )
    }
}

impl<T: Transport> Clone for DeviceFactory<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config,
        }
    }
}

fn identify(advertisement: &Advertisement) -> Option<DeviceFamily> {
    let by_service = DeviceFamily::ALL.into_iter().find(|family| {
        advertisement
            .services
            .contains(&FamilyCodec::for_family(*family).service())
    });

    by_service.or_else(|| {
        let name = advertisement.name.as_deref()?.to_ascii_lowercase();
        DeviceFamily::ALL
            .into_iter()
            .find(|family| name.contains(&family.as_str().to_ascii_lowercase()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryTransport;

    fn factory() -> DeviceFactory<MemoryTransport> {
        DeviceFactory::new(Arc::new(MemoryTransport::new()), ControlConfig::default())
    }

    fn advertisement(name: Option<&str>, services: Vec<uuid::Uuid>) -> Advertisement {
        Advertisement {
            address: "00:11".to_string(),
            name: name.map(str::to_string),
            services,
        }
    }

    #[test]
    fn creates_known_families() {
        let factory = factory();

        let buwizz = factory.create_device("BuWizz", "Crane", "00:01").unwrap();
        assert_eq!(buwizz.family(), DeviceFamily::BuWizz);
        assert_eq!(buwizz.name(), "Crane");

        let sbrick = factory.create_device("sbrick", "Loader", "00:02").unwrap();
        assert_eq!(sbrick.id(), "SBrick-00:02");
    }

    #[test]
    fn unknown_family_yields_none() {
        assert!(factory().create_device("Infrared", "Train", "00:03").is_none());
    }

    #[test]
    fn from_record_uses_record_fields() {
        let record = DeviceRecord::new("BuWizz", "Crane", "00:04");
        let device = factory().from_record(&record).unwrap();
        assert_eq!(device.id(), "BuWizz-00:04");
    }

    #[test]
    fn advertisement_identified_by_service() {
        let service = FamilyCodec::for_family(DeviceFamily::SBrick).service();
        let device = factory()
            .from_advertisement(&advertisement(Some("My brick"), vec![service]))
            .unwrap();

        assert_eq!(device.family(), DeviceFamily::SBrick);
        assert_eq!(device.name(), "My brick");
    }

    #[test]
    fn advertisement_identified_by_name() {
        let device = factory()
            .from_advertisement(&advertisement(Some("BUWIZZ 2"), Vec::new()))
            .unwrap();
        assert_eq!(device.family(), DeviceFamily::BuWizz);
    }

    #[test]
    fn unnamed_advertisement_uses_family_name() {
        let service = FamilyCodec::for_family(DeviceFamily::BuWizz).service();
        let device = factory()
            .from_advertisement(&advertisement(None, vec![service]))
            .unwrap();
        assert_eq!(device.name(), "BuWizz");
    }

    #[test]
    fn unrelated_advertisement_is_ignored() {
        assert!(
            factory()
                .from_advertisement(&advertisement(Some("Headphones"), Vec::new()))
                .is_none()
        );
    }
}
