// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device family identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// The hardware family of a device.
///
/// Each family has its own wire protocol. The family name is what gets
/// persisted, and together with the transport address it forms the
/// device id.
///
/// # Examples
///
/// ```
/// use brickctl::types::DeviceFamily;
///
/// let family: DeviceFamily = "buwizz".parse().unwrap();
/// assert_eq!(family, DeviceFamily::BuWizz);
/// assert_eq!(family.device_id("00:11:22:33:44:55"), "BuWizz-00:11:22:33:44:55");
///
/// assert!("Infrared".parse::<DeviceFamily>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceFamily {
    /// `BuWizz` 4-channel motor controller.
    BuWizz,
    /// `SBrick` 4-channel motor controller.
    SBrick,
}

impl DeviceFamily {
    /// All known families.
    pub const ALL: [Self; 2] = [Self::BuWizz, Self::SBrick];

    /// Returns the canonical family name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BuWizz => "BuWizz",
            Self::SBrick => "SBrick",
        }
    }

    /// Builds the stable device id for a device of this family at `address`.
    #[must_use]
    pub fn device_id(&self, address: &str) -> String {
        format!("{}-{address}", self.as_str())
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceFamily {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValueError::UnknownFamily(s.to_string()))
    }
}

impl TryFrom<String> for DeviceFamily {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceFamily> for String {
    fn from(family: DeviceFamily) -> Self {
        family.as_str().to_string()
    }
}
