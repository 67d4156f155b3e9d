// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables shared by the factory, devices and repository.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default output loop tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(60);

/// Default scan duration for device discovery.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Control layer configuration.
///
/// Durations serialize as whole milliseconds so the configuration can live
/// next to the device store.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use brickctl::ControlConfig;
///
/// let config = ControlConfig::default().with_tick_period(Duration::from_millis(40));
/// assert_eq!(config.tick_period(), Duration::from_millis(40));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    #[serde(rename = "tick_period_ms", with = "millis")]
    tick_period: Duration,
    #[serde(rename = "scan_timeout_ms", with = "millis")]
    scan_timeout: Duration,
}

impl ControlConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output loop tick period.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(Duration::from_millis(1));
        self
    }

    /// Sets how long discovery scans run.
    #[must_use]
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Returns the output loop tick period.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Returns the discovery scan duration.
    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
