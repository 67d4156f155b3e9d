// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device Information Service readout.

use serde::{Deserialize, Serialize};

use crate::protocol::{
    DEVICE_INFORMATION_SERVICE, Endpoint, FIRMWARE_REVISION_CHAR, MODEL_NUMBER_CHAR, Session,
};

/// Identification strings read while connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Model number string, if readable.
    pub model: Option<String>,
    /// Firmware revision string, if readable.
    pub firmware: Option<String>,
}

impl DeviceInfo {
    /// Reads the Device Information Service. Unreadable fields stay `None`.
    pub(crate) async fn read<S: Session>(session: &S, device_id: &str) -> Self {
        Self {
            model: read_string(session, device_id, MODEL_NUMBER_CHAR).await,
            firmware: read_string(session, device_id, FIRMWARE_REVISION_CHAR).await,
        }
    }
}

async fn read_string<S: Session>(
    session: &S,
    device_id: &str,
    characteristic: uuid::Uuid,
) -> Option<String> {
    let endpoint = Endpoint::new(DEVICE_INFORMATION_SERVICE, characteristic);
    match session.read_characteristic(endpoint).await {
        Ok(bytes) => Some(
            String::from_utf8_lossy(&bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string(),
        ),
        Err(e) => {
            tracing::warn!(device = %device_id, endpoint = %endpoint, error = %e, "Device info read failed");
            None
        }
    }
}
