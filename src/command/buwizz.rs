// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `BuWizz` output codec.
//!
//! # Frame Layout
//!
//! ```text
//! [0..4] : one byte per channel
//!          bits 0-5 : |value| >> 2
//!          bit 6    : set when value < 0
//!          bit 7    : set on channel 0 only (packet marker)
//! [4]    : command id trailer (0x14)
//! ```
//!
//! The channel 0 marker bit must be kept bit-exact for wire compatibility.

use uuid::Uuid;

use crate::command::{OutputCodec, OutputFrame};
use crate::protocol::Endpoint;
use crate::types::ChannelRange;

/// `BuWizz` control service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ffe0_0000_1000_8000_0080_5f9b_34fb);

/// `BuWizz` output characteristic.
pub const OUTPUT_CHAR_UUID: Uuid = Uuid::from_u128(0x0000_ffe1_0000_1000_8000_0080_5f9b_34fb);

const CHANNEL_COUNT: usize = 4;
const RANGE: ChannelRange = ChannelRange::symmetric(100);

const NEGATIVE_FLAG: u8 = 0x40;
const MARKER_FLAG: u8 = 0x80;
const COMMAND_ID: u8 = 0x14;

/// Codec for the 4-channel signed-magnitude `BuWizz` protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuWizzCodec;

impl BuWizzCodec {
    fn encode_channel(channel: usize, value: i32) -> u8 {
        // Safe: |value| <= 100, so the shifted magnitude fits in 6 bits
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value.unsigned_abs() >> 2) as u8;
        if value < 0 {
            byte |= NEGATIVE_FLAG;
        }
        if channel == 0 {
            byte |= MARKER_FLAG;
        }
        byte
    }
}

impl OutputCodec for BuWizzCodec {
    fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }

    fn range(&self) -> ChannelRange {
        RANGE
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(SERVICE_UUID, OUTPUT_CHAR_UUID)
    }

    fn encode(&self, values: &[i32]) -> OutputFrame {
        let mut bytes = Vec::with_capacity(CHANNEL_COUNT + 1);
        for channel in 0..CHANNEL_COUNT {
            let value = self.channel_value(values, channel);
            bytes.push(Self::encode_channel(channel, value));
        }
        bytes.push(COMMAND_ID);
        OutputFrame::new(self.endpoint(), bytes)
    }
}
