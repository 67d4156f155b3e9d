// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `SBrick` output codec.
//!
//! # Frame Layout
//!
//! ```text
//! [0]      : drive command (0x01)
//! [1 + 3n] : channel index n
//! [2 + 3n] : direction (0x00 clockwise, 0x01 counter-clockwise)
//! [3 + 3n] : magnitude 0-255
//! ```

use uuid::Uuid;

use crate::command::{OutputCodec, OutputFrame};
use crate::protocol::Endpoint;
use crate::types::ChannelRange;

/// `SBrick` remote control service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4dc5_91b0_857c_41de_b5f1_15ab_da66_5b0c);

/// `SBrick` remote control commands characteristic.
pub const COMMAND_CHAR_UUID: Uuid = Uuid::from_u128(0x02b8_cbcc_0e25_4bda_8790_a15f_53e6_010f);

const CHANNEL_COUNT: usize = 4;
const RANGE: ChannelRange = ChannelRange::symmetric(255);

const DRIVE_COMMAND: u8 = 0x01;
const CLOCKWISE: u8 = 0x00;
const COUNTER_CLOCKWISE: u8 = 0x01;

/// Codec for the 4-channel `SBrick` drive command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SBrickCodec;

impl OutputCodec for SBrickCodec {
    fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }

    fn range(&self) -> ChannelRange {
        RANGE
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(SERVICE_UUID, COMMAND_CHAR_UUID)
    }

    // Safe: channel < 4 and |value| <= 255
    #[allow(clippy::cast_possible_truncation)]
    fn encode(&self, values: &[i32]) -> OutputFrame {
        let mut bytes = Vec::with_capacity(1 + CHANNEL_COUNT * 3);
        bytes.push(DRIVE_COMMAND);
        for channel in 0..CHANNEL_COUNT {
            let value = self.channel_value(values, channel);
            let direction = if value < 0 { COUNTER_CLOCKWISE } else { CLOCKWISE };
            bytes.extend_from_slice(&[channel as u8, direction, value.unsigned_abs() as u8]);
        }
        OutputFrame::new(self.endpoint(), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_drive_command() {
        let frame = SBrickCodec.encode(&[255, -128, 0, 1]);
        assert_eq!(
            frame.bytes(),
            &[
                0x01, //
                0x00, 0x00, 0xFF, //
                0x01, 0x01, 0x80, //
                0x02, 0x00, 0x00, //
                0x03, 0x00, 0x01,
            ]
        );
        assert_eq!(frame.endpoint().service, SERVICE_UUID);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let frame = SBrickCodec.encode(&[300, -300, 0, 0]);
        assert_eq!(&frame.bytes()[1..7], &[0x00, 0x00, 0xFF, 0x01, 0x01, 0xFF]);
    }

    #[test]
    fn neutral_frame() {
        let frame = SBrickCodec.encode(&[0; 4]);
        assert_eq!(frame.bytes().len(), 13);
        assert_eq!(frame.bytes()[3], 0);
        assert_eq!(frame.bytes()[6], 0);
        assert_eq!(frame.bytes()[9], 0);
        assert_eq!(frame.bytes()[12], 0);
    }
}
