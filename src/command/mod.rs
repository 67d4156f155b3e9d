// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-family output codecs.
//!
//! A codec is a pure, stateless transformation from a vector of channel
//! values to the bytes written to the family's output characteristic.
//!
//! # Available Codecs
//!
//! | Codec | Channels | Range | Frame |
//! |-------|----------|-------|-------|
//! | [`BuWizzCodec`] | 4 | -100..=100 | 4 signed-magnitude bytes + `0x14` trailer |
//! | [`SBrickCodec`] | 4 | -255..=255 | `0x01` + `(channel, direction, magnitude)` per channel |
//!
//! # Examples
//!
//! ```
//! use brickctl::command::{FamilyCodec, OutputCodec};
//! use brickctl::types::DeviceFamily;
//!
//! let codec = FamilyCodec::for_family(DeviceFamily::BuWizz);
//! let frame = codec.encode(&[50, -30, 0, 0]);
//! assert_eq!(frame.bytes(), &[0x8C, 0x47, 0x00, 0x00, 0x14]);
//! ```

mod buwizz;
mod sbrick;

pub use buwizz::BuWizzCodec;
pub use sbrick::SBrickCodec;

use crate::protocol::Endpoint;
use crate::types::{ChannelRange, DeviceFamily};

/// Encoded output ready to be written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFrame {
    endpoint: Endpoint,
    bytes: Vec<u8>,
}

impl OutputFrame {
    /// Creates a frame targeting `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint, bytes: Vec<u8>) -> Self {
        Self { endpoint, bytes }
    }

    /// Returns the characteristic the frame is written to.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Returns the frame payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Capability interface shared by all family codecs.
///
/// Implementations must be deterministic and side-effect free. Values
/// outside [`range`](Self::range) are clamped; missing trailing values are
/// treated as neutral and extra values are ignored.
pub trait OutputCodec {
    /// Returns the number of output channels.
    fn channel_count(&self) -> usize;

    /// Returns the accepted per-channel value range.
    fn range(&self) -> ChannelRange;

    /// Returns the characteristic output frames are written to.
    fn endpoint(&self) -> Endpoint;

    /// Encodes channel values into an output frame.
    fn encode(&self, values: &[i32]) -> OutputFrame;

    /// Returns the clamped value of `channel`, neutral if absent.
    fn channel_value(&self, values: &[i32], channel: usize) -> i32 {
        values
            .get(channel)
            .map_or(ChannelRange::NEUTRAL, |v| self.range().clamp(*v))
    }
}

/// Closed set of codecs, one variant per known family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyCodec {
    /// `BuWizz` signed-magnitude codec.
    BuWizz(BuWizzCodec),
    /// `SBrick` drive-command codec.
    SBrick(SBrickCodec),
}

impl FamilyCodec {
    /// Returns the codec for `family`.
    #[must_use]
    pub const fn for_family(family: DeviceFamily) -> Self {
        match family {
            DeviceFamily::BuWizz => Self::BuWizz(BuWizzCodec),
            DeviceFamily::SBrick => Self::SBrick(SBrickCodec),
        }
    }

    /// Returns the family this codec belongs to.
    #[must_use]
    pub const fn family(&self) -> DeviceFamily {
        match self {
            Self::BuWizz(_) => DeviceFamily::BuWizz,
            Self::SBrick(_) => DeviceFamily::SBrick,
        }
    }

    /// Returns the primary service the family advertises and needs.
    #[must_use]
    pub fn service(&self) -> uuid::Uuid {
        self.endpoint().service
    }
}

impl OutputCodec for FamilyCodec {
    fn channel_count(&self) -> usize {
        match self {
            Self::BuWizz(codec) => codec.channel_count(),
            Self::SBrick(codec) => codec.channel_count(),
        }
    }

    fn range(&self) -> ChannelRange {
        match self {
            Self::BuWizz(codec) => codec.range(),
            Self::SBrick(codec) => codec.range(),
        }
    }

    fn endpoint(&self) -> Endpoint {
        match self {
            Self::BuWizz(codec) => codec.endpoint(),
            Self::SBrick(codec) => codec.endpoint(),
        }
    }

    fn encode(&self, values: &[i32]) -> OutputFrame {
        match self {
            Self::BuWizz(codec) => codec.encode(values),
            Self::SBrick(codec) => codec.encode(values),
        }
    }
}
