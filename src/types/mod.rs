// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! # Types
//!
//! - [`DeviceFamily`] - The hardware family of a device (`BuWizz`, `SBrick`)
//! - [`ChannelRange`] - The signed value range a family accepts per channel
//! - [`ChannelValue`] - A `(channel, value)` pair used for batched updates

mod channel;
mod family;

pub use channel::{ChannelRange, ChannelValue};
pub use family::DeviceFamily;
