// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel value types.
//!
//! A channel value is a signed integer whose neutral ("no output") level is
//! zero. Each family accepts values in its own symmetric range; anything
//! outside the range saturates instead of failing.

/// The inclusive value range accepted by a device family.
///
/// # Examples
///
/// ```
/// use brickctl::types::ChannelRange;
///
/// let range = ChannelRange::symmetric(100);
/// assert_eq!(range.clamp(250), 100);
/// assert_eq!(range.clamp(-250), -100);
/// assert_eq!(range.clamp(42), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRange {
    min: i32,
    max: i32,
}

impl ChannelRange {
    /// The neutral channel value.
    pub const NEUTRAL: i32 = 0;

    /// Creates a range `-limit..=limit`.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is negative.
    #[must_use]
    pub const fn symmetric(limit: i32) -> Self {
        assert!(limit >= 0, "channel range limit must not be negative");
        Self {
            min: -limit,
            max: limit,
        }
    }

    /// Returns the lowest accepted value.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Returns the highest accepted value.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Saturates `value` into the range.
    #[must_use]
    pub const fn clamp(&self, value: i32) -> i32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Returns `true` if `value` is the neutral level.
    #[must_use]
    pub const fn is_neutral(value: i32) -> bool {
        value == Self::NEUTRAL
    }
}

/// A target value for one channel, used for batched output updates.
///
/// # Examples
///
/// ```
/// use brickctl::types::ChannelValue;
///
/// let cv = ChannelValue::new(2, -40);
/// assert_eq!(cv.channel, 2);
/// assert_eq!(cv.value, -40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelValue {
    /// Zero-based channel index.
    pub channel: usize,
    /// Requested value, clamped to the family's range when applied.
    pub value: i32,
}

impl ChannelValue {
    /// Creates a channel value pair.
    #[must_use]
    pub const fn new(channel: usize, value: i32) -> Self {
        Self { channel, value }
    }
}

impl From<(usize, i32)> for ChannelValue {
    fn from((channel, value): (usize, i32)) -> Self {
        Self { channel, value }
    }
}
