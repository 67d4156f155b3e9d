// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel values shared between setters and the output loop.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::types::ChannelRange;

/// Last-writer-wins channel values plus the "continue sending" flag.
///
/// Each channel is an independent atomic; there is no cross-channel
/// atomicity. The flag is only ever cleared by the output loop through
/// [`take_pending`](Self::take_pending), so a concurrent setter can never
/// lose its re-arm.
#[derive(Debug)]
pub(crate) struct ChannelBank {
    values: Box<[AtomicI32]>,
    range: ChannelRange,
    sending: AtomicBool,
}

impl ChannelBank {
    pub(crate) fn new(channel_count: usize, range: ChannelRange) -> Self {
        Self {
            values: (0..channel_count)
                .map(|_| AtomicI32::new(ChannelRange::NEUTRAL))
                .collect(),
            range,
            sending: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Panics if `channel` is not a valid index.
    pub(crate) fn check_channel(&self, channel: usize) {
        assert!(
            channel < self.values.len(),
            "invalid channel {channel}: device has {} channels",
            self.values.len()
        );
    }

    /// Stores the clamped value and re-arms sending.
    ///
    /// A neutral write onto an already neutral channel leaves the flag
    /// alone. Returns the stored value.
    pub(crate) fn set(&self, channel: usize, value: i32) -> i32 {
        self.check_channel(channel);
        let value = self.range.clamp(value);
        let previous = self.values[channel].swap(value, Ordering::AcqRel);
        if !(ChannelRange::is_neutral(value) && ChannelRange::is_neutral(previous)) {
            self.sending.store(true, Ordering::Release);
        }
        value
    }

    pub(crate) fn snapshot(&self) -> Vec<i32> {
        self.values
            .iter()
            .map(|value| value.load(Ordering::Acquire))
            .collect()
    }

    /// Clears the "continue sending" flag and returns its previous value.
    pub(crate) fn take_pending(&self) -> bool {
        self.sending.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn rearm(&self) {
        self.sending.store(true, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Returns every channel to neutral and disarms sending.
    pub(crate) fn reset(&self) {
        for value in &self.values {
            value.store(ChannelRange::NEUTRAL, Ordering::Release);
        }
        self.sending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ChannelBank {
        ChannelBank::new(4, ChannelRange::symmetric(100))
    }

    #[test]
    fn starts_neutral_and_idle() {
        let bank = bank();
        assert_eq!(bank.snapshot(), vec![0; 4]);
        assert!(!bank.is_armed());
    }

    #[test]
    fn set_clamps_and_arms() {
        let bank = bank();
        assert_eq!(bank.set(2, -500), -100);
        assert_eq!(bank.snapshot(), vec![0, 0, -100, 0]);
        assert!(bank.is_armed());
    }

    #[test]
    fn neutral_onto_neutral_does_not_arm() {
        let bank = bank();
        bank.set(1, 0);
        assert!(!bank.is_armed());
    }

    #[test]
    fn neutral_after_output_arms() {
        let bank = bank();
        bank.set(0, 50);
        assert!(bank.take_pending());

        bank.set(0, 0);
        assert!(bank.is_armed());
    }

    #[test]
    fn repeated_non_neutral_write_rearms() {
        let bank = bank();
        bank.set(3, 20);
        bank.take_pending();

        bank.set(3, 20);
        assert!(bank.is_armed());
    }

    #[test]
    fn take_pending_clears_flag() {
        let bank = bank();
        bank.set(0, 1);
        assert!(bank.take_pending());
        assert!(!bank.take_pending());
    }

    #[test]
    fn reset_returns_to_neutral() {
        let bank = bank();
        bank.set(0, 90);
        bank.set(1, -90);
        bank.reset();

        assert_eq!(bank.snapshot(), vec![0; 4]);
        assert!(!bank.is_armed());
    }

    #[test]
    #[should_panic(expected = "invalid channel 4")]
    fn invalid_channel_panics() {
        bank().set(4, 10);
    }
}
