// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic output retransmission.
//!
//! While a device is connected, one loop task re-encodes and writes the
//! current channel values every tick. Once a neutral frame has gone out
//! after the last non-neutral value, the loop stays quiet until a setter
//! re-arms it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::command::{FamilyCodec, OutputCodec};
use crate::error::ProtocolError;
use crate::protocol::Session;
use crate::types::ChannelRange;

use super::channels::ChannelBank;
use super::supervisor::stopped;

/// Output loop for one connected device.
///
/// The loop holds its own handle to the session; the supervisor joins the
/// task before closing the session, so no write can reach a closed link.
pub(crate) struct OutputLoop<S: Session> {
    device_id: Arc<str>,
    session: Arc<S>,
    codec: FamilyCodec,
    channels: Arc<ChannelBank>,
    period: Duration,
}

impl<S: Session> OutputLoop<S> {
    pub(crate) fn new(
        device_id: Arc<str>,
        session: Arc<S>,
        codec: FamilyCodec,
        channels: Arc<ChannelBank>,
        period: Duration,
    ) -> Self {
        Self {
            device_id,
            session,
            codec,
            channels,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// Runs one tick. Returns `true` if a frame was written.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the write fails.
    pub(crate) async fn tick(&self) -> Result<bool, ProtocolError> {
        if !self.channels.take_pending() {
            return Ok(false);
        }

        let snapshot = self.channels.snapshot();
        let frame = self.codec.encode(&snapshot);
        self.session
            .write_characteristic(frame.endpoint(), frame.bytes())
            .await?;

        tracing::trace!(device = %self.device_id, values = ?snapshot, "Output frame sent");

        if snapshot.iter().any(|value| !ChannelRange::is_neutral(*value)) {
            self.channels.rearm();
        }
        Ok(true)
    }

    /// Spawns the loop. It runs until `stop` turns `true` or a write fails.
    pub(crate) fn spawn(
        self,
        stop: watch::Receiver<bool>,
    ) -> JoinHandle<Result<(), ProtocolError>> {
        tokio::spawn(self.run(stop))
    }

    async fn run(self, mut stop: watch::Receiver<bool>) -> Result<(), ProtocolError> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(device = %self.device_id, period = ?self.period, "Output loop started");

        let result = loop {
            tokio::select! {
                biased;
                () = stopped(&mut stop) => break Ok(()),
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        break Err(e);
                    }
                }
            }
        };

        tracing::debug!(device = %self.device_id, ok = result.is_ok(), "Output loop stopped");
        result
    }
}
