// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection task.
//!
//! One supervisor task runs per connection attempt. It owns the session
//! from the moment the transport hands it out until it is closed, drives
//! the state machine forward, runs the output loop while connected, and
//! always ends by moving the device back to `Disconnected`.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinError;

use crate::error::ProtocolError;
use crate::protocol::{DEVICE_INFORMATION_SERVICE, Session, Transport};

use super::Shared;
use super::info::DeviceInfo;
use super::output_loop::OutputLoop;

/// Runs one connection attempt to completion.
pub(super) async fn run<T: Transport>(shared: Arc<Shared<T>>, mut stop: watch::Receiver<bool>) {
    let result = connect_and_serve(&shared, &mut stop).await;
    shared.finish(result);
}

/// Completes once a stop has been requested.
///
/// Resolves to `()` so no `watch::Ref` outlives the select arm that awaits it.
pub(super) async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as a request
    let _ = stop.wait_for(|requested| *requested).await;
}

async fn connect_and_serve<T: Transport>(
    shared: &Shared<T>,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), ProtocolError> {
    tracing::debug!(device = %shared.id, address = %shared.address, "Opening transport link");

    let session = tokio::select! {
        biased;
        () = stopped(stop) => return Ok(()),
        result = shared.transport.connect(&shared.address) => Arc::new(result?),
    };

    let result = serve(shared, &session, stop).await;

    // A lost link has nothing left to close
    if !matches!(result, Err(ProtocolError::LinkLost))
        && let Err(e) = session.disconnect().await
    {
        tracing::warn!(device = %shared.id, error = %e, "Transport disconnect reported an error");
    }
    result
}

async fn serve<T: Transport>(
    shared: &Shared<T>,
    session: &Arc<T::Session>,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), ProtocolError> {
    let info = tokio::select! {
        biased;
        () = stopped(stop) => return Ok(()),
        () = session.link_lost() => return Err(ProtocolError::LinkLost),
        result = setup(shared, session.as_ref()) => result?,
    };

    if !shared.enter_connected(info) {
        return Ok(());
    }

    let (loop_stop_tx, loop_stop_rx) = watch::channel(false);
    let mut output = OutputLoop::new(
        Arc::clone(&shared.id),
        Arc::clone(session),
        shared.codec,
        Arc::clone(&shared.channels),
        shared.config.tick_period(),
    )
    .spawn(loop_stop_rx);

    let link_lost = session.link_lost();
    tokio::pin!(link_lost);

    let outcome = tokio::select! {
        () = stopped(stop) => Ok(()),
        () = &mut link_lost => Err(ProtocolError::LinkLost),
        joined = &mut output => return flatten(joined),
    };

    loop_stop_tx.send_replace(true);
    if let Err(e) = flatten(output.await) {
        tracing::debug!(device = %shared.id, error = %e, "Output loop ended with an error during shutdown");
    }
    outcome
}

/// Family setup after the link is up: verify the output service and read
/// the device information when the peripheral offers it.
async fn setup<T: Transport>(
    shared: &Shared<T>,
    session: &T::Session,
) -> Result<Option<DeviceInfo>, ProtocolError> {
    let services = session.discover_services().await?;

    let required = shared.codec.service();
    if !services.contains(&required) {
        return Err(ProtocolError::ServiceNotFound(required));
    }

    if services.contains(&DEVICE_INFORMATION_SERVICE) {
        Ok(Some(DeviceInfo::read(session, &shared.id).await))
    } else {
        Ok(None)
    }
}

fn flatten(joined: Result<Result<(), ProtocolError>, JoinError>) -> Result<(), ProtocolError> {
    joined.unwrap_or_else(|e| Err(ProtocolError::WriteFailed(format!("output loop aborted: {e}"))))
}
