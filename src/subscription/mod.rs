// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener registration.
//!
//! Devices publish [`StateChange`](crate::state::StateChange)s and the
//! repository publishes the full ordered device list. Both keep their
//! listeners in a [`CallbackRegistry`] and hand out [`SubscriptionId`]s.
//!
//! Listeners are called synchronously on whichever thread or task performed
//! the change. Moving the work elsewhere is the listener's concern.
//!
//! ```no_run
//! use brickctl::Device;
//! use brickctl::protocol::MemoryTransport;
//!
//! # fn example(device: &Device<MemoryTransport>) {
//! let sub_id = device.subscribe(|change| {
//!     println!("{} -> {}", change.previous, change.current);
//! });
//!
//! // Later, unsubscribe
//! device.unsubscribe(sub_id);
//! # }
//! ```

mod callback;

pub use callback::{CallbackRegistry, SubscriptionId};
