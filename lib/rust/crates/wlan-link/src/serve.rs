// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        device::DeviceOps,
        engine::{Event, LinkEngine},
        error::Error,
    },
    futures::{channel::mpsc, prelude::*},
    log::{error, info, warn},
    wlan_common::sink::UnboundedSink,
};

/// Where receive path, scheduler and administrative callers post their events.
pub type EventSink = UnboundedSink<Event>;
pub type EventStream = mpsc::UnboundedReceiver<Event>;

pub fn event_channel() -> (EventSink, EventStream) {
    let (sender, receiver) = mpsc::unbounded();
    (UnboundedSink::new(sender), receiver)
}

/// Feeds `events` into `engine` one at a time until the stream ends, then hands the engine
/// back. A failed event is logged and never stops the loop.
pub async fn serve<D, S>(mut engine: LinkEngine<D>, mut events: S) -> LinkEngine<D>
where
    D: DeviceOps,
    S: Stream<Item = Event> + Unpin,
{
    while let Some(event) = events.next().await {
        if let Err(e) = engine.handle_event(event) {
            match e {
                Error::Internal(_) | Error::Device(_) => error!("link engine: {}", e),
                _ => warn!("link engine: {}", e),
            }
        }
    }
    info!("event stream closed in state {:?}", engine.state());
    engine
}
