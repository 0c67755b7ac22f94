// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! 802.11 link-layer engine: drives a station, IBSS member or access point through
//! authentication, association, key handshakes and BlockAck session management.

/// Borrows the parts of a `LinkEngine` that make up an `Env`, leaving the peer table and the
/// other context fields available.
macro_rules! link_env {
    ($engine:expr) => {
        &mut $crate::Env {
            device: &mut $engine.device,
            timer: &mut $engine.timer,
            config: &$engine.ctx.config,
            stats: &mut $engine.ctx.stats,
        }
    };
}

pub mod block_ack;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod frame;
pub mod key;
pub mod peer;
pub mod protection;
pub mod rates;
mod rx;
pub mod sa_query;
pub mod serve;
pub mod state;
pub mod stats;
#[cfg(test)]
mod test_utils;

pub use {
    engine::{AdminRequest, Event, LinkEngine},
    error::Error,
    serve::{serve, EventSink},
};

use {
    crate::{
        block_ack::Direction,
        config::LinkConfig,
        device::{DeviceOps, MgmtFrame},
        stats::Stats,
    },
    wlan_common::{mac::MacAddr, timer::Timer},
};

/// Payload of every timeout the engine arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    /// AUTH or ASSOC response did not arrive.
    MgmtTimeout,
    BlockAck { peer: MacAddr, tid: u8, direction: Direction },
    SaQuery { peer: MacAddr },
    Eapol { peer: MacAddr },
    GroupRekey,
}

pub type LinkTimer = Timer<TimedEvent>;

/// What a component may touch besides the one peer it was handed.
pub struct Env<'a> {
    pub device: &'a mut dyn DeviceOps,
    pub timer: &'a mut LinkTimer,
    pub config: &'a LinkConfig,
    pub stats: &'a mut Stats,
}

impl<'a> Env<'a> {
    pub fn send(&mut self, peer: &MacAddr, frame: MgmtFrame) {
        self.stats.tx_mgmt += 1;
        self.device.send_mgmt(peer, frame);
    }
}
