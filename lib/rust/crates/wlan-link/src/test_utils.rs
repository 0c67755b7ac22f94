// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        config::{InterfaceCapabilities, LinkConfig, OpMode, PhyMode},
        device::FakeDevice,
        engine::{Event, LinkEngine},
        frame::{Akm, BeaconInfo, BssCandidate, MgmtBody, RsnInfo, RxAction, RxMgmtFrame},
        stats::Stats,
        Env, LinkTimer, TimedEvent,
    },
    std::collections::HashMap,
    wlan_common::{
        ie::{self, SupportedRate},
        mac::{AuthAlgorithmNumber, CapabilityInfo, MacAddr, StatusCode},
        timer::{EventId, FakeScheduler},
    },
};

pub const LOCAL_ADDR: MacAddr = [0x00, 0x1b, 0xa0, 0x00, 0x00, 0x01];
pub const BSSID: MacAddr = [0x10, 0x11, 0x12, 0x13, 0x14, 0x15];
pub const OTHER_BSSID: MacAddr = [0x20, 0x21, 0x22, 0x23, 0x24, 0x25];
pub const CLIENT_ADDR: MacAddr = [0x30, 0x31, 0x32, 0x33, 0x34, 0x35];
pub const CLIENT_ADDR2: MacAddr = [0x40, 0x41, 0x42, 0x43, 0x44, 0x45];
pub const SSID: &str = "fuchsia";

/// Collaborators for testing a component outside of a `LinkEngine`.
pub struct TestEnv {
    pub device: FakeDevice,
    pub timer: LinkTimer,
    pub scheduler: FakeScheduler,
    pub config: LinkConfig,
    pub stats: Stats,
}

impl TestEnv {
    pub fn new() -> Self {
        let scheduler = FakeScheduler::new();
        Self {
            device: FakeDevice::new(),
            timer: LinkTimer::new(Box::new(scheduler.clone())),
            scheduler,
            config: LinkConfig::default(),
            stats: Stats::default(),
        }
    }

    pub fn env(&mut self) -> Env<'_> {
        Env {
            device: &mut self.device,
            timer: &mut self.timer,
            config: &self.config,
            stats: &mut self.stats,
        }
    }
}

pub fn fake_caps(op_mode: OpMode) -> InterfaceCapabilities {
    let mut supported_rates = HashMap::new();
    supported_rates.insert(PhyMode::Dot11b, ie::rate_set(&[0x82, 0x84, 0x0b, 0x16]));
    supported_rates.insert(
        PhyMode::Dot11g,
        ie::rate_set(&[0x82, 0x84, 0x8b, 0x96, 0x0c, 0x12, 0x18, 0x24, 0x30, 0x48, 0x60, 0x6c]),
    );
    supported_rates.insert(
        PhyMode::Dot11a,
        ie::rate_set(&[0x8c, 0x12, 0x98, 0x24, 0xb0, 0x48, 0x60, 0x6c]),
    );
    InterfaceCapabilities {
        addr: LOCAL_ADDR,
        op_mode,
        phy_mode: PhyMode::Dot11g,
        channel: 6,
        rsn_enabled: false,
        mfp_capable: false,
        short_preamble_capable: true,
        short_slot_capable: true,
        supported_rates,
    }
}

pub fn fake_config() -> LinkConfig {
    LinkConfig { ssid: Some(SSID.to_string()), ..LinkConfig::default() }
}

/// An engine on a `FakeDevice` together with a handle on its scheduler.
pub fn fake_engine(caps: InterfaceCapabilities) -> (LinkEngine<FakeDevice>, FakeScheduler) {
    let scheduler = FakeScheduler::new();
    let engine =
        LinkEngine::new(caps, fake_config(), FakeDevice::new(), Box::new(scheduler.clone()));
    (engine, scheduler)
}

pub fn g_rates() -> Vec<SupportedRate> {
    ie::rate_set(&[0x82, 0x84, 0x8b, 0x96, 0x0c, 0x12, 0x18, 0x24, 0x30, 0x48, 0x60, 0x6c])
}

pub fn b_rates() -> Vec<SupportedRate> {
    ie::rate_set(&[0x82, 0x84, 0x0b, 0x16])
}

pub fn ess_caps() -> CapabilityInfo {
    let mut caps = CapabilityInfo::default();
    caps.set_ess(true);
    caps.set_short_slot_time(true);
    caps.set_short_preamble(true);
    caps
}

pub fn ibss_caps() -> CapabilityInfo {
    let mut caps = CapabilityInfo::default();
    caps.set_ibss(true);
    caps
}

pub fn psk_rsn() -> RsnInfo {
    RsnInfo { akm: Akm::Psk, mfp_capable: false, mfp_required: false }
}

pub fn candidate(bssid: MacAddr, rssi_dbm: i8) -> BssCandidate {
    BssCandidate {
        bssid,
        ssid: SSID.as_bytes().to_vec(),
        channel: 6,
        rssi_dbm,
        capabilities: ess_caps(),
        rates: g_rates(),
        rsn: None,
        erp_use_protection: false,
        qos: true,
    }
}

pub fn mgmt(src: MacAddr, bssid: MacAddr, body: MgmtBody) -> Event {
    let dst = if src == bssid { LOCAL_ADDR } else { bssid };
    Event::MgmtFrameRx(RxMgmtFrame { src, dst, bssid, body })
}

pub fn auth(seq: u16, status: StatusCode) -> MgmtBody {
    MgmtBody::Auth { algorithm: AuthAlgorithmNumber::OPEN, seq, status }
}

pub fn assoc_req(rates: Vec<SupportedRate>, rsn: Option<RsnInfo>) -> MgmtBody {
    MgmtBody::AssocReq {
        reassoc: false,
        capabilities: ess_caps(),
        ssid: SSID.as_bytes().to_vec(),
        rates,
        rsn,
        qos: true,
    }
}

pub fn assoc_resp(status: StatusCode, aid: u16) -> MgmtBody {
    MgmtBody::AssocResp {
        reassoc: false,
        capabilities: ess_caps(),
        status,
        aid,
        rates: g_rates(),
        qos: true,
    }
}

pub fn beacon(tsf: u64, local_tsf: u64) -> MgmtBody {
    MgmtBody::Beacon(BeaconInfo {
        ssid: SSID.as_bytes().to_vec(),
        capabilities: ibss_caps(),
        rates: g_rates(),
        erp_use_protection: false,
        tsf,
        local_tsf,
    })
}

pub fn action(action: RxAction) -> MgmtBody {
    MgmtBody::Action(action)
}

/// Pending timeouts carrying `event`, oldest first.
pub fn timers_for(engine: &LinkEngine<FakeDevice>, event: TimedEvent) -> Vec<EventId> {
    let mut ids: Vec<EventId> = engine
        .timer()
        .scheduled_events()
        .filter(|(_, e)| **e == event)
        .map(|(id, _)| *id)
        .collect();
    ids.sort();
    ids
}
