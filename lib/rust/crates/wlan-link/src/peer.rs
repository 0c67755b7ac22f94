// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        block_ack::BlockAckSessions,
        error::Error,
        frame::{BssCandidate, RsnInfo},
        key::KeyRecord,
        Env,
    },
    log::debug,
    std::{collections::HashMap, time::Instant},
    wlan_common::{
        ie::{self, SupportedRate},
        mac::{Aid, CapabilityInfo, MacAddr, MacFmt, MAX_AID},
        timer::EventId,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Known from a scan or a first frame, no exchange completed yet.
    Cache,
    Authenticated,
    Associated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairwiseState {
    Idle,
    /// Associated with RSN, waiting for a key run to be requested.
    AwaitingPmk,
    /// Message 1 of the 4-Way Handshake was triggered.
    PmkInstalled,
    PtkInitDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKeyState {
    Idle,
    RekeyInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaQueryState {
    Idle,
    InProgress,
    Failed,
}

#[derive(Debug)]
pub struct SecurityState {
    pub rsn: Option<RsnInfo>,
    /// Management frame protection negotiated with this peer.
    pub mfp: bool,
    pub pmk_present: bool,
    pub pairwise_key_installed: bool,
    pub pairwise: PairwiseState,
    pub group: GroupKeyState,
    pub replay_counter_initialized: bool,
    pub sa_query: SaQueryState,
    pub sa_query_attempts: u8,
    pub sa_query_trans_id: u16,
    pub eapol_retries: u8,
    pub(crate) pairwise_key: Option<KeyRecord>,
    pub(crate) sa_query_timer: Option<EventId>,
    pub(crate) eapol_timer: Option<EventId>,
}

impl Default for SecurityState {
    fn default() -> Self {
        Self {
            rsn: None,
            mfp: false,
            pmk_present: false,
            pairwise_key_installed: false,
            pairwise: PairwiseState::Idle,
            group: GroupKeyState::Idle,
            replay_counter_initialized: false,
            sa_query: SaQueryState::Idle,
            sa_query_attempts: 0,
            sa_query_trans_id: 0,
            eapol_retries: 0,
            pairwise_key: None,
            sa_query_timer: None,
            eapol_timer: None,
        }
    }
}

impl SecurityState {
    pub fn sa_query_timer(&self) -> Option<EventId> {
        self.sa_query_timer
    }

    pub fn eapol_timer(&self) -> Option<EventId> {
        self.eapol_timer
    }
}

/// A remote station, or in Station mode the BSS we join.
#[derive(Debug)]
pub struct PeerNode {
    pub addr: MacAddr,
    pub state: PeerState,
    pub aid: Option<Aid>,
    pub rates: Vec<SupportedRate>,
    /// Index into `rates` of the rate used for transmission.
    pub txrate: usize,
    pub capabilities: CapabilityInfo,
    pub qos: bool,
    pub ssid: Vec<u8>,
    pub channel: u8,
    pub rssi_dbm: i8,
    /// Use_Protection as last advertised by this BSS.
    pub erp_use_protection: bool,
    pub fails: u32,
    pub last_seen: Instant,
    pub block_ack: BlockAckSessions,
    pub security: SecurityState,
}

impl PeerNode {
    pub fn new(addr: MacAddr) -> Self {
        Self {
            addr,
            state: PeerState::Cache,
            aid: None,
            rates: vec![],
            txrate: 0,
            capabilities: CapabilityInfo::default(),
            qos: false,
            ssid: vec![],
            channel: 0,
            rssi_dbm: i8::min_value(),
            erp_use_protection: false,
            fails: 0,
            last_seen: Instant::now(),
            block_ack: BlockAckSessions::new(addr),
            security: SecurityState::default(),
        }
    }

    pub fn update_from_candidate(&mut self, candidate: &BssCandidate) {
        self.ssid = candidate.ssid.clone();
        self.channel = candidate.channel;
        self.rssi_dbm = candidate.rssi_dbm;
        self.capabilities = candidate.capabilities;
        self.rates = candidate.rates.clone();
        self.qos = candidate.qos;
        self.erp_use_protection = candidate.erp_use_protection;
        self.security.rsn = candidate.rsn;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_associated(&self) -> bool {
        self.state == PeerState::Associated
    }

    /// Whether the peer can use ERP-OFDM rates.
    pub fn is_erp(&self) -> bool {
        ie::has_ofdm_rate(&self.rates)
    }

    /// Sets the transmit rate to the highest negotiated rate.
    pub fn set_rates(&mut self, rates: Vec<SupportedRate>) {
        self.txrate = rates.len().saturating_sub(1);
        self.rates = rates;
    }

    /// Drops all link state with this peer: timers, BlockAck sessions and keys. Nothing is
    /// transmitted.
    pub fn reset_link(&mut self, env: &mut Env<'_>) {
        for timer in
            self.security.sa_query_timer.take().into_iter().chain(self.security.eapol_timer.take())
        {
            env.timer.cancel_event(timer);
        }
        self.block_ack.release_all(env);
        if let Some(key) = self.security.pairwise_key.take() {
            env.device.delete_key(&key);
        }
        let rsn = self.security.rsn;
        self.security = SecurityState { rsn, ..SecurityState::default() };
    }
}

/// Peers known to the interface, keyed by address.
pub struct PeerTable {
    peers: HashMap<MacAddr, PeerNode>,
    capacity: usize,
}

impl PeerTable {
    pub fn new(capacity: usize) -> Self {
        Self { peers: HashMap::new(), capacity }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, addr: &MacAddr) -> bool {
        self.peers.contains_key(addr)
    }

    pub fn get(&self, addr: &MacAddr) -> Option<&PeerNode> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &MacAddr) -> Option<&mut PeerNode> {
        self.peers.get_mut(addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerNode> {
        self.peers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PeerNode> {
        self.peers.values_mut()
    }

    pub fn associated(&self) -> Vec<MacAddr> {
        self.peers.values().filter(|p| p.is_associated()).map(|p| p.addr).collect()
    }

    pub fn get_or_insert(&mut self, addr: &MacAddr) -> Result<&mut PeerNode, Error> {
        if !self.peers.contains_key(addr) && self.peers.len() >= self.capacity {
            return Err(Error::PeerTableFull(self.capacity));
        }
        Ok(self.peers.entry(*addr).or_insert_with(|| PeerNode::new(*addr)))
    }

    /// The only way a peer leaves the table. Every timer the peer owns is canceled so none can
    /// fire for a peer that no longer exists.
    pub fn remove(&mut self, addr: &MacAddr, env: &mut Env<'_>) -> Option<PeerNode> {
        let mut peer = self.peers.remove(addr)?;
        peer.reset_link(env);
        debug!("removed peer {}", MacFmt(addr));
        Some(peer)
    }

    pub fn clear(&mut self, env: &mut Env<'_>) {
        let addrs: Vec<MacAddr> = self.peers.keys().copied().collect();
        for addr in addrs {
            self.remove(&addr, env);
        }
    }

    /// Lowest association ID not in use.
    pub fn free_aid(&self) -> Option<Aid> {
        (1..=MAX_AID).find(|aid| !self.peers.values().any(|p| p.aid == Some(*aid)))
    }
}
