// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        block_ack::{Direction, SessionState},
        config::{InterfaceCapabilities, LinkConfig, OpMode},
        device::{DeviceOps, LinkStatus, MgmtFrame},
        error::Error,
        frame::{BssCandidate, RxMgmtFrame},
        key::{self, EapolTimeout, KeyCoordinator, KeyKind, KeyRecord},
        peer::{GroupKeyState, PairwiseState, PeerNode, PeerState, PeerTable},
        protection::ProtectionPolicy,
        rates::{RateNegotiator, ReconcileFlags},
        sa_query,
        state::{LinkState, Teardown, Trigger},
        stats::Stats,
        LinkTimer, TimedEvent,
    },
    log::{debug, error, info, warn},
    wlan_common::{
        ie::SupportedRate,
        mac::{self, MacAddr, MacFmt, ReasonCode},
        timer::{EventId, Scheduler},
    },
};

/// Everything that enters the engine.
#[derive(Debug)]
pub enum Event {
    MgmtFrameRx(RxMgmtFrame),
    Timeout(EventId),
    ScanResult(BssCandidate),
    ScanComplete,
    BeaconLoss,
    Admin(AdminRequest),
    /// The authenticator or supplicant finished the 4-Way Handshake with `peer`.
    PairwiseHandshakeComplete { peer: MacAddr, key: KeyRecord },
    /// `peer` acknowledged the group key of the current rotation.
    GroupKeyAck { peer: MacAddr },
    /// Station mode: the supplicant obtained a group key from the AP.
    GroupKeyReceived { key: KeyRecord },
    /// The data path has frames for `peer` on `tid`, starting at sequence number `ssn`.
    TrafficDemand { peer: MacAddr, tid: u8, ssn: u16 },
}

#[derive(Debug)]
pub enum AdminRequest {
    Start,
    Stop { teardown: Teardown },
    RequestHandshake { peer: MacAddr },
    RotateGroupKey,
    RequestSaQuery { peer: MacAddr },
    RequestBlockAck { peer: MacAddr, tid: u8, ssn: u16 },
    DeleteBlockAck { peer: MacAddr, tid: u8, direction: Direction, reason: ReasonCode },
    Deauthenticate { peer: MacAddr, reason: ReasonCode },
    SetPsk { pmk: Vec<u8> },
    AddPmk { peer: MacAddr, pmk: Vec<u8> },
}

/// State of one radio interface. Owns the peer table.
pub struct InterfaceContext {
    pub caps: InterfaceCapabilities,
    pub config: LinkConfig,
    pub state: LinkState,
    /// BSSID of the BSS we joined or created. Our own address while there is none.
    pub bssid: MacAddr,
    /// The peer standing for the joined BSS in Station and IBSS mode.
    pub bss: Option<MacAddr>,
    pub peers: PeerTable,
    pub stats: Stats,
    pub protection: ProtectionPolicy,
    pub keys: KeyCoordinator,
    pub link_status: LinkStatus,
    pub(crate) mgmt_timer: Option<EventId>,
}

pub struct LinkEngine<D> {
    pub(crate) ctx: InterfaceContext,
    pub(crate) device: D,
    pub(crate) timer: LinkTimer,
}

pub(crate) fn negotiator<'a>(
    caps: &'a InterfaceCapabilities,
    config: &LinkConfig,
) -> RateNegotiator<'a> {
    RateNegotiator::new(caps.rates(), config.fixed_rate, caps.op_mode)
}

impl<D: DeviceOps> LinkEngine<D> {
    pub fn new(
        caps: InterfaceCapabilities,
        config: LinkConfig,
        device: D,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let ctx = InterfaceContext {
            bssid: caps.addr,
            state: LinkState::Init,
            bss: None,
            peers: PeerTable::new(config.max_peers),
            stats: Stats::default(),
            protection: ProtectionPolicy::new(config.protection_mode),
            keys: KeyCoordinator::new(),
            link_status: LinkStatus::Unknown,
            mgmt_timer: None,
            caps,
            config,
        };
        Self { ctx, device, timer: LinkTimer::new(scheduler) }
    }

    pub fn state(&self) -> LinkState {
        self.ctx.state
    }

    pub fn context(&self) -> &InterfaceContext {
        &self.ctx
    }

    pub fn stats(&self) -> &Stats {
        &self.ctx.stats
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn timer(&self) -> &LinkTimer {
        &self.timer
    }

    /// Processes one event to completion.
    pub fn handle_event(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::MgmtFrameRx(frame) => self.handle_mgmt_frame(frame),
            Event::Timeout(id) => self.handle_timeout(id),
            Event::ScanResult(candidate) => self.handle_scan_result(candidate),
            Event::ScanComplete => self.handle_scan_complete(),
            Event::BeaconLoss => self.handle_beacon_loss(),
            Event::Admin(req) => self.handle_admin(req),
            Event::PairwiseHandshakeComplete { peer, key } => {
                self.on_pairwise_handshake_complete(&peer, key)
            }
            Event::GroupKeyAck { peer } => self.on_group_key_ack(&peer),
            Event::GroupKeyReceived { key } => self.on_group_key_received(key),
            Event::TrafficDemand { peer, tid, ssn } => self.on_traffic_demand(&peer, tid, ssn),
        }
    }

    fn handle_admin(&mut self, req: AdminRequest) -> Result<(), Error> {
        match req {
            AdminRequest::Start => self.start(),
            AdminRequest::Stop { teardown } => {
                self.stop(teardown);
                Ok(())
            }
            AdminRequest::RequestHandshake { peer } => self.request_handshake(&peer),
            AdminRequest::RotateGroupKey => self.rotate_group_key(),
            AdminRequest::RequestSaQuery { peer } => self.request_sa_query(&peer),
            AdminRequest::RequestBlockAck { peer, tid, ssn } => {
                self.request_block_ack(&peer, tid, ssn)
            }
            AdminRequest::DeleteBlockAck { peer, tid, direction, reason } => {
                self.delete_block_ack(&peer, tid, direction, reason)
            }
            AdminRequest::Deauthenticate { peer, reason } => self.deauthenticate(&peer, reason),
            AdminRequest::SetPsk { pmk } => {
                self.ctx.keys.set_psk(pmk);
                Ok(())
            }
            AdminRequest::AddPmk { peer, pmk } => {
                self.ctx.keys.add_pmk(peer, pmk);
                Ok(())
            }
        }
    }

    /// Leaves INIT. Stations and IBSS members start scanning, an access point creates its BSS.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.ctx.state != LinkState::Init {
            return Err(Error::InvalidState(format!("already started ({:?})", self.ctx.state)));
        }
        self.set_link_status(LinkStatus::Down);
        self.new_state(LinkState::Scan, Trigger::Request)?;
        match self.ctx.caps.op_mode {
            OpMode::AccessPoint | OpMode::Monitor => self.create_bss(Trigger::Request),
            OpMode::Station | OpMode::Ibss => Ok(()),
        }
    }

    /// Returns to INIT from any state.
    pub fn stop(&mut self, teardown: Teardown) {
        self.enter_init(teardown);
    }

    pub(crate) fn send(&mut self, peer: &MacAddr, frame: MgmtFrame) {
        link_env!(self).send(peer, frame);
    }

    /// Notifies the device only when the link status actually changes.
    pub(crate) fn set_link_status(&mut self, status: LinkStatus) {
        if self.ctx.link_status != status {
            info!("link status {:?}", status);
            self.ctx.link_status = status;
            self.device.set_link_status(status);
        }
    }

    pub(crate) fn install_key(&mut self, key: &KeyRecord) -> Result<(), Error> {
        match self.device.install_key(key) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.ctx.stats.key_install_failures += 1;
                error!("failed to install {:?} key {}: {}", key.kind, key.key_id, e);
                Err(Error::Device(e))
            }
        }
    }

    pub(crate) fn arm_mgmt_timer(&mut self) {
        self.cancel_mgmt_timer();
        let timeout = self.ctx.config.mgmt_timeout();
        self.ctx.mgmt_timer = Some(self.timer.schedule_after(timeout, TimedEvent::MgmtTimeout));
    }

    pub(crate) fn cancel_mgmt_timer(&mut self) {
        if let Some(timer) = self.ctx.mgmt_timer.take() {
            self.timer.cancel_event(timer);
        }
    }

    /// Drops a peer and all of its timers, sessions and keys without any frame exchange.
    pub(crate) fn remove_peer(&mut self, addr: &MacAddr) -> Result<(), Error> {
        let env = link_env!(self);
        let peer = match self.ctx.peers.remove(addr, env) {
            Some(peer) => peer,
            None => return Ok(()),
        };
        if peer.is_associated() && self.ctx.caps.op_mode == OpMode::AccessPoint {
            self.ctx.protection.on_peer_left(
                &self.ctx.caps,
                peer.capabilities,
                peer.is_erp(),
                &mut self.device,
            );
        }
        if self.ctx.bss == Some(*addr) {
            self.ctx.bss = None;
        }
        self.maybe_complete_group_rekey()
    }

    pub(crate) fn deauth_and_remove(
        &mut self,
        addr: &MacAddr,
        reason: ReasonCode,
    ) -> Result<(), Error> {
        warn!("deauthenticating {}: {:?}", MacFmt(addr), reason);
        self.send(addr, MgmtFrame::Deauth { reason });
        self.remove_peer(addr)
    }

    pub fn deauthenticate(&mut self, addr: &MacAddr, reason: ReasonCode) -> Result<(), Error> {
        match self.ctx.caps.op_mode {
            OpMode::AccessPoint | OpMode::Ibss => {
                if !self.ctx.peers.contains(addr) {
                    return Err(Error::NoSuchPeer(*addr));
                }
                self.deauth_and_remove(addr, reason)
            }
            OpMode::Station => {
                if self.ctx.bss != Some(*addr) {
                    return Err(Error::NoSuchPeer(*addr));
                }
                match self.ctx.state {
                    LinkState::Auth | LinkState::Assoc | LinkState::Run => {
                        self.send(addr, MgmtFrame::Deauth { reason });
                        self.enter_init(Teardown::Silent);
                        Ok(())
                    }
                    state => Err(Error::InvalidState(format!("not authenticated ({:?})", state))),
                }
            }
            OpMode::Monitor => Err(Error::InvalidState("monitor interface".to_string())),
        }
    }

    fn handle_timeout(&mut self, id: EventId) -> Result<(), Error> {
        let event = match self.timer.triggered(&id) {
            Some(event) => event,
            None => {
                debug!("ignoring canceled timeout {:?}", id);
                return Ok(());
            }
        };
        match event {
            TimedEvent::MgmtTimeout => self.on_mgmt_timeout(id),
            TimedEvent::BlockAck { peer, tid, direction } => {
                let env = link_env!(self);
                if let Some(node) = self.ctx.peers.get_mut(&peer) {
                    node.block_ack.on_timeout(id, tid, direction, env);
                }
                Ok(())
            }
            TimedEvent::SaQuery { peer } => {
                let env = link_env!(self);
                if let Some(node) = self.ctx.peers.get_mut(&peer) {
                    sa_query::on_timeout(id, node, env);
                }
                Ok(())
            }
            TimedEvent::Eapol { peer } => {
                let env = link_env!(self);
                let outcome = match self.ctx.peers.get_mut(&peer) {
                    Some(node) => self.ctx.keys.on_eapol_timeout(id, node, env),
                    None => EapolTimeout::Ignored,
                };
                if let EapolTimeout::GiveUp(reason) = outcome {
                    self.deauth_and_remove(&peer, reason)?;
                }
                Ok(())
            }
            TimedEvent::GroupRekey => {
                if self.ctx.keys.take_rekey_timer(id) {
                    self.rotate_group_key()
                } else {
                    Ok(())
                }
            }
        }
    }

    fn on_mgmt_timeout(&mut self, id: EventId) -> Result<(), Error> {
        if self.ctx.mgmt_timer != Some(id) {
            return Ok(());
        }
        self.ctx.mgmt_timer = None;
        let state = self.ctx.state;
        match state {
            LinkState::Auth | LinkState::Assoc => {
                self.ctx.stats.mgmt_timeouts += 1;
                if let Some(node) = self.bss_node_mut() {
                    node.fails += 1;
                    warn!("no response from {} in {:?}", MacFmt(&node.addr), state);
                }
                self.new_state(LinkState::Scan, Trigger::Request)
            }
            _ => Ok(()),
        }
    }

    fn handle_scan_result(&mut self, candidate: BssCandidate) -> Result<(), Error> {
        if self.ctx.state != LinkState::Scan {
            debug!("dropping scan result for {} outside SCAN", MacFmt(&candidate.bssid));
            return Ok(());
        }
        match self.ctx.peers.get_or_insert(&candidate.bssid) {
            Ok(node) => {
                node.update_from_candidate(&candidate);
                Ok(())
            }
            Err(e) => {
                self.ctx.stats.node_alloc_fail += 1;
                warn!("no room for candidate {}: {}", MacFmt(&candidate.bssid), e);
                Err(e)
            }
        }
    }

    fn handle_scan_complete(&mut self) -> Result<(), Error> {
        if self.ctx.state != LinkState::Scan {
            return Ok(());
        }
        match (self.ctx.caps.op_mode, self.select_bss()) {
            (OpMode::Station, Some((addr, rates))) => {
                self.join_bss(addr, rates);
                self.new_state(LinkState::Auth, Trigger::Request)
            }
            (OpMode::Station, None) => {
                info!("no suitable BSS found");
                self.new_state(LinkState::Scan, Trigger::NoMoreCandidates)
            }
            (OpMode::Ibss, Some((addr, rates))) => {
                self.join_bss(addr, rates);
                self.new_state(LinkState::Run, Trigger::Request)
            }
            (OpMode::Ibss, None) => self.create_bss(Trigger::NoMoreCandidates),
            _ => Ok(()),
        }
    }

    /// Picks the strongest candidate that matches our SSID, security requirement and rates and
    /// did not fail too often. Returns it with its negotiated rate set.
    fn select_bss(&self) -> Option<(MacAddr, Vec<SupportedRate>)> {
        let ibss = self.ctx.caps.op_mode == OpMode::Ibss;
        let negotiator = negotiator(&self.ctx.caps, &self.ctx.config);
        let mut best: Option<(MacAddr, i8, Vec<SupportedRate>)> = None;
        for peer in self.ctx.peers.iter() {
            if peer.fails > self.ctx.config.max_failures {
                debug!("skipping {}: {} failures", MacFmt(&peer.addr), peer.fails);
                continue;
            }
            if let Some(ssid) = self.ctx.config.ssid_bytes() {
                if peer.ssid != ssid {
                    continue;
                }
            }
            let mode_matches =
                if ibss { peer.capabilities.ibss() } else { peer.capabilities.ess() };
            if !mode_matches {
                continue;
            }
            if !ibss && self.ctx.caps.rsn_enabled != peer.security.rsn.is_some() {
                debug!("skipping {}: security mismatch", MacFmt(&peer.addr));
                continue;
            }
            let mut rates = peer.rates.clone();
            if let Err(e) = negotiator.reconcile(&mut rates, ReconcileFlags::all()) {
                debug!("skipping {}: {}", MacFmt(&peer.addr), e);
                continue;
            }
            let better = match &best {
                None => true,
                Some((addr, rssi, _)) => {
                    peer.rssi_dbm > *rssi || (peer.rssi_dbm == *rssi && peer.addr < *addr)
                }
            };
            if better {
                best = Some((peer.addr, peer.rssi_dbm, rates));
            }
        }
        best.map(|(addr, _, rates)| (addr, rates))
    }

    fn join_bss(&mut self, addr: MacAddr, rates: Vec<SupportedRate>) {
        info!("joining BSS {}", MacFmt(&addr));
        if let Some(node) = self.ctx.peers.get_mut(&addr) {
            node.set_rates(rates);
        }
        self.ctx.bss = Some(addr);
        self.ctx.bssid = addr;
    }

    /// Starts our own BSS. Access points use their address as BSSID, IBSS members a random
    /// locally administered one.
    pub(crate) fn create_bss(&mut self, trigger: Trigger) -> Result<(), Error> {
        self.ctx.bssid = match self.ctx.caps.op_mode {
            OpMode::Ibss => mac::locally_administered(&self.ctx.caps.addr),
            _ => self.ctx.caps.addr,
        };
        self.ctx.bss = None;
        info!("creating BSS {}", MacFmt(&self.ctx.bssid));
        self.new_state(LinkState::Run, trigger)
    }

    fn handle_beacon_loss(&mut self) -> Result<(), Error> {
        match (self.ctx.caps.op_mode, self.ctx.state) {
            (OpMode::Station, LinkState::Run) | (OpMode::Ibss, LinkState::Run) => {
                self.ctx.stats.beacon_losses += 1;
                warn!("lost beacons of {}", MacFmt(&self.ctx.bssid));
                self.new_state(LinkState::Scan, Trigger::Request)
            }
            _ => Ok(()),
        }
    }

    fn require_rsn_run(&self) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run || !self.ctx.caps.rsn_enabled {
            return Err(Error::InvalidState(format!(
                "key handshakes need RSN in RUN ({:?}, rsn {})",
                self.ctx.state, self.ctx.caps.rsn_enabled
            )));
        }
        Ok(())
    }

    /// Starts the 4-Way Handshake with an associated peer. A peer without a cached PMK is
    /// deauthenticated and removed.
    pub fn request_handshake(&mut self, addr: &MacAddr) -> Result<(), Error> {
        self.require_rsn_run()?;
        match self.ctx.caps.op_mode {
            OpMode::AccessPoint => {}
            // The supplicant never initiates.
            OpMode::Station => return Ok(()),
            op_mode => {
                return Err(Error::InvalidState(format!("no key handshakes in {:?}", op_mode)))
            }
        }
        let env = link_env!(self);
        let node = self.ctx.peers.get_mut(addr).ok_or(Error::NoSuchPeer(*addr))?;
        match self.ctx.keys.start_pairwise(node, env) {
            Err(Error::NoPmk(addr)) => {
                self.deauth_and_remove(&addr, ReasonCode::LEAVING_NETWORK_DEAUTH)?;
                Err(Error::NoPmk(addr))
            }
            result => result,
        }
    }

    /// Rotates the group keys and starts the Group Key Handshake with every keyed peer. The
    /// periodic timer is rearmed whether or not the previous round completed.
    pub fn rotate_group_key(&mut self) -> Result<(), Error> {
        self.require_rsn_run()?;
        if self.ctx.caps.op_mode != OpMode::AccessPoint {
            return Err(Error::InvalidState("group keys are owned by the AP".to_string()));
        }
        let mfp = self.ctx.caps.mfp_capable;
        let env = link_env!(self);
        self.ctx.keys.arm_rekey_timer(env);
        self.ctx.keys.begin_rotation(mfp, env);
        let mut marked = 0;
        for node in self.ctx.peers.iter_mut() {
            if self.ctx.keys.start_group_handshake(node, env) {
                marked += 1;
            }
        }
        info!("group key handshake started with {} peers", marked);
        self.maybe_complete_group_rekey()
    }

    /// Installs the rotated group keys once no peer is rekey-in-progress anymore. A failed
    /// install leaves the rotation pending until a peer removal or the next rotation.
    pub(crate) fn maybe_complete_group_rekey(&mut self) -> Result<(), Error> {
        if !self.ctx.keys.rekey_pending() {
            return Ok(());
        }
        if self.ctx.peers.iter().any(|p| p.security.group == GroupKeyState::RekeyInProgress) {
            return Ok(());
        }
        let keys = match self.ctx.keys.complete_group_rekey() {
            Some(keys) => keys,
            None => return Ok(()),
        };
        for key in &keys {
            if let Err(e) = self.install_key(key) {
                self.ctx.keys.defer_group_rekey();
                return Err(e);
            }
        }
        self.ctx.stats.group_rekeys_completed += 1;
        info!("group key rotation complete");
        Ok(())
    }

    fn on_pairwise_handshake_complete(
        &mut self,
        addr: &MacAddr,
        key: KeyRecord,
    ) -> Result<(), Error> {
        let op_mode = self.ctx.caps.op_mode;
        let bss = self.ctx.bss;
        let expected = self.ctx.state == LinkState::Run
            && key.kind == KeyKind::Pairwise
            && match self.ctx.peers.get(addr) {
                Some(node) => match op_mode {
                    OpMode::AccessPoint => node.security.pairwise == PairwiseState::PmkInstalled,
                    OpMode::Station => {
                        bss == Some(*addr)
                            && node.is_associated()
                            && node.security.pairwise != PairwiseState::PtkInitDone
                    }
                    _ => false,
                },
                None => false,
            };
        if !expected {
            debug!("unexpected pairwise key for {}", MacFmt(addr));
            self.ctx.stats.rx_unexpected_key += 1;
            return Ok(());
        }

        if let Err(e) = self.install_key(&key) {
            if op_mode == OpMode::AccessPoint {
                self.deauth_and_remove(addr, ReasonCode::UNSPECIFIED_REASON)?;
            }
            return Err(e);
        }
        let env = link_env!(self);
        if let Some(node) = self.ctx.peers.get_mut(addr) {
            key::disarm_eapol_timer(node, env);
            node.security.pairwise = PairwiseState::PtkInitDone;
            node.security.pairwise_key_installed = true;
            node.security.replay_counter_initialized = true;
            node.security.pairwise_key = Some(key);
        }
        info!("pairwise key installed for {}", MacFmt(addr));
        if op_mode == OpMode::Station {
            self.set_link_status(LinkStatus::Up);
        }
        Ok(())
    }

    fn on_group_key_ack(&mut self, addr: &MacAddr) -> Result<(), Error> {
        let env = link_env!(self);
        let node = self.ctx.peers.get_mut(addr).ok_or(Error::NoSuchPeer(*addr))?;
        if !self.ctx.keys.on_group_key_ack(node, env) {
            debug!("unexpected group key ack from {}", MacFmt(addr));
            env.stats.rx_unexpected_key += 1;
            return Ok(());
        }
        self.maybe_complete_group_rekey()
    }

    fn on_group_key_received(&mut self, key: KeyRecord) -> Result<(), Error> {
        let keyed = match self.ctx.bss.and_then(|bss| self.ctx.peers.get(&bss)) {
            Some(node) => node.security.pairwise == PairwiseState::PtkInitDone,
            None => false,
        };
        if self.ctx.caps.op_mode != OpMode::Station
            || self.ctx.state != LinkState::Run
            || key.kind == KeyKind::Pairwise
            || !keyed
        {
            debug!("unexpected group key {}", key.key_id);
            self.ctx.stats.rx_unexpected_key += 1;
            return Ok(());
        }
        self.install_key(&key)?;
        info!("installed {:?} key {}", key.kind, key.key_id);
        self.ctx.keys.track_received_group_key(key);
        Ok(())
    }

    pub fn request_sa_query(&mut self, addr: &MacAddr) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            return Err(Error::InvalidState(format!("SA Query in {:?}", self.ctx.state)));
        }
        let env = link_env!(self);
        let node = match self.ctx.peers.get_mut(addr) {
            Some(node) if node.is_associated() => node,
            _ => return Err(Error::NoSuchPeer(*addr)),
        };
        sa_query::request(node, env)
    }

    pub fn request_block_ack(&mut self, addr: &MacAddr, tid: u8, ssn: u16) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            return Err(Error::InvalidState(format!("BlockAck in {:?}", self.ctx.state)));
        }
        let env = link_env!(self);
        let node = match self.ctx.peers.get_mut(addr) {
            Some(node) if node.is_associated() => node,
            _ => return Err(Error::NoSuchPeer(*addr)),
        };
        if !node.qos {
            return Err(Error::InvalidState(format!("{} does not support QoS", MacFmt(addr))));
        }
        node.block_ack.request_session(tid, ssn, env)
    }

    pub fn delete_block_ack(
        &mut self,
        addr: &MacAddr,
        tid: u8,
        direction: Direction,
        reason: ReasonCode,
    ) -> Result<(), Error> {
        let env = link_env!(self);
        let node = self.ctx.peers.get_mut(addr).ok_or(Error::NoSuchPeer(*addr))?;
        node.block_ack.delete_session(tid, direction, reason, env)
    }

    fn on_traffic_demand(&mut self, addr: &MacAddr, tid: u8, ssn: u16) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            return Ok(());
        }
        let env = link_env!(self);
        let node = match self.ctx.peers.get_mut(addr) {
            Some(node) if node.is_associated() && node.qos => node,
            _ => return Ok(()),
        };
        match node.block_ack.session(Direction::Originator, tid)?.state() {
            SessionState::Idle => node.block_ack.request_session(tid, ssn, env),
            _ => {
                node.block_ack.on_traffic(Direction::Originator, tid, env);
                Ok(())
            }
        }
    }

    pub(crate) fn bss_node_mut(&mut self) -> Option<&mut PeerNode> {
        match self.ctx.bss {
            Some(bss) => self.ctx.peers.get_mut(&bss),
            None => None,
        }
    }

    /// Resets the link with the joined BSS without any frame exchange.
    pub(crate) fn reset_bss_link(&mut self, bss: &MacAddr, state: PeerState) {
        self.set_link_status(LinkStatus::Down);
        let env = link_env!(self);
        if let Some(node) = self.ctx.peers.get_mut(bss) {
            node.reset_link(env);
            node.state = state;
        }
        self.ctx.keys.reset(env);
    }
}
