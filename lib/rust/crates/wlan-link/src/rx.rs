// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Input processing of received management frames.

use {
    crate::{
        config::OpMode,
        device::{DeviceOps, MgmtFrame},
        engine::{negotiator, LinkEngine},
        error::Error,
        frame::{Akm, BeaconInfo, MgmtBody, RsnInfo, RxAction, RxMgmtFrame},
        peer::{PairwiseState, PeerState},
        rates::ReconcileFlags,
        sa_query,
        state::{LinkState, Trigger},
    },
    log::{debug, info, warn},
    wlan_common::{
        ie::SupportedRate,
        mac::{
            Aid, AuthAlgorithmNumber, CapabilityInfo, MacAddr, MacFmt, MgmtSubtype, ReasonCode,
            StatusCode,
        },
    },
};

/// Fields of a received (re)association request.
struct AssocRequest {
    reassoc: bool,
    capabilities: CapabilityInfo,
    ssid: Vec<u8>,
    rates: Vec<SupportedRate>,
    rsn: Option<RsnInfo>,
    qos: bool,
}

impl<D: DeviceOps> LinkEngine<D> {
    pub(crate) fn handle_mgmt_frame(&mut self, frame: RxMgmtFrame) -> Result<(), Error> {
        if self.ctx.state == LinkState::Init || frame.src == self.ctx.caps.addr {
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        let subtype = frame.subtype();
        let RxMgmtFrame { src, bssid, body, .. } = frame;
        match body {
            MgmtBody::Auth { algorithm, seq, status } => {
                self.recv_auth(&src, &bssid, algorithm, seq, status)
            }
            MgmtBody::Deauth { reason } => self.recv_deauth(&src, reason),
            MgmtBody::Disassoc { reason } => self.recv_disassoc(&src, reason),
            MgmtBody::AssocReq { reassoc, capabilities, ssid, rates, rsn, qos } => self
                .recv_assoc_req(
                    &src,
                    &bssid,
                    AssocRequest { reassoc, capabilities, ssid, rates, rsn, qos },
                ),
            MgmtBody::AssocResp { capabilities, status, aid, rates, qos, .. } => {
                self.recv_assoc_resp(&src, capabilities, status, aid, rates, qos)
            }
            MgmtBody::Beacon(info) | MgmtBody::ProbeResp(info) => {
                self.recv_beacon(&bssid, info)
            }
            MgmtBody::Action(action) => self.recv_action(&src, action),
            MgmtBody::ProbeReq => {
                debug!("ignoring {:?} from {}", subtype, MacFmt(&src));
                Ok(())
            }
        }
    }

    fn recv_auth(
        &mut self,
        src: &MacAddr,
        bssid: &MacAddr,
        algorithm: AuthAlgorithmNumber,
        seq: u16,
        status: StatusCode,
    ) -> Result<(), Error> {
        match self.ctx.caps.op_mode {
            OpMode::Station => self.recv_auth_response(src, algorithm, seq, status),
            OpMode::AccessPoint | OpMode::Ibss => self.recv_auth_request(src, bssid, algorithm, seq),
            OpMode::Monitor => Ok(()),
        }
    }

    /// IEEE Std 802.11-2016, 11.3.4.2: the response carries sequence number 2.
    fn recv_auth_response(
        &mut self,
        src: &MacAddr,
        algorithm: AuthAlgorithmNumber,
        seq: u16,
        status: StatusCode,
    ) -> Result<(), Error> {
        if self.ctx.state != LinkState::Auth || self.ctx.bss != Some(*src) {
            debug!("unexpected auth frame from {} in {:?}", MacFmt(src), self.ctx.state);
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        if algorithm != AuthAlgorithmNumber::OPEN {
            self.ctx.stats.rx_auth_unsupported += 1;
            return Ok(());
        }
        if seq != 2 {
            debug!("auth frame from {} out of sequence: {}", MacFmt(src), seq);
            self.ctx.stats.rx_bad_auth += 1;
            return Ok(());
        }
        if !status.is_success() {
            info!("{} refused authentication: {:?}", MacFmt(src), status);
            self.ctx.stats.rx_auth_fail += 1;
            if let Some(node) = self.bss_node_mut() {
                node.fails += 1;
            }
            return self.new_state(LinkState::Scan, Trigger::Mgmt(MgmtSubtype::Auth));
        }
        if let Some(node) = self.bss_node_mut() {
            node.state = PeerState::Authenticated;
        }
        self.new_state(LinkState::Assoc, Trigger::Mgmt(MgmtSubtype::Auth))
    }

    fn recv_auth_request(
        &mut self,
        src: &MacAddr,
        bssid: &MacAddr,
        algorithm: AuthAlgorithmNumber,
        seq: u16,
    ) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        if *bssid != self.ctx.bssid {
            self.ctx.stats.rx_wrong_bss += 1;
            return Ok(());
        }
        if algorithm != AuthAlgorithmNumber::OPEN {
            debug!("{} requested unsupported auth algorithm {:?}", MacFmt(src), algorithm);
            self.ctx.stats.rx_auth_unsupported += 1;
            let status = StatusCode::UNSUPPORTED_AUTH_ALGORITHM;
            self.send(src, MgmtFrame::Auth { algorithm, seq: seq.wrapping_add(1), status });
            return Ok(());
        }
        if seq != 1 {
            debug!("auth frame from {} out of sequence: {}", MacFmt(src), seq);
            self.ctx.stats.rx_bad_auth += 1;
            return Ok(());
        }
        if let Err(e) = self.ctx.peers.get_or_insert(src) {
            self.ctx.stats.node_alloc_fail += 1;
            warn!("cannot authenticate {}: {}", MacFmt(src), e);
            return Err(e);
        }
        let status = StatusCode::SUCCESS;
        self.send(src, MgmtFrame::Auth { algorithm, seq: 2, status });
        if let Some(node) = self.ctx.peers.get_mut(src) {
            node.touch();
            // A peer already authenticated or associated keeps its state.
            if node.state == PeerState::Cache {
                node.state = PeerState::Authenticated;
                info!("{} authenticated", MacFmt(src));
            }
        }
        Ok(())
    }

    fn refuse_assoc(
        &mut self,
        src: &MacAddr,
        reassoc: bool,
        status: StatusCode,
    ) -> Result<(), Error> {
        self.send(src, MgmtFrame::AssocResp { reassoc, status, aid: 0 });
        self.remove_peer(src)
    }

    fn recv_assoc_req(
        &mut self,
        src: &MacAddr,
        bssid: &MacAddr,
        req: AssocRequest,
    ) -> Result<(), Error> {
        if self.ctx.caps.op_mode != OpMode::AccessPoint || self.ctx.state != LinkState::Run {
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        if *bssid != self.ctx.bssid {
            debug!("association request for foreign BSS from {}", MacFmt(src));
            self.ctx.stats.rx_assoc_bss += 1;
            return Ok(());
        }
        let known_state = self.ctx.peers.get(src).map(|node| (node.state, node.aid));
        let aid = match known_state {
            Some((PeerState::Cache, _)) | None => {
                debug!("association request from unauthenticated {}", MacFmt(src));
                self.ctx.stats.rx_assoc_notauth += 1;
                self.send(src, MgmtFrame::Deauth { reason: ReasonCode::NOT_AUTHENTICATED });
                return self.remove_peer(src);
            }
            Some((PeerState::Associated, Some(aid))) => {
                // Repeated request while associated: same answer, sessions untouched.
                let status = StatusCode::SUCCESS;
                self.send(src, MgmtFrame::AssocResp { reassoc: req.reassoc, status, aid });
                return Ok(());
            }
            Some((_, aid)) => aid,
        };
        if let Some(ssid) = self.ctx.config.ssid_bytes() {
            if req.ssid != ssid {
                self.ctx.stats.rx_ssid_mismatch += 1;
                return Ok(());
            }
        }
        if !req.capabilities.ess() {
            self.ctx.stats.rx_assoc_capmismatch += 1;
            return self.refuse_assoc(src, req.reassoc, StatusCode::CAPABILITIES_MISMATCH);
        }
        let mfp = match (self.ctx.caps.rsn_enabled, req.rsn) {
            (false, _) => false,
            (true, Some(rsn)) if !rsn.mfp_required || self.ctx.caps.mfp_capable => {
                rsn.mfp_capable && self.ctx.caps.mfp_capable
            }
            (true, _) => {
                self.ctx.stats.rx_assoc_badrsnie += 1;
                self.send(src, MgmtFrame::Deauth { reason: ReasonCode::REASON_INVALID_ELEMENT });
                return self.remove_peer(src);
            }
        };
        let mut rates = req.rates;
        if let Err(mismatch) = negotiator(&self.ctx.caps, &self.ctx.config)
            .reconcile(&mut rates, ReconcileFlags::all())
        {
            info!("refusing {}: {}", MacFmt(src), mismatch);
            self.ctx.stats.rx_assoc_norate += 1;
            self.refuse_assoc(src, req.reassoc, StatusCode::DENIED_BASIC_RATES_MISMATCH)?;
            return Err(mismatch.into());
        }
        let aid = match aid.or_else(|| self.ctx.peers.free_aid()) {
            Some(aid) => aid,
            None => {
                warn!("no association ID left for {}", MacFmt(src));
                return self.refuse_assoc(src, req.reassoc, StatusCode::DENIED_NO_MORE_STAS);
            }
        };

        // Answer first, then commit.
        let status = StatusCode::SUCCESS;
        self.send(src, MgmtFrame::AssocResp { reassoc: req.reassoc, status, aid });
        let rsn_enabled = self.ctx.caps.rsn_enabled;
        let node = self.ctx.peers.get_mut(src).ok_or(Error::NoSuchPeer(*src))?;
        node.state = PeerState::Associated;
        node.aid = Some(aid);
        node.set_rates(rates);
        node.capabilities = req.capabilities;
        node.qos = req.qos;
        node.ssid = req.ssid;
        node.touch();
        node.security.rsn = req.rsn;
        node.security.mfp = mfp;
        node.security.pairwise =
            if rsn_enabled { PairwiseState::AwaitingPmk } else { PairwiseState::Idle };
        let (capabilities, is_erp) = (node.capabilities, node.is_erp());
        info!("{} associated with AID {}", MacFmt(src), aid);
        self.ctx.protection.on_peer_joined(
            &self.ctx.caps,
            capabilities,
            is_erp,
            &mut self.device,
        );

        let psk = match (req.rsn, self.ctx.keys.psk()) {
            (Some(RsnInfo { akm: Akm::Psk, .. }), Some(psk)) => Some(psk.to_vec()),
            _ => None,
        };
        if let Some(psk) = psk {
            self.ctx.keys.add_pmk(*src, psk);
            return self.request_handshake(src);
        }
        Ok(())
    }

    fn recv_assoc_resp(
        &mut self,
        src: &MacAddr,
        capabilities: CapabilityInfo,
        status: StatusCode,
        aid: Aid,
        rates: Vec<SupportedRate>,
        qos: bool,
    ) -> Result<(), Error> {
        if self.ctx.caps.op_mode != OpMode::Station
            || self.ctx.state != LinkState::Assoc
            || self.ctx.bss != Some(*src)
        {
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        let trigger = Trigger::Mgmt(MgmtSubtype::AssocResp);
        if !status.is_success() {
            info!("{} refused association: {:?}", MacFmt(src), status);
            if let Some(node) = self.bss_node_mut() {
                node.fails += 1;
            }
            return self.new_state(LinkState::Scan, trigger);
        }
        let mut rates = rates;
        if let Err(mismatch) = negotiator(&self.ctx.caps, &self.ctx.config)
            .reconcile(&mut rates, ReconcileFlags::all())
        {
            warn!("rates of {} do not match: {}", MacFmt(src), mismatch);
            self.ctx.stats.rx_assoc_norate += 1;
            if let Some(node) = self.bss_node_mut() {
                node.fails += 1;
            }
            self.new_state(LinkState::Scan, trigger)?;
            return Err(mismatch.into());
        }
        if let Some(node) = self.bss_node_mut() {
            // IEEE Std 802.11-2016, 9.4.1.8: the two MSBs of the AID field are set.
            node.aid = Some(aid & 0x3fff);
            node.capabilities = capabilities;
            node.qos = qos;
            node.set_rates(rates);
            node.state = PeerState::Associated;
            node.fails = 0;
        }
        self.new_state(LinkState::Run, trigger)
    }

    fn recv_deauth(&mut self, src: &MacAddr, reason: ReasonCode) -> Result<(), Error> {
        self.ctx.stats.rx_deauth += 1;
        match self.ctx.caps.op_mode {
            OpMode::Station => {
                if self.ctx.bss != Some(*src) {
                    self.ctx.stats.rx_mgmt_discard += 1;
                    return Ok(());
                }
                match self.ctx.state {
                    LinkState::Auth | LinkState::Assoc | LinkState::Run => {
                        info!("deauthenticated by {}: {:?}", MacFmt(src), reason);
                        self.new_state(LinkState::Auth, Trigger::Mgmt(MgmtSubtype::Deauth))
                    }
                    _ => Ok(()),
                }
            }
            OpMode::AccessPoint | OpMode::Ibss => {
                if self.ctx.peers.contains(src) {
                    info!("{} deauthenticated: {:?}", MacFmt(src), reason);
                    self.remove_peer(src)?;
                }
                Ok(())
            }
            OpMode::Monitor => Ok(()),
        }
    }

    fn recv_disassoc(&mut self, src: &MacAddr, reason: ReasonCode) -> Result<(), Error> {
        self.ctx.stats.rx_disassoc += 1;
        match self.ctx.caps.op_mode {
            OpMode::Station => {
                if self.ctx.bss != Some(*src) {
                    self.ctx.stats.rx_mgmt_discard += 1;
                    return Ok(());
                }
                match self.ctx.state {
                    LinkState::Assoc | LinkState::Run => {
                        info!("disassociated by {}: {:?}", MacFmt(src), reason);
                        self.new_state(LinkState::Assoc, Trigger::Mgmt(MgmtSubtype::Disassoc))
                    }
                    _ => Ok(()),
                }
            }
            OpMode::AccessPoint => {
                if self.ctx.peers.get(src).map_or(false, |node| node.is_associated()) {
                    info!("{} disassociated: {:?}", MacFmt(src), reason);
                    self.remove_peer(src)?;
                }
                Ok(())
            }
            OpMode::Ibss | OpMode::Monitor => Ok(()),
        }
    }

    fn recv_beacon(&mut self, bssid: &MacAddr, info: BeaconInfo) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            return Ok(());
        }
        match self.ctx.caps.op_mode {
            OpMode::Station if self.ctx.bss == Some(*bssid) => {
                let node = match self.bss_node_mut() {
                    Some(node) => node,
                    None => return Ok(()),
                };
                node.touch();
                if node.erp_use_protection == info.erp_use_protection {
                    return Ok(());
                }
                node.erp_use_protection = info.erp_use_protection;
                self.ctx.protection.on_erp_changed(
                    &self.ctx.caps,
                    info.erp_use_protection,
                    &mut self.device,
                );
                Ok(())
            }
            OpMode::Ibss if *bssid != self.ctx.bssid => self.maybe_merge_ibss(bssid, info),
            OpMode::Ibss => {
                if let Some(node) = self.bss_node_mut() {
                    node.touch();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// IEEE Std 802.11-2016, 11.1.4: an IBSS with the same SSID and a later TSF is adopted.
    fn maybe_merge_ibss(&mut self, bssid: &MacAddr, info: BeaconInfo) -> Result<(), Error> {
        if !info.capabilities.ibss() || info.tsf <= info.local_tsf {
            return Ok(());
        }
        if let Some(ssid) = self.ctx.config.ssid_bytes() {
            if info.ssid != ssid {
                return Ok(());
            }
        }
        let mut rates = info.rates;
        if let Err(e) =
            negotiator(&self.ctx.caps, &self.ctx.config).reconcile(&mut rates, ReconcileFlags::all())
        {
            debug!("not merging with {}: {}", MacFmt(bssid), e);
            return Ok(());
        }
        let node = match self.ctx.peers.get_or_insert(bssid) {
            Ok(node) => node,
            Err(e) => {
                self.ctx.stats.node_alloc_fail += 1;
                return Err(e);
            }
        };
        node.ssid = info.ssid;
        node.capabilities = info.capabilities;
        node.erp_use_protection = info.erp_use_protection;
        node.set_rates(rates);
        node.touch();
        info!("merging with IBSS {}", MacFmt(bssid));
        self.ctx.stats.ibss_merges += 1;
        self.ctx.bss = Some(*bssid);
        self.ctx.bssid = *bssid;
        Ok(())
    }

    fn recv_action(&mut self, src: &MacAddr, action: RxAction) -> Result<(), Error> {
        if self.ctx.state != LinkState::Run {
            self.ctx.stats.rx_mgmt_discard += 1;
            return Ok(());
        }
        let env = link_env!(self);
        let node = match self.ctx.peers.get_mut(src) {
            Some(node) if node.is_associated() => node,
            _ => {
                debug!("action frame from unassociated {}", MacFmt(src));
                env.stats.rx_mgmt_discard += 1;
                return Ok(());
            }
        };
        match action {
            RxAction::AddbaRequest { tid, dialog_token, buffer_size, ssn } => {
                if !node.qos {
                    env.stats.rx_mgmt_discard += 1;
                    return Ok(());
                }
                node.block_ack.on_addba_request(tid, dialog_token, buffer_size, ssn, env)
            }
            RxAction::AddbaResponse { tid, dialog_token, status, buffer_size } => {
                node.block_ack.on_addba_response(tid, dialog_token, status, buffer_size, env)
            }
            RxAction::Delba { tid, initiator, reason } => {
                debug!("DELBA from {} for TID {}: {:?}", MacFmt(src), tid, reason);
                node.block_ack.on_delba(tid, initiator, env)
            }
            RxAction::SaQueryRequest { trans_id } => sa_query::on_request(node, trans_id, env),
            RxAction::SaQueryResponse { trans_id } => {
                sa_query::on_response(node, trans_id, env);
            }
            RxAction::Other { category, action } => {
                debug!("unsupported action {}/{} from {}", category, action, MacFmt(src));
                env.stats.rx_bad_subtype += 1;
            }
        }
        Ok(())
    }
}
