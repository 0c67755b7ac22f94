// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Top level link state machine.
//!
//! ```text
//!            start           auth seq 2          assoc resp
//!   INIT ----------> SCAN ------------> AUTH ------------> ASSOC ----------> RUN
//!    ^               ^  ^                 |                  |               |
//!    |               |  +--- failure, ----+------------------+               |
//!    |               |       timeout                                         |
//!    |               +------------------------ beacon loss ------------------+
//!    +-------------------------- stop, from any state -----------------------+
//! ```
//!
//! Access points and IBSS creators go from SCAN to RUN directly. A station in RUN returns to
//! AUTH on deauthentication and to ASSOC on disassociation.

use {
    crate::{
        config::OpMode,
        device::{DeviceOps, LinkStatus, MgmtFrame},
        engine::LinkEngine,
        error::Error,
        peer::{PairwiseState, PeerState},
    },
    anyhow::format_err,
    log::info,
    wlan_common::mac::{AuthAlgorithmNumber, MacAddr, MgmtSubtype, ReasonCode, StatusCode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Init,
    Scan,
    Auth,
    Assoc,
    Run,
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Request,
    Mgmt(MgmtSubtype),
    NoMoreCandidates,
}

/// Whether returning to INIT tells peers we are leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Notify,
    /// Nothing is transmitted, for when the transport is already unusable.
    Silent,
}

impl<D: DeviceOps> LinkEngine<D> {
    /// Moves the machine to `nstate`. Frames the transition requires are sent before the new
    /// state is applied. On error the state is unchanged.
    pub(crate) fn new_state(&mut self, nstate: LinkState, trigger: Trigger) -> Result<(), Error> {
        let ostate = self.ctx.state;
        match nstate {
            LinkState::Init => {
                self.enter_init(Teardown::Notify);
                return Ok(());
            }
            LinkState::Scan => self.enter_scan(ostate),
            LinkState::Auth => self.enter_auth(ostate)?,
            LinkState::Assoc => self.enter_assoc(ostate)?,
            LinkState::Run => self.enter_run(ostate)?,
        }
        info!("{:?} -> {:?} on {:?}", ostate, nstate, trigger);
        self.ctx.state = nstate;
        Ok(())
    }

    /// Tears everything down: sessions, timers, keys and the peer table.
    pub(crate) fn enter_init(&mut self, teardown: Teardown) {
        let ostate = self.ctx.state;
        if teardown == Teardown::Notify {
            self.send_leave_notifications(ostate);
        }
        self.cancel_mgmt_timer();
        let env = link_env!(self);
        self.ctx.keys.reset(env);
        self.ctx.peers.clear(env);
        self.ctx.bss = None;
        self.ctx.bssid = self.ctx.caps.addr;
        self.set_link_status(LinkStatus::Down);
        if ostate != LinkState::Init {
            info!("{:?} -> Init ({:?} teardown)", ostate, teardown);
        }
        self.ctx.state = LinkState::Init;
    }

    fn send_leave_notifications(&mut self, ostate: LinkState) {
        let env = link_env!(self);
        match self.ctx.caps.op_mode {
            OpMode::AccessPoint if ostate == LinkState::Run => {
                for peer in self.ctx.peers.iter().filter(|p| p.is_associated()) {
                    let reason = ReasonCode::LEAVING_NETWORK_DISASSOC;
                    env.send(&peer.addr, MgmtFrame::Disassoc { reason });
                }
                for peer in self.ctx.peers.iter().filter(|p| p.state != PeerState::Cache) {
                    let reason = ReasonCode::LEAVING_NETWORK_DEAUTH;
                    env.send(&peer.addr, MgmtFrame::Deauth { reason });
                }
            }
            OpMode::Station => {
                if let Some(bss) = self.ctx.bss {
                    if ostate == LinkState::Run {
                        let reason = ReasonCode::LEAVING_NETWORK_DISASSOC;
                        env.send(&bss, MgmtFrame::Disassoc { reason });
                    }
                    if ostate == LinkState::Run || ostate == LinkState::Assoc {
                        let reason = ReasonCode::LEAVING_NETWORK_DEAUTH;
                        env.send(&bss, MgmtFrame::Deauth { reason });
                    }
                }
            }
            OpMode::Ibss if ostate == LinkState::Run => {
                if let Some(bss) = self.ctx.bss {
                    env.send(&bss, MgmtFrame::Deauth { reason: ReasonCode::LEAVING_NETWORK_DEAUTH });
                }
            }
            _ => {}
        }
    }

    fn enter_scan(&mut self, ostate: LinkState) {
        match ostate {
            LinkState::Init | LinkState::Scan => {}
            // The candidates stay cached.
            LinkState::Auth | LinkState::Assoc => self.cancel_mgmt_timer(),
            LinkState::Run => {
                self.set_link_status(LinkStatus::Down);
                let env = link_env!(self);
                self.ctx.keys.reset(env);
                self.ctx.peers.clear(env);
                self.ctx.bss = None;
                self.ctx.bssid = self.ctx.caps.addr;
            }
        }
        match self.ctx.caps.op_mode {
            OpMode::Station | OpMode::Ibss => self.device.begin_scan(),
            OpMode::AccessPoint | OpMode::Monitor => {}
        }
    }

    /// The joined BSS. Only stations authenticate and associate through the state machine.
    fn station_bss(&self, to: LinkState) -> Result<MacAddr, Error> {
        if self.ctx.caps.op_mode != OpMode::Station {
            return Err(Error::InvalidTransition { from: self.ctx.state, to });
        }
        self.ctx.bss.ok_or_else(|| Error::InvalidState("no BSS selected".to_string()))
    }

    fn enter_auth(&mut self, ostate: LinkState) -> Result<(), Error> {
        let bss = self.station_bss(LinkState::Auth)?;
        match ostate {
            LinkState::Scan | LinkState::Auth => {}
            LinkState::Assoc => {
                if let Some(node) = self.ctx.peers.get_mut(&bss) {
                    node.state = PeerState::Cache;
                }
            }
            LinkState::Run => self.reset_bss_link(&bss, PeerState::Cache),
            LinkState::Init => {
                return Err(Error::InvalidTransition { from: ostate, to: LinkState::Auth })
            }
        }
        // IEEE Std 802.11-2016, 11.3.4.2: open system authentication request.
        self.send(
            &bss,
            MgmtFrame::Auth {
                algorithm: AuthAlgorithmNumber::OPEN,
                seq: 1,
                status: StatusCode::SUCCESS,
            },
        );
        self.arm_mgmt_timer();
        Ok(())
    }

    fn enter_assoc(&mut self, ostate: LinkState) -> Result<(), Error> {
        let bss = self.station_bss(LinkState::Assoc)?;
        let reassoc = match ostate {
            LinkState::Auth | LinkState::Assoc => false,
            LinkState::Run => {
                self.reset_bss_link(&bss, PeerState::Authenticated);
                true
            }
            _ => return Err(Error::InvalidTransition { from: ostate, to: LinkState::Assoc }),
        };
        self.send(&bss, MgmtFrame::AssocReq { reassoc });
        self.arm_mgmt_timer();
        Ok(())
    }

    fn enter_run(&mut self, ostate: LinkState) -> Result<(), Error> {
        let op_mode = self.ctx.caps.op_mode;
        match (ostate, op_mode) {
            (LinkState::Assoc, OpMode::Station)
            | (LinkState::Scan, OpMode::Ibss)
            | (LinkState::Scan, OpMode::AccessPoint)
            | (LinkState::Scan, OpMode::Monitor) => {}
            _ => return Err(Error::InvalidTransition { from: ostate, to: LinkState::Run }),
        }
        self.check_txrate()?;
        self.cancel_mgmt_timer();

        self.ctx.protection.recompute(&self.ctx.caps, &mut self.device);
        if op_mode == OpMode::Station {
            let bss = self.ctx.bss.and_then(|bss| self.ctx.peers.get(&bss));
            if let Some((capabilities, erp)) = bss.map(|n| (n.capabilities, n.erp_use_protection))
            {
                self.ctx.protection.apply_bss(&self.ctx.caps, capabilities, erp, &mut self.device);
            }
        }

        match op_mode {
            OpMode::Station if self.ctx.caps.rsn_enabled => {
                // Held down until the pairwise key is installed.
                if let Some(node) = self.bss_node_mut() {
                    node.security.pairwise = PairwiseState::AwaitingPmk;
                }
                info!("associated, waiting for the 4-Way Handshake");
            }
            OpMode::AccessPoint if self.ctx.caps.rsn_enabled => self.start_group_keys(),
            _ => self.set_link_status(LinkStatus::Up),
        }
        Ok(())
    }

    /// The transmit rate of the joined BSS must index into its negotiated rates.
    fn check_txrate(&self) -> Result<(), Error> {
        match self.ctx.caps.op_mode {
            OpMode::Station | OpMode::Ibss if self.ctx.bss.is_some() => {
                let bss = self.ctx.bss.and_then(|bss| self.ctx.peers.get(&bss));
                let node = bss.ok_or_else(|| format_err!("BSS node missing"))?;
                if node.txrate >= node.rates.len() {
                    return Err(Error::Internal(format_err!(
                        "transmit rate index {} out of bounds ({} rates)",
                        node.txrate,
                        node.rates.len()
                    )));
                }
            }
            OpMode::Monitor => {}
            _ => {
                if self.ctx.caps.rates().is_empty() {
                    return Err(Error::Internal(format_err!(
                        "no rates supported in {:?}",
                        self.ctx.caps.phy_mode
                    )));
                }
            }
        }
        Ok(())
    }

    /// RUN entry of an RSN access point: group keys are installed before the link goes up.
    fn start_group_keys(&mut self) {
        let keys = self.ctx.keys.init_group_keys(self.ctx.caps.mfp_capable);
        let mut installed = true;
        for key in &keys {
            installed &= self.install_key(key).is_ok();
        }
        if installed {
            self.set_link_status(LinkStatus::Up);
        }
        let env = link_env!(self);
        self.ctx.keys.arm_rekey_timer(env);
    }
}
