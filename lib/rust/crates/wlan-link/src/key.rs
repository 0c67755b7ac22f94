// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Scheduling of RSN key handshakes: pairwise key runs per peer and the periodic rotation of
//! the group keys across all associated peers. The handshakes themselves are carried out by
//! the authenticator behind `DeviceOps`.

use {
    crate::{
        device::Handshake,
        error::Error,
        peer::{GroupKeyState, PairwiseState, PeerNode},
        Env, TimedEvent,
    },
    log::{info, warn},
    rand::RngCore,
    std::{collections::HashMap, fmt},
    wlan_common::{
        mac::{MacAddr, MacFmt, ReasonCode, BCAST_ADDR},
        timer::EventId,
    },
};

// IEEE Std 802.11-2016, 12.7.2: GTKs use key IDs 1 and 2, IGTKs 4 and 5.
pub const GTK_IDS: [u8; 2] = [1, 2];
pub const IGTK_IDS: [u8; 2] = [4, 5];
const GTK_LEN: usize = 16;
const IGTK_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Pairwise,
    Group,
    IntegrityGroup,
}

#[derive(Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub kind: KeyKind,
    pub key_id: u8,
    /// Peer address for pairwise keys, the broadcast address for group keys.
    pub address: MacAddr,
    pub material: Vec<u8>,
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("kind", &self.kind)
            .field("key_id", &self.key_id)
            .field("address", &MacFmt(&self.address).to_string())
            .field("material_len", &self.material.len())
            .finish()
    }
}

fn generate_key_material(len: usize) -> Vec<u8> {
    let mut material = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut material[..]);
    material
}

/// Active and standby slot of one group key type.
struct KeySlots {
    kind: KeyKind,
    ids: [u8; 2],
    len: usize,
    keys: [Option<KeyRecord>; 2],
    active: Option<usize>,
}

impl KeySlots {
    fn new(kind: KeyKind, ids: [u8; 2], len: usize) -> Self {
        Self { kind, ids, len, keys: [None, None], active: None }
    }

    /// Fills the standby slot with fresh material and makes it the active one.
    fn rotate(&mut self) {
        let next = match self.active {
            Some(0) => 1,
            _ => 0,
        };
        self.keys[next] = Some(KeyRecord {
            kind: self.kind,
            key_id: self.ids[next],
            address: BCAST_ADDR,
            material: generate_key_material(self.len),
        });
        self.active = Some(next);
    }

    fn active(&self) -> Option<&KeyRecord> {
        self.active.and_then(|i| self.keys[i].as_ref())
    }

    fn clear(&mut self) -> Vec<KeyRecord> {
        self.active = None;
        self.keys.iter_mut().filter_map(|k| k.take()).collect()
    }
}

/// Outcome of an expired EAPOL timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapolTimeout {
    Ignored,
    Retried,
    /// Retries exhausted. The peer has to be deauthenticated with the given reason.
    GiveUp(ReasonCode),
}

pub struct KeyCoordinator {
    pmk_cache: HashMap<MacAddr, Vec<u8>>,
    psk: Option<Vec<u8>>,
    gtk: KeySlots,
    igtk: KeySlots,
    rekey_pending: bool,
    rekey_timer: Option<EventId>,
    /// Group keys a station received from its AP.
    received: Vec<KeyRecord>,
}

impl KeyCoordinator {
    pub fn new() -> Self {
        Self {
            pmk_cache: HashMap::new(),
            psk: None,
            gtk: KeySlots::new(KeyKind::Group, GTK_IDS, GTK_LEN),
            igtk: KeySlots::new(KeyKind::IntegrityGroup, IGTK_IDS, IGTK_LEN),
            rekey_pending: false,
            rekey_timer: None,
            received: vec![],
        }
    }

    /// PMK derived from the network passphrase, shared by all PSK peers.
    pub fn set_psk(&mut self, pmk: Vec<u8>) {
        self.psk = Some(pmk);
    }

    pub fn psk(&self) -> Option<&[u8]> {
        self.psk.as_ref().map(|p| &p[..])
    }

    pub fn add_pmk(&mut self, addr: MacAddr, pmk: Vec<u8>) {
        self.pmk_cache.insert(addr, pmk);
    }

    pub fn has_pmk(&self, addr: &MacAddr) -> bool {
        self.pmk_cache.contains_key(addr)
    }

    pub fn active_gtk(&self) -> Option<&KeyRecord> {
        self.gtk.active()
    }

    pub fn active_igtk(&self) -> Option<&KeyRecord> {
        self.igtk.active()
    }

    pub fn rekey_pending(&self) -> bool {
        self.rekey_pending
    }

    pub fn rekey_timer(&self) -> Option<EventId> {
        self.rekey_timer
    }

    fn active_group_keys(&self) -> Vec<KeyRecord> {
        self.gtk.active().into_iter().chain(self.igtk.active()).cloned().collect()
    }

    fn group_handshake(&self) -> Option<Handshake> {
        let gtk_id = self.gtk.active()?.key_id;
        Some(Handshake::Group { gtk_id, igtk_id: self.igtk.active().map(|k| k.key_id) })
    }

    /// Creates the group keys a new BSS starts with. Returns the records to install.
    pub fn init_group_keys(&mut self, mfp: bool) -> Vec<KeyRecord> {
        self.gtk.clear();
        self.igtk.clear();
        self.gtk.rotate();
        if mfp {
            self.igtk.rotate();
        }
        self.rekey_pending = false;
        self.active_group_keys()
    }

    /// (Re)arms the periodic rotation timer.
    pub fn arm_rekey_timer(&mut self, env: &mut Env<'_>) {
        if let Some(timer) = self.rekey_timer.take() {
            env.timer.cancel_event(timer);
        }
        self.rekey_timer =
            Some(env.timer.schedule_after(env.config.group_rekey_interval(), TimedEvent::GroupRekey));
    }

    /// Returns true if `id` is the rotation timer. The timer is considered consumed.
    pub fn take_rekey_timer(&mut self, id: EventId) -> bool {
        if self.rekey_timer == Some(id) {
            self.rekey_timer = None;
            true
        } else {
            false
        }
    }

    /// Forgets all group key state and deletes the installed group keys.
    pub fn reset(&mut self, env: &mut Env<'_>) {
        if let Some(timer) = self.rekey_timer.take() {
            env.timer.cancel_event(timer);
        }
        let received = self.received.drain(..);
        for key in self.gtk.clear().into_iter().chain(self.igtk.clear()).chain(received) {
            env.device.delete_key(&key);
        }
        self.rekey_pending = false;
    }

    /// Remembers an installed group key delivered by the AP, replacing the previous key of the
    /// same kind and ID.
    pub fn track_received_group_key(&mut self, key: KeyRecord) {
        self.received.retain(|k| k.kind != key.kind || k.key_id != key.key_id);
        self.received.push(key);
    }

    pub fn received_group_keys(&self) -> &[KeyRecord] {
        &self.received[..]
    }

    /// Starts the 4-Way Handshake with an associated peer which has not been keyed yet.
    pub fn start_pairwise(&self, peer: &mut PeerNode, env: &mut Env<'_>) -> Result<(), Error> {
        if !peer.is_associated() || peer.security.pairwise != PairwiseState::AwaitingPmk {
            return Err(Error::InvalidState(format!(
                "peer {} not awaiting a key run ({:?}, {:?})",
                MacFmt(&peer.addr),
                peer.state,
                peer.security.pairwise
            )));
        }
        let pmk = self.pmk_cache.get(&peer.addr).ok_or(Error::NoPmk(peer.addr))?.clone();
        peer.security.pmk_present = true;
        peer.security.pairwise = PairwiseState::PmkInstalled;
        peer.security.eapol_retries = 0;
        arm_eapol_timer(peer, env);
        info!("starting 4-Way Handshake with {}", MacFmt(&peer.addr));
        env.device.send_handshake_msg1(&peer.addr, Handshake::Pairwise { pmk }).map_err(Error::Device)
    }

    /// First phase of a rotation: swaps in fresh group keys. Keys are only installed once every
    /// peer acknowledged them, see `complete_group_rekey`.
    pub fn begin_rotation(&mut self, mfp: bool, env: &mut Env<'_>) {
        self.gtk.rotate();
        if mfp {
            self.igtk.rotate();
        }
        self.rekey_pending = true;
        env.stats.group_rekeys_started += 1;
        info!(
            "rotating group keys, GTK id {:?} IGTK id {:?}",
            self.gtk.active().map(|k| k.key_id),
            self.igtk.active().map(|k| k.key_id)
        );
    }

    /// Triggers the Group Key Handshake with one peer. Returns whether the peer is now marked
    /// rekey-in-progress.
    pub fn start_group_handshake(&self, peer: &mut PeerNode, env: &mut Env<'_>) -> bool {
        if !peer.is_associated()
            || peer.security.group != GroupKeyState::Idle
            || !peer.security.pairwise_key_installed
        {
            return false;
        }
        let handshake = match self.group_handshake() {
            Some(handshake) => handshake,
            None => return false,
        };
        peer.security.group = GroupKeyState::RekeyInProgress;
        match env.device.send_handshake_msg1(&peer.addr, handshake) {
            Ok(()) => {
                peer.security.eapol_retries = 0;
                arm_eapol_timer(peer, env);
                true
            }
            Err(e) => {
                // Left idle so the next rotation retries this peer.
                warn!("failed to start group key handshake with {}: {}", MacFmt(&peer.addr), e);
                peer.security.group = GroupKeyState::Idle;
                false
            }
        }
    }

    /// Returns false if the peer had no group handshake outstanding.
    pub fn on_group_key_ack(&self, peer: &mut PeerNode, env: &mut Env<'_>) -> bool {
        if peer.security.group != GroupKeyState::RekeyInProgress {
            return false;
        }
        peer.security.group = GroupKeyState::Idle;
        disarm_eapol_timer(peer, env);
        true
    }

    /// Second phase of a rotation, once no peer is rekey-in-progress anymore. Yields the keys to
    /// install exactly once per rotation.
    pub fn complete_group_rekey(&mut self) -> Option<Vec<KeyRecord>> {
        if !self.rekey_pending {
            return None;
        }
        self.rekey_pending = false;
        Some(self.active_group_keys())
    }

    /// Puts a rotation whose keys could not be installed back into the pending state.
    pub fn defer_group_rekey(&mut self) {
        if self.gtk.active().is_some() {
            self.rekey_pending = true;
        }
    }

    pub fn on_eapol_timeout(
        &self,
        id: EventId,
        peer: &mut PeerNode,
        env: &mut Env<'_>,
    ) -> EapolTimeout {
        if peer.security.eapol_timer != Some(id) {
            return EapolTimeout::Ignored;
        }
        peer.security.eapol_timer = None;
        env.stats.eapol_timeouts += 1;

        let (handshake, reason) = if peer.security.pairwise == PairwiseState::PmkInstalled {
            match self.pmk_cache.get(&peer.addr) {
                Some(pmk) => (
                    Handshake::Pairwise { pmk: pmk.clone() },
                    ReasonCode::FOURWAY_HANDSHAKE_TIMEOUT,
                ),
                None => return EapolTimeout::GiveUp(ReasonCode::FOURWAY_HANDSHAKE_TIMEOUT),
            }
        } else if peer.security.group == GroupKeyState::RekeyInProgress {
            match self.group_handshake() {
                Some(handshake) => (handshake, ReasonCode::GK_HANDSHAKE_TIMEOUT),
                None => return EapolTimeout::GiveUp(ReasonCode::GK_HANDSHAKE_TIMEOUT),
            }
        } else {
            return EapolTimeout::Ignored;
        };

        if peer.security.eapol_retries >= env.config.eapol_max_retries {
            return EapolTimeout::GiveUp(reason);
        }
        peer.security.eapol_retries += 1;
        arm_eapol_timer(peer, env);
        if let Err(e) = env.device.send_handshake_msg1(&peer.addr, handshake) {
            warn!("failed to retransmit handshake message to {}: {}", MacFmt(&peer.addr), e);
        }
        EapolTimeout::Retried
    }
}

fn arm_eapol_timer(peer: &mut PeerNode, env: &mut Env<'_>) {
    disarm_eapol_timer(peer, env);
    peer.security.eapol_timer = Some(
        env.timer.schedule_after(env.config.eapol_timeout(), TimedEvent::Eapol { peer: peer.addr }),
    );
}

pub(crate) fn disarm_eapol_timer(peer: &mut PeerNode, env: &mut Env<'_>) {
    if let Some(timer) = peer.security.eapol_timer.take() {
        env.timer.cancel_event(timer);
    }
}
