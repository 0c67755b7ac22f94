// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsed management frames as delivered by the receive path. Only the fields the
//! engine acts on are kept.

use wlan_common::{
    ie::SupportedRate,
    mac::{Aid, AuthAlgorithmNumber, CapabilityInfo, MacAddr, MgmtSubtype, ReasonCode, StatusCode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Akm {
    Psk,
    Ieee8021X,
    Sae,
}

/// Decoded RSN element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsnInfo {
    pub akm: Akm,
    pub mfp_capable: bool,
    pub mfp_required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RxMgmtFrame {
    pub src: MacAddr,
    pub dst: MacAddr,
    pub bssid: MacAddr,
    pub body: MgmtBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MgmtBody {
    Auth {
        algorithm: AuthAlgorithmNumber,
        seq: u16,
        status: StatusCode,
    },
    Deauth {
        reason: ReasonCode,
    },
    Disassoc {
        reason: ReasonCode,
    },
    AssocReq {
        reassoc: bool,
        capabilities: CapabilityInfo,
        ssid: Vec<u8>,
        rates: Vec<SupportedRate>,
        rsn: Option<RsnInfo>,
        qos: bool,
    },
    AssocResp {
        reassoc: bool,
        capabilities: CapabilityInfo,
        status: StatusCode,
        aid: Aid,
        rates: Vec<SupportedRate>,
        qos: bool,
    },
    Beacon(BeaconInfo),
    ProbeReq,
    ProbeResp(BeaconInfo),
    Action(RxAction),
}

impl RxMgmtFrame {
    pub fn subtype(&self) -> MgmtSubtype {
        match &self.body {
            MgmtBody::Auth { .. } => MgmtSubtype::Auth,
            MgmtBody::Deauth { .. } => MgmtSubtype::Deauth,
            MgmtBody::Disassoc { .. } => MgmtSubtype::Disassoc,
            MgmtBody::AssocReq { reassoc: false, .. } => MgmtSubtype::AssocReq,
            MgmtBody::AssocReq { reassoc: true, .. } => MgmtSubtype::ReassocReq,
            MgmtBody::AssocResp { reassoc: false, .. } => MgmtSubtype::AssocResp,
            MgmtBody::AssocResp { reassoc: true, .. } => MgmtSubtype::ReassocResp,
            MgmtBody::Beacon(_) => MgmtSubtype::Beacon,
            MgmtBody::ProbeReq => MgmtSubtype::ProbeReq,
            MgmtBody::ProbeResp(_) => MgmtSubtype::ProbeResp,
            MgmtBody::Action(_) => MgmtSubtype::Action,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeaconInfo {
    pub ssid: Vec<u8>,
    pub capabilities: CapabilityInfo,
    pub rates: Vec<SupportedRate>,
    /// Use_Protection bit of the ERP element, if present.
    pub erp_use_protection: bool,
    pub tsf: u64,
    /// Local TSF at reception, used to decide IBSS merges.
    pub local_tsf: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxAction {
    AddbaRequest { tid: u8, dialog_token: u8, buffer_size: u16, ssn: u16 },
    AddbaResponse { tid: u8, dialog_token: u8, status: StatusCode, buffer_size: u16 },
    Delba { tid: u8, initiator: bool, reason: ReasonCode },
    SaQueryRequest { trans_id: u16 },
    SaQueryResponse { trans_id: u16 },
    Other { category: u8, action: u8 },
}

/// A BSS reported by the scanning collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct BssCandidate {
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub channel: u8,
    pub rssi_dbm: i8,
    pub capabilities: CapabilityInfo,
    pub rates: Vec<SupportedRate>,
    pub rsn: Option<RsnInfo>,
    pub erp_use_protection: bool,
    pub qos: bool,
}
