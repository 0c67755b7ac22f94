// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {bitfield::bitfield, std::fmt};

pub type MacAddr = [u8; 6];
pub const BCAST_ADDR: MacAddr = [0xFF; 6];

/// Association identifier handed out by an access point.
pub type Aid = u16;
// IEEE Std 802.11-2016, 9.4.1.8
pub const MAX_AID: Aid = 2007;

// IEEE Std 802.11-2016, 9.2.4.4: sequence numbers are 12 bits wide.
pub const SEQ_SPACE: u16 = 1 << 12;

macro_rules! pub_const {
    ($name:ident, $val:expr) => {
        pub const $name: Self = Self($val);
    };
}

/// Displays a MAC address in the usual colon separated form.
pub struct MacFmt<'a>(pub &'a MacAddr);

impl<'a> fmt::Display for MacFmt<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let a = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct ReasonCode(pub u16);

/// IEEE Std 802.11-2016, 9.4.1.7
impl ReasonCode {
    pub_const!(UNSPECIFIED_REASON, 1);
    pub_const!(INVALID_AUTHENTICATION, 2);
    pub_const!(LEAVING_NETWORK_DEAUTH, 3);
    pub_const!(REASON_INACTIVITY, 4);
    pub_const!(NO_MORE_STAS, 5);
    pub_const!(INVALID_CLASS2FRAME, 6);
    pub_const!(INVALID_CLASS3FRAME, 7);
    pub_const!(LEAVING_NETWORK_DISASSOC, 8);
    pub_const!(NOT_AUTHENTICATED, 9);
    pub_const!(REASON_INVALID_ELEMENT, 13);
    pub_const!(FOURWAY_HANDSHAKE_TIMEOUT, 15);
    pub_const!(GK_HANDSHAKE_TIMEOUT, 16);
    pub_const!(IEEE802_1_X_AUTH_FAILED, 23);
    pub_const!(STA_LEAVING, 36);
    pub_const!(END_TS_BA_DLS, 37);
    pub_const!(UNKNOWN_TS_BA, 38);
    pub_const!(TIMEOUT, 39);
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct StatusCode(pub u16);

/// IEEE Std 802.11-2016, 9.4.1.9
impl StatusCode {
    pub_const!(SUCCESS, 0);
    pub_const!(REFUSED, 1);
    pub_const!(CAPABILITIES_MISMATCH, 10);
    pub_const!(REASSOC_NO_ASSOC, 11);
    pub_const!(UNSUPPORTED_AUTH_ALGORITHM, 13);
    pub_const!(TRANSACTION_SEQUENCE_ERROR, 14);
    pub_const!(DENIED_NO_MORE_STAS, 17);
    pub_const!(DENIED_BASIC_RATES_MISMATCH, 18);
    pub_const!(REFUSED_TEMPORARILY, 30);
    pub_const!(REQUEST_DECLINED, 37);
    pub_const!(INVALID_PARAMETERS, 38);
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct AuthAlgorithmNumber(pub u16);

/// IEEE Std 802.11-2016, 9.4.1.1
impl AuthAlgorithmNumber {
    pub_const!(OPEN, 0);
    pub_const!(SHARED_KEY, 1);
    pub_const!(FAST_BSS_TRANSITION, 2);
    pub_const!(SAE, 3);
}

// IEEE Std 802.11-2016, 9.2.4.1.3, Table 9-1
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum MgmtSubtype {
    AssocReq,
    AssocResp,
    ReassocReq,
    ReassocResp,
    ProbeReq,
    ProbeResp,
    Beacon,
    Disassoc,
    Auth,
    Deauth,
    Action,
}

impl MgmtSubtype {
    pub fn code(&self) -> u16 {
        match self {
            MgmtSubtype::AssocReq => 0x00,
            MgmtSubtype::AssocResp => 0x01,
            MgmtSubtype::ReassocReq => 0x02,
            MgmtSubtype::ReassocResp => 0x03,
            MgmtSubtype::ProbeReq => 0x04,
            MgmtSubtype::ProbeResp => 0x05,
            MgmtSubtype::Beacon => 0x08,
            MgmtSubtype::Disassoc => 0x0A,
            MgmtSubtype::Auth => 0x0B,
            MgmtSubtype::Deauth => 0x0C,
            MgmtSubtype::Action => 0x0D,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct ActionCategory(pub u8);

/// IEEE Std 802.11-2016, 9.4.1.11, Table 9-47
impl ActionCategory {
    pub_const!(BLOCK_ACK, 3);
    pub_const!(SA_QUERY, 8);
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct BlockAckAction(pub u8);

/// IEEE Std 802.11-2016, 9.6.4.1, Table 9-353
impl BlockAckAction {
    pub_const!(ADDBA_REQUEST, 0);
    pub_const!(ADDBA_RESPONSE, 1);
    pub_const!(DELBA, 2);
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct SaQueryAction(pub u8);

/// IEEE Std 802.11-2016, 9.6.10.1, Table 9-395
impl SaQueryAction {
    pub_const!(REQUEST, 0);
    pub_const!(RESPONSE, 1);
}

// IEEE Std 802.11-2016, 9.4.1.4
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapabilityInfo(u16);
    impl Debug;
    pub ess, set_ess: 0;
    pub ibss, set_ibss: 1;
    pub cf_pollable, set_cf_pollable: 2;
    pub cf_poll_req, set_cf_poll_req: 3;
    pub privacy, set_privacy: 4;
    pub short_preamble, set_short_preamble: 5;
    pub spectrum_mgmt, set_spectrum_mgmt: 8;
    pub qos, set_qos: 9;
    pub short_slot_time, set_short_slot_time: 10;
    pub apsd, set_apsd: 11;
    pub radio_measurement, set_radio_measurement: 12;
    pub delayed_block_ack, set_delayed_block_ack: 14;
    pub immediate_block_ack, set_immediate_block_ack: 15;
}

impl CapabilityInfo {
    pub fn from_raw(raw: u16) -> Self {
        CapabilityInfo(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

/// Turns a globally administered address into a locally administered one, as
/// used for self-generated BSSIDs.
pub fn locally_administered(addr: &MacAddr) -> MacAddr {
    let mut out = *addr;
    out[0] = (out[0] & !0x01) | 0x02;
    out
}
