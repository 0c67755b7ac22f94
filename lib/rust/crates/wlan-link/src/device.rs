// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::key::KeyRecord,
    wlan_common::mac::{
        ActionCategory, Aid, AuthAlgorithmNumber, BlockAckAction, MacAddr, ReasonCode,
        SaQueryAction, StatusCode,
    },
};

#[cfg(test)]
pub use test_utils::*;

/// Whether the link carries data. Independent of the engine's RUN state while an RSN
/// handshake is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Unknown,
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyParameters {
    pub short_slot_time: bool,
    pub short_preamble: bool,
    pub use_protection: bool,
}

/// Management frames the engine asks the transmit path to build and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MgmtFrame {
    Auth { algorithm: AuthAlgorithmNumber, seq: u16, status: StatusCode },
    Deauth { reason: ReasonCode },
    AssocReq { reassoc: bool },
    AssocResp { reassoc: bool, status: StatusCode, aid: Aid },
    Disassoc { reason: ReasonCode },
    Action(ActionFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFrame {
    AddbaRequest { tid: u8, dialog_token: u8, buffer_size: u16, ssn: u16 },
    AddbaResponse { tid: u8, dialog_token: u8, status: StatusCode, buffer_size: u16 },
    Delba { tid: u8, initiator: bool, reason: ReasonCode },
    SaQueryRequest { trans_id: u16 },
    SaQueryResponse { trans_id: u16 },
}

impl ActionFrame {
    pub fn category(&self) -> ActionCategory {
        match self {
            ActionFrame::AddbaRequest { .. }
            | ActionFrame::AddbaResponse { .. }
            | ActionFrame::Delba { .. } => ActionCategory::BLOCK_ACK,
            ActionFrame::SaQueryRequest { .. } | ActionFrame::SaQueryResponse { .. } => {
                ActionCategory::SA_QUERY
            }
        }
    }

    pub fn action(&self) -> u8 {
        match self {
            ActionFrame::AddbaRequest { .. } => BlockAckAction::ADDBA_REQUEST.0,
            ActionFrame::AddbaResponse { .. } => BlockAckAction::ADDBA_RESPONSE.0,
            ActionFrame::Delba { .. } => BlockAckAction::DELBA.0,
            ActionFrame::SaQueryRequest { .. } => SaQueryAction::REQUEST.0,
            ActionFrame::SaQueryResponse { .. } => SaQueryAction::RESPONSE.0,
        }
    }
}

/// First message of an EAPOL handshake the authenticator should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    Pairwise { pmk: Vec<u8> },
    Group { gtk_id: u8, igtk_id: Option<u8> },
}

/// Everything the engine needs from the outside world. Frame construction, key derivation
/// and scanning all live behind this trait.
pub trait DeviceOps {
    /// Fire-and-forget request to build and transmit a management frame to `peer`.
    fn send_mgmt(&mut self, peer: &MacAddr, frame: MgmtFrame);

    fn send_handshake_msg1(
        &mut self,
        peer: &MacAddr,
        handshake: Handshake,
    ) -> Result<(), anyhow::Error>;

    fn install_key(&mut self, key: &KeyRecord) -> Result<(), anyhow::Error>;

    fn delete_key(&mut self, key: &KeyRecord);

    fn set_link_status(&mut self, status: LinkStatus);

    /// Slot time, preamble or protection changed.
    fn notify_phy_parameters_changed(&mut self, params: PhyParameters);

    /// Candidates are reported back as `Event::ScanResult` followed by `Event::ScanComplete`.
    fn begin_scan(&mut self);
}

#[cfg(test)]
mod test_utils {
    use {
        super::*,
        anyhow::format_err,
        std::collections::HashSet,
    };

    /// Records every call made by the engine.
    #[derive(Default)]
    pub struct FakeDevice {
        pub frames: Vec<(MacAddr, MgmtFrame)>,
        pub handshakes: Vec<(MacAddr, Handshake)>,
        pub installed_keys: Vec<KeyRecord>,
        pub deleted_keys: Vec<KeyRecord>,
        pub link_status: Vec<LinkStatus>,
        pub phy_updates: Vec<PhyParameters>,
        pub scans: usize,
        pub fail_handshake_for: HashSet<MacAddr>,
        pub fail_install_key: bool,
    }

    impl FakeDevice {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_link_status(&self) -> Option<LinkStatus> {
            self.link_status.last().copied()
        }

        pub fn frames_to(&self, peer: &MacAddr) -> Vec<MgmtFrame> {
            self.frames.iter().filter(|(addr, _)| addr == peer).map(|(_, f)| f.clone()).collect()
        }

        pub fn action_frames(&self) -> Vec<(MacAddr, ActionFrame)> {
            self.frames
                .iter()
                .filter_map(|(addr, frame)| match frame {
                    MgmtFrame::Action(action) => Some((*addr, *action)),
                    _ => None,
                })
                .collect()
        }

        pub fn delba_count(&self) -> usize {
            self.action_frames()
                .iter()
                .filter(|(_, f)| match f {
                    ActionFrame::Delba { .. } => true,
                    _ => false,
                })
                .count()
        }

        pub fn clear(&mut self) {
            self.frames.clear();
            self.handshakes.clear();
            self.installed_keys.clear();
            self.deleted_keys.clear();
            self.link_status.clear();
            self.phy_updates.clear();
            self.scans = 0;
        }
    }

    impl DeviceOps for FakeDevice {
        fn send_mgmt(&mut self, peer: &MacAddr, frame: MgmtFrame) {
            self.frames.push((*peer, frame));
        }

        fn send_handshake_msg1(
            &mut self,
            peer: &MacAddr,
            handshake: Handshake,
        ) -> Result<(), anyhow::Error> {
            if self.fail_handshake_for.contains(peer) {
                return Err(format_err!("authenticator rejected handshake"));
            }
            self.handshakes.push((*peer, handshake));
            Ok(())
        }

        fn install_key(&mut self, key: &KeyRecord) -> Result<(), anyhow::Error> {
            if self.fail_install_key {
                return Err(format_err!("key table full"));
            }
            self.installed_keys.push(key.clone());
            Ok(())
        }

        fn delete_key(&mut self, key: &KeyRecord) {
            self.deleted_keys.push(key.clone());
        }

        fn set_link_status(&mut self, status: LinkStatus) {
            self.link_status.push(status);
        }

        fn notify_phy_parameters_changed(&mut self, params: PhyParameters) {
            self.phy_updates.push(params);
        }

        fn begin_scan(&mut self) {
            self.scans += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_frame_codes() {
        let delba = ActionFrame::Delba { tid: 0, initiator: true, reason: ReasonCode::TIMEOUT };
        assert_eq!(delba.category(), ActionCategory::BLOCK_ACK);
        assert_eq!(delba.action(), 2);
        let query = ActionFrame::SaQueryResponse { trans_id: 7 };
        assert_eq!(query.category(), ActionCategory::SA_QUERY);
        assert_eq!(query.action(), 1);
    }

    #[test]
    fn fake_device_records() {
        let mut device = FakeDevice::new();
        device.send_mgmt(&[1; 6], MgmtFrame::Deauth { reason: ReasonCode::STA_LEAVING });
        device.fail_handshake_for.insert([2; 6]);
        assert!(device
            .send_handshake_msg1(&[2; 6], Handshake::Pairwise { pmk: vec![0; 32] })
            .is_err());
        assert_eq!(device.frames_to(&[1; 6]).len(), 1);
        assert!(device.handshakes.is_empty());
    }
}
