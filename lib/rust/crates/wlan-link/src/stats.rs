// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use serde::Serialize;

/// Protocol statistics for one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    // Receive path drops and refusals.
    pub rx_bad_auth: u64,
    pub rx_auth_fail: u64,
    pub rx_auth_unsupported: u64,
    pub rx_assoc_notauth: u64,
    pub rx_assoc_badrsnie: u64,
    pub rx_assoc_capmismatch: u64,
    pub rx_assoc_norate: u64,
    pub rx_assoc_bss: u64,
    pub rx_ssid_mismatch: u64,
    pub rx_wrong_bss: u64,
    pub rx_mgmt_discard: u64,
    pub rx_deauth: u64,
    pub rx_disassoc: u64,
    pub rx_bad_subtype: u64,
    pub rx_unexpected_key: u64,
    pub node_alloc_fail: u64,

    // Transmit requests.
    pub tx_mgmt: u64,

    // Link management.
    pub mgmt_timeouts: u64,
    pub beacon_losses: u64,
    pub ibss_merges: u64,

    // Block-Ack.
    pub ba_sessions_requested: u64,
    pub ba_sessions_agreed: u64,
    pub ba_sessions_refused: u64,
    pub ba_response_timeouts: u64,
    pub ba_inactivity_timeouts: u64,
    pub ba_frames_released: u64,

    // Security.
    pub eapol_timeouts: u64,
    pub group_rekeys_started: u64,
    pub group_rekeys_completed: u64,
    pub key_install_failures: u64,
    pub sa_queries_sent: u64,
    pub sa_query_failures: u64,
}

impl Stats {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_counters() {
        let mut stats = Stats::default();
        stats.rx_bad_auth = 2;
        let json = stats.to_json().expect("serializable");
        assert!(json.contains("\"rx_bad_auth\":2"));
        assert!(json.contains("\"sa_query_failures\":0"));
    }
}
