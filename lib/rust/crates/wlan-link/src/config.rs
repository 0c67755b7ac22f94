// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::error::Error,
    serde::Deserialize,
    std::{collections::HashMap, time::Duration},
    wlan_common::{ie::SupportedRate, mac::MacAddr},
};

/// One TU (time unit) is 1024 microseconds.
pub const TIME_UNIT: Duration = Duration::from_micros(1024);

const DEFAULT_SA_QUERY_RETRY_TU: u64 = 201;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProtectionMode {
    Off,
    CtsToSelf,
    RtsCts,
}

/// Tunables of the link engine. Every field has a default so a partial JSON document is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub group_rekey_interval_secs: u64,
    pub sa_query_retry_interval_ms: u64,
    pub sa_query_max_attempts: u8,
    pub addba_response_timeout_ms: u64,
    pub block_ack_inactivity_timeout_ms: u64,
    pub mgmt_timeout_ms: u64,
    pub eapol_timeout_ms: u64,
    pub eapol_max_retries: u8,
    pub max_peers: usize,
    pub max_failures: u32,
    pub fixed_rate: Option<u8>,
    pub protection_mode: ProtectionMode,
    pub ssid: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            group_rekey_interval_secs: 3600,
            sa_query_retry_interval_ms: (TIME_UNIT * DEFAULT_SA_QUERY_RETRY_TU as u32).as_millis()
                as u64,
            sa_query_max_attempts: 3,
            addba_response_timeout_ms: 1000,
            block_ack_inactivity_timeout_ms: 5000,
            mgmt_timeout_ms: 5000,
            eapol_timeout_ms: 1000,
            eapol_max_retries: 3,
            max_peers: 128,
            max_failures: 3,
            fixed_rate: None,
            protection_mode: ProtectionMode::CtsToSelf,
            ssid: None,
        }
    }
}

impl LinkConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: LinkConfig = serde_json::from_str(json)?;
        if config.max_peers == 0 {
            return Err(Error::Config("max_peers must be at least 1".to_string()));
        }
        Ok(config)
    }

    pub fn group_rekey_interval(&self) -> Duration {
        Duration::from_secs(self.group_rekey_interval_secs)
    }

    pub fn sa_query_retry_interval(&self) -> Duration {
        Duration::from_millis(self.sa_query_retry_interval_ms)
    }

    pub fn addba_response_timeout(&self) -> Duration {
        Duration::from_millis(self.addba_response_timeout_ms)
    }

    pub fn block_ack_inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.block_ack_inactivity_timeout_ms)
    }

    pub fn mgmt_timeout(&self) -> Duration {
        Duration::from_millis(self.mgmt_timeout_ms)
    }

    pub fn eapol_timeout(&self) -> Duration {
        Duration::from_millis(self.eapol_timeout_ms)
    }

    pub fn ssid_bytes(&self) -> Option<&[u8]> {
        self.ssid.as_ref().map(|s| s.as_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpMode {
    Station,
    Ibss,
    AccessPoint,
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhyMode {
    /// OFDM in the 5 GHz band.
    Dot11a,
    /// DSSS/CCK in the 2.4 GHz band.
    Dot11b,
    /// ERP in the 2.4 GHz band, the mode subject to protection.
    Dot11g,
}

/// Static description of the local radio.
#[derive(Debug, Clone)]
pub struct InterfaceCapabilities {
    pub addr: MacAddr,
    pub op_mode: OpMode,
    pub phy_mode: PhyMode,
    pub channel: u8,
    pub rsn_enabled: bool,
    pub mfp_capable: bool,
    pub short_preamble_capable: bool,
    pub short_slot_capable: bool,
    pub supported_rates: HashMap<PhyMode, Vec<SupportedRate>>,
}

impl InterfaceCapabilities {
    pub fn rates(&self) -> &[SupportedRate] {
        self.supported_rates.get(&self.phy_mode).map(|r| &r[..]).unwrap_or(&[])
    }
}
