// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Slot time, preamble and ERP protection.
//!
//! See IEEE Std 802.11-2016, 10.26.

use {
    crate::{
        config::{InterfaceCapabilities, OpMode, PhyMode, ProtectionMode},
        device::{DeviceOps, PhyParameters},
    },
    log::info,
    wlan_common::mac::CapabilityInfo,
};

#[derive(Debug)]
pub struct ProtectionPolicy {
    mode: ProtectionMode,
    short_slot_time: bool,
    short_preamble: bool,
    use_protection: bool,
    non_erp_peers: usize,
    long_slot_peers: usize,
}

impl ProtectionPolicy {
    pub fn new(mode: ProtectionMode) -> Self {
        Self {
            mode,
            short_slot_time: false,
            short_preamble: false,
            use_protection: false,
            non_erp_peers: 0,
            long_slot_peers: 0,
        }
    }

    pub fn short_slot_time(&self) -> bool {
        self.short_slot_time
    }

    pub fn short_preamble(&self) -> bool {
        self.short_preamble
    }

    pub fn use_protection(&self) -> bool {
        self.use_protection
    }

    pub fn params(&self) -> PhyParameters {
        PhyParameters {
            short_slot_time: self.short_slot_time,
            short_preamble: self.short_preamble,
            use_protection: self.use_protection,
        }
    }

    /// Derives all flags from the interface alone, forgetting any peer population.
    pub fn recompute(&mut self, caps: &InterfaceCapabilities, device: &mut dyn DeviceOps) {
        self.use_protection = false;
        self.non_erp_peers = 0;
        self.long_slot_peers = 0;
        self.short_preamble = caps.phy_mode == PhyMode::Dot11a || caps.short_preamble_capable;
        let short_slot_time = caps.phy_mode == PhyMode::Dot11a
            || (caps.phy_mode == PhyMode::Dot11g
                && caps.op_mode == OpMode::AccessPoint
                && caps.op_mode != OpMode::Ibss
                && caps.short_slot_capable);
        self.set_short_slot_time(short_slot_time, device);
    }

    /// Always notifies the device, even if the value is unchanged.
    pub fn set_short_slot_time(&mut self, enabled: bool, device: &mut dyn DeviceOps) {
        self.short_slot_time = enabled;
        device.notify_phy_parameters_changed(self.params());
    }

    /// Accounts for a peer that just associated with our BSS.
    pub fn on_peer_joined(
        &mut self,
        caps: &InterfaceCapabilities,
        peer_caps: CapabilityInfo,
        is_erp: bool,
        device: &mut dyn DeviceOps,
    ) {
        if caps.phy_mode != PhyMode::Dot11g {
            return;
        }
        if !peer_caps.short_slot_time() {
            self.long_slot_peers += 1;
            if self.short_slot_time {
                info!("long slot time station joined, disabling short slot time");
                self.set_short_slot_time(false, device);
            }
        }
        if !is_erp {
            self.non_erp_peers += 1;
            if self.mode != ProtectionMode::Off && !self.use_protection {
                info!("non-ERP station joined, enabling protection");
                self.use_protection = true;
                device.notify_phy_parameters_changed(self.params());
            }
        }
    }

    /// Reverses `on_peer_joined` for a peer that left.
    pub fn on_peer_left(
        &mut self,
        caps: &InterfaceCapabilities,
        peer_caps: CapabilityInfo,
        is_erp: bool,
        device: &mut dyn DeviceOps,
    ) {
        if caps.phy_mode != PhyMode::Dot11g {
            return;
        }
        if !peer_caps.short_slot_time() {
            self.long_slot_peers = self.long_slot_peers.saturating_sub(1);
            if self.long_slot_peers == 0
                && !self.short_slot_time
                && caps.op_mode == OpMode::AccessPoint
                && caps.short_slot_capable
            {
                self.set_short_slot_time(true, device);
            }
        }
        if !is_erp {
            self.non_erp_peers = self.non_erp_peers.saturating_sub(1);
            if self.non_erp_peers == 0 && self.use_protection {
                self.use_protection = false;
                device.notify_phy_parameters_changed(self.params());
            }
        }
    }

    /// Adopts what the AP we associated with announced.
    pub fn apply_bss(
        &mut self,
        caps: &InterfaceCapabilities,
        bss_caps: CapabilityInfo,
        erp_use_protection: bool,
        device: &mut dyn DeviceOps,
    ) {
        let dot11a = caps.phy_mode == PhyMode::Dot11a;
        self.short_preamble = dot11a || (caps.short_preamble_capable && bss_caps.short_preamble());
        self.use_protection = caps.phy_mode == PhyMode::Dot11g
            && erp_use_protection
            && self.mode != ProtectionMode::Off;
        let short_slot_time = dot11a || (caps.short_slot_capable && bss_caps.short_slot_time());
        self.set_short_slot_time(short_slot_time, device);
    }

    /// A beacon of our BSS changed the Use_Protection bit.
    pub fn on_erp_changed(
        &mut self,
        caps: &InterfaceCapabilities,
        erp_use_protection: bool,
        device: &mut dyn DeviceOps,
    ) {
        let use_protection = caps.phy_mode == PhyMode::Dot11g
            && erp_use_protection
            && self.mode != ProtectionMode::Off;
        if use_protection != self.use_protection {
            self.use_protection = use_protection;
            device.notify_phy_parameters_changed(self.params());
        }
    }
}
