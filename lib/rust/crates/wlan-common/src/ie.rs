// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use bitfield::bitfield;

// IEEE Std 802.11-2016, 9.4.2.3
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SupportedRate(u8);
    impl Debug;
    pub u8, rate, set_rate: 6, 0;
    pub basic, set_basic: 7;
}

impl SupportedRate {
    /// `value` is expressed in units of 500 kb/s.
    pub fn new(value: u8, basic: bool) -> Self {
        let mut rate = SupportedRate(0);
        rate.set_rate(value);
        rate.set_basic(basic);
        rate
    }

    pub fn from_raw(raw: u8) -> Self {
        SupportedRate(raw)
    }

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn with_basic(mut self) -> Self {
        self.set_basic(true);
        self
    }

    /// ERP-OFDM rates, IEEE Std 802.11-2016, 18.1.1.
    pub fn is_ofdm(&self) -> bool {
        match self.rate() {
            12 | 18 | 24 | 36 | 48 | 72 | 96 | 108 => true,
            _ => false,
        }
    }
}

pub type RateSet = Vec<SupportedRate>;

/// Convenience constructor for a rate set from raw octets as they appear in the
/// Supported Rates element.
pub fn rate_set(raw: &[u8]) -> RateSet {
    raw.iter().map(|r| SupportedRate(*r)).collect()
}

/// Returns whether any rate in the set can only be used by ERP stations.
pub fn has_ofdm_rate(rates: &[SupportedRate]) -> bool {
    rates.iter().any(|r| r.is_ofdm())
}
