// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{rates::RateMismatch, state::LinkState},
    thiserror::Error,
    wlan_common::mac::{MacAddr, MacFmt},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("operation not valid in current state: {0}")]
    InvalidState(String),
    #[error("no transition from {from:?} to {to:?}")]
    InvalidTransition { from: LinkState, to: LinkState },
    #[error("unknown peer {}", MacFmt(.0))]
    NoSuchPeer(MacAddr),
    #[error("no PMK cached for peer {}", MacFmt(.0))]
    NoPmk(MacAddr),
    #[error("peer table is full ({0} entries)")]
    PeerTableFull(usize),
    #[error("rate negotiation failed: {0}")]
    RateNegotiation(RateMismatch),
    #[error("invalid TID {0}")]
    InvalidTid(u8),
    #[error("device error: {0}")]
    Device(#[source] anyhow::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<RateMismatch> for Error {
    fn from(e: RateMismatch) -> Self {
        Error::RateNegotiation(e)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::rates::MismatchCause,
        anyhow::format_err,
        wlan_common::{assert_variant, ie::SupportedRate},
    };

    #[test]
    fn display_peer_errors() {
        let addr = [1, 2, 3, 4, 5, 6];
        assert_eq!(format!("{}", Error::NoSuchPeer(addr)), "unknown peer 01:02:03:04:05:06");
        assert_eq!(format!("{}", Error::NoPmk(addr)), "no PMK cached for peer 01:02:03:04:05:06");
    }

    #[test]
    fn from_rate_mismatch() {
        let mismatch = RateMismatch {
            rate: SupportedRate::new(11, true),
            cause: MismatchCause::BasicRateUnsupported,
        };
        let e: Error = mismatch.into();
        assert_variant!(e, Error::RateNegotiation(m) => assert_eq!(m.rate.rate(), 11));
    }

    #[test]
    fn from_anyhow() {
        let e: Error = format_err!("tx rate index out of bounds").into();
        assert_variant!(e, Error::Internal(_));
    }
}
