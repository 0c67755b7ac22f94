// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::config::OpMode,
    bitflags::bitflags,
    std::fmt,
    wlan_common::ie::SupportedRate,
};

bitflags! {
    /// Steps `RateNegotiator::reconcile` performs on a peer's rate set.
    pub struct ReconcileFlags: u8 {
        const SORT = 0b0001;
        const FIXED_RATE_CHECK = 0b0010;
        const NEGOTIATE = 0b0100;
        const DELETE = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchCause {
    NoCommonRate,
    BasicRateUnsupported,
    FixedRateMissing,
}

/// A failed negotiation. `rate` always has its basic bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateMismatch {
    pub rate: SupportedRate,
    pub cause: MismatchCause,
}

impl RateMismatch {
    fn new(rate: SupportedRate, cause: MismatchCause) -> Self {
        Self { rate: rate.with_basic(), cause }
    }
}

impl fmt::Display for RateMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} (rate {} x 500 kb/s)", self.cause, self.rate.rate())
    }
}

/// Reconciles advertised rate sets against the locally supported set.
pub struct RateNegotiator<'a> {
    supported: &'a [SupportedRate],
    fixed_rate: Option<u8>,
    op_mode: OpMode,
}

impl<'a> RateNegotiator<'a> {
    pub fn new(supported: &'a [SupportedRate], fixed_rate: Option<u8>, op_mode: OpMode) -> Self {
        Self { supported, fixed_rate, op_mode }
    }

    /// Validates, filters and sorts `rates` in place. Returns the highest surviving rate.
    pub fn reconcile(
        &self,
        rates: &mut Vec<SupportedRate>,
        flags: ReconcileFlags,
    ) -> Result<SupportedRate, RateMismatch> {
        if flags.contains(ReconcileFlags::SORT) {
            // `sort_by_key` is stable, so equal values keep their advertised order.
            rates.sort_by_key(|r| r.rate());
        }

        let fixed_rate = self.fixed_rate.filter(|_| flags.contains(ReconcileFlags::FIXED_RATE_CHECK));
        let mut fixed_rate_found = false;
        let mut basic_mismatch = None;
        let mut last_examined = None;
        let mut ok_rate = None;
        let mut ignore = vec![false; rates.len()];

        for (entry, ignored) in rates.iter_mut().zip(ignore.iter_mut()) {
            last_examined = Some(*entry);
            if fixed_rate == Some(entry.rate()) {
                fixed_rate_found = true;
            }
            if flags.contains(ReconcileFlags::NEGOTIATE) {
                match self.lookup(*entry) {
                    Some(supported) => *entry = supported,
                    None => {
                        if self.op_mode == OpMode::AccessPoint
                            && entry.basic()
                            && basic_mismatch.is_none()
                        {
                            basic_mismatch = Some(*entry);
                        }
                        *ignored = true;
                    }
                }
            }
            if !*ignored {
                ok_rate = Some(*entry);
            }
        }

        if flags.contains(ReconcileFlags::DELETE) {
            *rates = rates
                .iter()
                .zip(ignore.iter())
                .filter(|(_, ignored)| !**ignored)
                .map(|(rate, _)| *rate)
                .collect();
        }

        if let Some(rate) = basic_mismatch {
            return Err(RateMismatch::new(rate, MismatchCause::BasicRateUnsupported));
        }
        if let Some(fixed) = fixed_rate {
            if !fixed_rate_found {
                return Err(RateMismatch::new(
                    SupportedRate::new(fixed, true),
                    MismatchCause::FixedRateMissing,
                ));
            }
        }
        ok_rate.ok_or_else(|| {
            RateMismatch::new(
                last_examined.unwrap_or_default(),
                MismatchCause::NoCommonRate,
            )
        })
    }

    // An access point only accepts a rate a peer requires as basic if it is basic locally too.
    fn lookup(&self, entry: SupportedRate) -> Option<SupportedRate> {
        self.supported.iter().copied().find(|s| s.rate() == entry.rate()).filter(|s| {
            !(self.op_mode == OpMode::AccessPoint && entry.basic() && !s.basic())
        })
    }
}
