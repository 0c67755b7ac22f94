// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Crate wlan-common hosts common libraries
//! to be used for WLAN link-layer components.

pub mod ie;
pub mod mac;
pub mod sink;
pub mod timer;

#[macro_export]
macro_rules! assert_variant {
    ($value:expr, $variant:pat => $e:expr) => {
        match $value {
            $variant => $e,
            other => panic!("unexpected variant: {:?}", other),
        }
    };
    ($value:expr, $variant:pat) => {
        $crate::assert_variant!($value, $variant => {})
    };
}
