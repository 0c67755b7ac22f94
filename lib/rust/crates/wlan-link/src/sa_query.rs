// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! SA Query procedure for peers using management frame protection.
//!
//! See IEEE Std 802.11-2016, 11.13.

use {
    crate::{
        device::{ActionFrame, MgmtFrame},
        error::Error,
        peer::{PeerNode, SaQueryState},
        Env, TimedEvent,
    },
    log::{debug, info, warn},
    wlan_common::{mac::MacFmt, timer::EventId},
};

/// Starts an SA Query with `peer`. Calling this while a query is outstanding has no effect.
pub fn request(peer: &mut PeerNode, env: &mut Env<'_>) -> Result<(), Error> {
    if !peer.security.mfp {
        return Err(Error::InvalidState(format!(
            "peer {} does not use management frame protection",
            MacFmt(&peer.addr)
        )));
    }
    match peer.security.sa_query {
        SaQueryState::InProgress => Ok(()),
        SaQueryState::Failed => Err(Error::InvalidState(format!(
            "SA Query with {} already failed",
            MacFmt(&peer.addr)
        ))),
        SaQueryState::Idle => {
            peer.security.sa_query = SaQueryState::InProgress;
            peer.security.sa_query_attempts = 0;
            send_query(peer, env);
            Ok(())
        }
    }
}

fn send_query(peer: &mut PeerNode, env: &mut Env<'_>) {
    let security = &mut peer.security;
    security.sa_query_trans_id = security.sa_query_trans_id.wrapping_add(1);
    security.sa_query_attempts += 1;
    if let Some(timer) = security.sa_query_timer.take() {
        env.timer.cancel_event(timer);
    }
    security.sa_query_timer = Some(env.timer.schedule_after(
        env.config.sa_query_retry_interval(),
        TimedEvent::SaQuery { peer: peer.addr },
    ));
    let trans_id = security.sa_query_trans_id;
    env.stats.sa_queries_sent += 1;
    env.send(&peer.addr, MgmtFrame::Action(ActionFrame::SaQueryRequest { trans_id }));
}

/// Retransmits the query until the attempt budget is spent, then marks it failed.
pub fn on_timeout(id: EventId, peer: &mut PeerNode, env: &mut Env<'_>) {
    if peer.security.sa_query_timer != Some(id) {
        debug!("stale SA Query timer for {}", MacFmt(&peer.addr));
        return;
    }
    peer.security.sa_query_timer = None;
    if peer.security.sa_query != SaQueryState::InProgress {
        return;
    }
    if peer.security.sa_query_attempts < env.config.sa_query_max_attempts {
        send_query(peer, env);
    } else {
        peer.security.sa_query = SaQueryState::Failed;
        env.stats.sa_query_failures += 1;
        warn!(
            "SA Query with {} failed after {} attempts",
            MacFmt(&peer.addr),
            peer.security.sa_query_attempts
        );
    }
}

/// Answers a peer's SA Query request with the same transaction ID.
pub fn on_request(peer: &mut PeerNode, trans_id: u16, env: &mut Env<'_>) {
    env.send(&peer.addr, MgmtFrame::Action(ActionFrame::SaQueryResponse { trans_id }));
}

/// Returns true if the response completed the outstanding query.
pub fn on_response(peer: &mut PeerNode, trans_id: u16, env: &mut Env<'_>) -> bool {
    let security = &mut peer.security;
    if security.sa_query != SaQueryState::InProgress || security.sa_query_trans_id != trans_id {
        debug!("unexpected SA Query response {} from {}", trans_id, MacFmt(&peer.addr));
        env.stats.rx_mgmt_discard += 1;
        return false;
    }
    if let Some(timer) = security.sa_query_timer.take() {
        env.timer.cancel_event(timer);
    }
    security.sa_query = SaQueryState::Idle;
    security.sa_query_attempts = 0;
    info!("SA Query with {} succeeded", MacFmt(&peer.addr));
    true
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{peer::PeerState, test_utils::TestEnv},
        std::time::Duration,
        wlan_common::{assert_variant, mac::MacAddr},
    };

    const PEER: MacAddr = [9; 6];

    fn mfp_peer() -> PeerNode {
        let mut peer = PeerNode::new(PEER);
        peer.state = PeerState::Associated;
        peer.security.mfp = true;
        peer
    }

    fn expire(peer: &mut PeerNode, env: &mut TestEnv) {
        let id = peer.security.sa_query_timer().expect("timer armed");
        assert_eq!(env.timer.triggered(&id), Some(TimedEvent::SaQuery { peer: PEER }));
        on_timeout(id, peer, &mut env.env());
    }

    #[test]
    fn requires_mfp() {
        let mut env = TestEnv::new();
        let mut peer = PeerNode::new(PEER);
        assert_variant!(request(&mut peer, &mut env.env()), Err(Error::InvalidState(_)));
        assert!(env.device.frames.is_empty());
    }

    #[test]
    fn request_is_idempotent_while_in_progress() {
        let mut env = TestEnv::new();
        let mut peer = mfp_peer();
        request(&mut peer, &mut env.env()).expect("query started");
        request(&mut peer, &mut env.env()).expect("already running");
        assert_eq!(env.device.action_frames().len(), 1);
        assert_eq!(env.timer.len(), 1);
        assert_eq!(peer.security.sa_query_trans_id, 1);
        assert_eq!(env.scheduler.scheduled()[0].1, Duration::from_millis(205));
    }

    #[test]
    fn retries_then_fails() {
        let mut env = TestEnv::new();
        let mut peer = mfp_peer();
        request(&mut peer, &mut env.env()).expect("query started");
        expire(&mut peer, &mut env);
        expire(&mut peer, &mut env);
        assert_eq!(peer.security.sa_query, SaQueryState::InProgress);
        expire(&mut peer, &mut env);

        assert_eq!(peer.security.sa_query, SaQueryState::Failed);
        assert_eq!(
            env.device.action_frames(),
            vec![
                (PEER, ActionFrame::SaQueryRequest { trans_id: 1 }),
                (PEER, ActionFrame::SaQueryRequest { trans_id: 2 }),
                (PEER, ActionFrame::SaQueryRequest { trans_id: 3 }),
            ]
        );
        assert!(env.timer.is_empty());
        assert_eq!(env.stats.sa_query_failures, 1);
        assert_variant!(request(&mut peer, &mut env.env()), Err(Error::InvalidState(_)));
    }

    #[test]
    fn matching_response_completes_query() {
        let mut env = TestEnv::new();
        let mut peer = mfp_peer();
        request(&mut peer, &mut env.env()).expect("query started");
        expire(&mut peer, &mut env);

        // Only the latest transaction ID counts.
        assert!(!on_response(&mut peer, 1, &mut env.env()));
        assert!(on_response(&mut peer, 2, &mut env.env()));
        assert_eq!(peer.security.sa_query, SaQueryState::Idle);
        assert!(env.timer.is_empty());
    }

    #[test]
    fn responder_echoes_transaction_id() {
        let mut env = TestEnv::new();
        let mut peer = mfp_peer();
        on_request(&mut peer, 0xBEEF, &mut env.env());
        assert_eq!(
            env.device.action_frames(),
            vec![(PEER, ActionFrame::SaQueryResponse { trans_id: 0xBEEF })]
        );
    }
}
