// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! BlockAck sessions.
//!
//! Every peer carries one originator and one recipient session per TID. Sessions are set up with
//! an ADDBA exchange and torn down with a DELBA frame or silently when the link goes away. A
//! session owns at most one timer at any time: the ADDBA response timer while `Requested` and
//! the inactivity timer while `Agreed`.
//!
//! See IEEE Std 802.11-2016, 10.24.

use {
    crate::{
        device::{ActionFrame, MgmtFrame},
        error::Error,
        Env, TimedEvent,
    },
    log::{debug, info, warn},
    std::time::Duration,
    wlan_common::{
        mac::{MacAddr, MacFmt, ReasonCode, StatusCode, SEQ_SPACE},
        timer::EventId,
    },
};

pub const NUM_TIDS: u8 = 16;
pub const MAX_WINDOW_SIZE: u16 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Originator,
    Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requested,
    Agreed,
}

#[derive(Debug)]
pub struct BlockAckSession {
    state: SessionState,
    window_size: u16,
    win_start: u16,
    win_end: u16,
    dialog_token: u8,
    timer: Option<EventId>,
    // Recipient side only: frames held back for in-order delivery, indexed by window offset.
    reorder: Vec<Option<Vec<u8>>>,
}

impl Default for BlockAckSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            window_size: 0,
            win_start: 0,
            win_end: 0,
            dialog_token: 0,
            timer: None,
            reorder: vec![],
        }
    }
}

impl BlockAckSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn window_size(&self) -> u16 {
        self.window_size
    }

    /// Start and end sequence numbers of the window, both inclusive.
    pub fn window(&self) -> (u16, u16) {
        (self.win_start, self.win_end)
    }

    pub fn dialog_token(&self) -> u8 {
        self.dialog_token
    }

    pub fn timer(&self) -> Option<EventId> {
        self.timer
    }

    pub fn buffered_frames(&self) -> usize {
        self.reorder.iter().filter(|f| f.is_some()).count()
    }

    fn set_window(&mut self, ssn: u16, size: u16) {
        self.window_size = size;
        self.win_start = ssn % SEQ_SPACE;
        self.win_end = (self.win_start + size - 1) % SEQ_SPACE;
    }
}

fn negotiated_window(requested: u16) -> u16 {
    match requested {
        // A buffer size of zero leaves the choice to the recipient.
        0 => MAX_WINDOW_SIZE,
        n => n.min(MAX_WINDOW_SIZE),
    }
}

/// All BlockAck sessions held with one peer.
#[derive(Debug)]
pub struct BlockAckSessions {
    peer: MacAddr,
    originator: Vec<BlockAckSession>,
    recipient: Vec<BlockAckSession>,
    next_dialog_token: u8,
}

impl BlockAckSessions {
    pub fn new(peer: MacAddr) -> Self {
        let sessions = || (0..NUM_TIDS).map(|_| BlockAckSession::default()).collect();
        Self { peer, originator: sessions(), recipient: sessions(), next_dialog_token: 1 }
    }

    pub fn session(&self, direction: Direction, tid: u8) -> Result<&BlockAckSession, Error> {
        let sessions = match direction {
            Direction::Originator => &self.originator,
            Direction::Recipient => &self.recipient,
        };
        sessions.get(tid as usize).ok_or(Error::InvalidTid(tid))
    }

    fn session_mut(
        &mut self,
        direction: Direction,
        tid: u8,
    ) -> Result<&mut BlockAckSession, Error> {
        let sessions = match direction {
            Direction::Originator => &mut self.originator,
            Direction::Recipient => &mut self.recipient,
        };
        sessions.get_mut(tid as usize).ok_or(Error::InvalidTid(tid))
    }

    /// Number of sessions which are not `Idle`.
    pub fn active(&self) -> usize {
        self.originator
            .iter()
            .chain(self.recipient.iter())
            .filter(|s| s.state != SessionState::Idle)
            .count()
    }

    fn arm(
        &self,
        direction: Direction,
        tid: u8,
        after: Duration,
        env: &mut Env<'_>,
    ) -> EventId {
        env.timer.schedule_after(after, TimedEvent::BlockAck { peer: self.peer, tid, direction })
    }

    fn take_dialog_token(&mut self) -> u8 {
        let token = self.next_dialog_token;
        self.next_dialog_token = match token.wrapping_add(1) {
            0 => 1,
            t => t,
        };
        token
    }

    /// Starts an originator session with an ADDBA request. Only valid from `Idle`.
    ///
    /// See IEEE Std 802.11-2016, 10.24.2.
    pub fn request_session(&mut self, tid: u8, ssn: u16, env: &mut Env<'_>) -> Result<(), Error> {
        if self.session(Direction::Originator, tid)?.state != SessionState::Idle {
            return Err(Error::InvalidState(format!("originator session for TID {} not idle", tid)));
        }
        let dialog_token = self.take_dialog_token();
        let timer = self.arm(Direction::Originator, tid, env.config.addba_response_timeout(), env);
        let session = self.session_mut(Direction::Originator, tid)?;
        session.dialog_token = dialog_token;
        session.set_window(ssn, MAX_WINDOW_SIZE);
        session.timer = Some(timer);
        session.state = SessionState::Requested;
        env.stats.ba_sessions_requested += 1;
        env.send(
            &self.peer,
            MgmtFrame::Action(ActionFrame::AddbaRequest {
                tid,
                dialog_token,
                buffer_size: MAX_WINDOW_SIZE,
                ssn: ssn % SEQ_SPACE,
            }),
        );
        Ok(())
    }

    /// Handles the recipient's answer to an ADDBA request of ours.
    pub fn on_addba_response(
        &mut self,
        tid: u8,
        dialog_token: u8,
        status: StatusCode,
        buffer_size: u16,
        env: &mut Env<'_>,
    ) {
        let peer = self.peer;
        let session = match self.session_mut(Direction::Originator, tid) {
            Ok(session) => session,
            Err(e) => {
                debug!("dropping ADDBA response from {}: {}", MacFmt(&peer), e);
                env.stats.rx_mgmt_discard += 1;
                return;
            }
        };
        if session.state != SessionState::Requested || session.dialog_token != dialog_token {
            debug!(
                "unexpected ADDBA response from {} for TID {} (state {:?}, token {})",
                MacFmt(&peer),
                tid,
                session.state,
                dialog_token
            );
            env.stats.rx_mgmt_discard += 1;
            return;
        }
        if let Some(timer) = session.timer.take() {
            env.timer.cancel_event(timer);
        }
        if status.is_success() {
            let (ssn, _) = session.window();
            session.set_window(ssn, negotiated_window(buffer_size));
            session.state = SessionState::Agreed;
            let timer = env.timer.schedule_after(
                env.config.block_ack_inactivity_timeout(),
                TimedEvent::BlockAck { peer, tid, direction: Direction::Originator },
            );
            session.timer = Some(timer);
            env.stats.ba_sessions_agreed += 1;
            info!("BlockAck originator session with {} for TID {} agreed", MacFmt(&peer), tid);
        } else {
            session.state = SessionState::Idle;
            env.stats.ba_sessions_refused += 1;
            info!("{} refused BlockAck for TID {}: {:?}", MacFmt(&peer), tid, status);
        }
    }

    /// Accepts a peer's ADDBA request as recipient.
    pub fn on_addba_request(
        &mut self,
        tid: u8,
        dialog_token: u8,
        buffer_size: u16,
        ssn: u16,
        env: &mut Env<'_>,
    ) {
        let peer = self.peer;
        let inactivity_timeout = env.config.block_ack_inactivity_timeout();
        let session = match self.session_mut(Direction::Recipient, tid) {
            Ok(session) => session,
            Err(e) => {
                debug!("refusing ADDBA request from {}: {}", MacFmt(&peer), e);
                env.send(
                    &peer,
                    MgmtFrame::Action(ActionFrame::AddbaResponse {
                        tid,
                        dialog_token,
                        status: StatusCode::INVALID_PARAMETERS,
                        buffer_size: 0,
                    }),
                );
                return;
            }
        };
        match session.state {
            SessionState::Idle => {
                let size = negotiated_window(buffer_size);
                session.set_window(ssn, size);
                session.dialog_token = dialog_token;
                session.reorder = (0..size).map(|_| None).collect();
                session.state = SessionState::Agreed;
                env.stats.ba_sessions_agreed += 1;
                info!("BlockAck recipient session with {} for TID {} agreed", MacFmt(&peer), tid);
            }
            // A repeated request refreshes the agreement. The window is kept so buffered frames
            // stay valid.
            _ => session.dialog_token = dialog_token,
        }
        if let Some(timer) = session.timer.take() {
            env.timer.cancel_event(timer);
        }
        let timer = env.timer.schedule_after(
            inactivity_timeout,
            TimedEvent::BlockAck { peer, tid, direction: Direction::Recipient },
        );
        session.timer = Some(timer);
        let buffer_size = session.window_size;
        env.send(
            &peer,
            MgmtFrame::Action(ActionFrame::AddbaResponse {
                tid,
                dialog_token,
                status: StatusCode::SUCCESS,
                buffer_size,
            }),
        );
    }

    /// The peer tore a session down. DELBA frames are never answered.
    pub fn on_delba(&mut self, tid: u8, initiator: bool, env: &mut Env<'_>) {
        // The initiator bit describes the sender's role.
        let direction = if initiator { Direction::Recipient } else { Direction::Originator };
        match self.teardown(direction, tid, env) {
            Ok(()) => info!(
                "{} closed BlockAck {:?} session for TID {}",
                MacFmt(&self.peer),
                direction,
                tid
            ),
            Err(e) => debug!("ignoring DELBA from {}: {}", MacFmt(&self.peer), e),
        }
    }

    /// Closes a `Requested` or `Agreed` session with a DELBA frame.
    ///
    /// See IEEE Std 802.11-2016, 10.24.5.
    pub fn delete_session(
        &mut self,
        tid: u8,
        direction: Direction,
        reason: ReasonCode,
        env: &mut Env<'_>,
    ) -> Result<(), Error> {
        if self.session(direction, tid)?.state == SessionState::Idle {
            return Err(Error::InvalidState(format!(
                "no {:?} session for TID {} to delete",
                direction, tid
            )));
        }
        env.send(
            &self.peer,
            MgmtFrame::Action(ActionFrame::Delba {
                tid,
                initiator: direction == Direction::Originator,
                reason,
            }),
        );
        self.teardown(direction, tid, env)
    }

    /// Dispatches an expired session timer. `id` must be the timer the session currently owns,
    /// anything else is stale and ignored.
    pub fn on_timeout(&mut self, id: EventId, tid: u8, direction: Direction, env: &mut Env<'_>) {
        let peer = self.peer;
        let session = match self.session_mut(direction, tid) {
            Ok(session) => session,
            Err(_) => return,
        };
        if session.timer != Some(id) {
            debug!("stale BlockAck timer for {} TID {}", MacFmt(&peer), tid);
            return;
        }
        // The timer fired, so there is nothing left to cancel.
        session.timer = None;
        match session.state {
            SessionState::Requested => {
                // Abandoned: no DELBA and no automatic retry.
                session.state = SessionState::Idle;
                env.stats.ba_response_timeouts += 1;
                info!("ADDBA request to {} for TID {} timed out", MacFmt(&peer), tid);
            }
            SessionState::Agreed => {
                env.stats.ba_inactivity_timeouts += 1;
                if let Err(e) = self.delete_session(tid, direction, ReasonCode::TIMEOUT, env) {
                    warn!("failed to close inactive BlockAck session: {}", e);
                }
            }
            SessionState::Idle => {}
        }
    }

    /// Traffic on an agreed session restarts its inactivity timer.
    pub fn on_traffic(&mut self, direction: Direction, tid: u8, env: &mut Env<'_>) {
        let peer = self.peer;
        let after = env.config.block_ack_inactivity_timeout();
        if let Ok(session) = self.session_mut(direction, tid) {
            if session.state != SessionState::Agreed {
                return;
            }
            if let Some(timer) = session.timer.take() {
                env.timer.cancel_event(timer);
            }
            session.timer = Some(
                env.timer.schedule_after(after, TimedEvent::BlockAck { peer, tid, direction }),
            );
        }
    }

    /// Holds an out-of-order frame received on an agreed recipient session.
    pub fn buffer_frame(
        &mut self,
        tid: u8,
        seq: u16,
        frame: Vec<u8>,
        env: &mut Env<'_>,
    ) -> Result<(), Error> {
        let session = self.session_mut(Direction::Recipient, tid)?;
        if session.state != SessionState::Agreed {
            return Err(Error::InvalidState(format!("no recipient session for TID {}", tid)));
        }
        let offset = (seq % SEQ_SPACE).wrapping_sub(session.win_start) % SEQ_SPACE;
        match session.reorder.get_mut(offset as usize) {
            Some(slot) => *slot = Some(frame),
            None => {
                return Err(Error::InvalidState(format!(
                    "sequence number {} outside reorder window",
                    seq
                )))
            }
        }
        self.on_traffic(Direction::Recipient, tid, env);
        Ok(())
    }

    /// Returns every session to `Idle` without any frame exchange. Used when the link to the
    /// peer is gone.
    pub fn release_all(&mut self, env: &mut Env<'_>) {
        for tid in 0..NUM_TIDS {
            for direction in [Direction::Originator, Direction::Recipient].iter() {
                // Only `Idle` sessions fail to tear down, which is fine here.
                let _ = self.teardown(*direction, tid, env);
            }
        }
    }

    fn teardown(&mut self, direction: Direction, tid: u8, env: &mut Env<'_>) -> Result<(), Error> {
        let session = self.session_mut(direction, tid)?;
        if session.state == SessionState::Idle {
            return Err(Error::InvalidState(format!("{:?} session for TID {} idle", direction, tid)));
        }
        if let Some(timer) = session.timer.take() {
            env.timer.cancel_event(timer);
        }
        env.stats.ba_frames_released += session.buffered_frames() as u64;
        *session = BlockAckSession::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_utils::TestEnv,
        wlan_common::assert_variant,
    };

    const PEER: MacAddr = [7; 6];

    fn fire(sessions: &mut BlockAckSessions, env: &mut TestEnv, id: EventId) {
        let event = env.timer.triggered(&id).expect("timer was armed");
        let (tid, direction) = assert_variant!(event,
            TimedEvent::BlockAck { peer, tid, direction } => {
                assert_eq!(peer, PEER);
                (tid, direction)
            });
        sessions.on_timeout(id, tid, direction, &mut env.env());
    }

    #[test]
    fn request_session_sends_addba() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(3, 4090, &mut env.env()).expect("request");

        let session = sessions.session(Direction::Originator, 3).expect("valid TID");
        assert_eq!(session.state(), SessionState::Requested);
        assert_eq!(session.window(), (4090, 57));
        assert!(session.timer().is_some());
        assert_eq!(
            env.device.frames,
            vec![(
                PEER,
                MgmtFrame::Action(ActionFrame::AddbaRequest {
                    tid: 3,
                    dialog_token: 1,
                    buffer_size: 64,
                    ssn: 4090,
                })
            )]
        );
        assert_eq!(env.scheduler.scheduled()[0].1, Duration::from_secs(1));
    }

    #[test]
    fn request_session_only_from_idle() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(0, 0, &mut env.env()).expect("request");
        assert_variant!(sessions.request_session(0, 0, &mut env.env()), Err(Error::InvalidState(_)));
        assert_variant!(sessions.request_session(16, 0, &mut env.env()), Err(Error::InvalidTid(16)));
    }

    #[test]
    fn response_timeout_reverts_to_idle_without_delba() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(3, 100, &mut env.env()).expect("request");
        let timer = sessions.session(Direction::Originator, 3).unwrap().timer().unwrap();

        fire(&mut sessions, &mut env, timer);

        let session = sessions.session(Direction::Originator, 3).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.timer().is_none());
        assert_eq!(env.device.delba_count(), 0);
        assert_eq!(env.stats.ba_response_timeouts, 1);
        assert!(env.timer.is_empty());
    }

    #[test]
    fn addba_response_swaps_timers() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(5, 0, &mut env.env()).expect("request");
        let response_timer = sessions.session(Direction::Originator, 5).unwrap().timer().unwrap();

        sessions.on_addba_response(5, 1, StatusCode::SUCCESS, 32, &mut env.env());

        let session = sessions.session(Direction::Originator, 5).unwrap();
        assert_eq!(session.state(), SessionState::Agreed);
        assert_eq!(session.window(), (0, 31));
        let inactivity_timer = session.timer().unwrap();
        assert_ne!(inactivity_timer, response_timer);
        assert_eq!(env.scheduler.canceled(), vec![response_timer]);
        assert_eq!(env.timer.len(), 1);
    }

    #[test]
    fn addba_response_with_wrong_token_dropped() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(5, 0, &mut env.env()).expect("request");
        sessions.on_addba_response(5, 9, StatusCode::SUCCESS, 64, &mut env.env());
        assert_eq!(
            sessions.session(Direction::Originator, 5).unwrap().state(),
            SessionState::Requested
        );
        assert_eq!(env.stats.rx_mgmt_discard, 1);
    }

    #[test]
    fn addba_refusal_returns_to_idle() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(5, 0, &mut env.env()).expect("request");
        sessions.on_addba_response(5, 1, StatusCode::REQUEST_DECLINED, 0, &mut env.env());
        let session = sessions.session(Direction::Originator, 5).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(env.timer.is_empty());
        assert_eq!(env.stats.ba_sessions_refused, 1);
    }

    #[test]
    fn inactivity_timeout_sends_delba() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(2, 0, &mut env.env()).expect("request");
        sessions.on_addba_response(2, 1, StatusCode::SUCCESS, 64, &mut env.env());
        let timer = sessions.session(Direction::Originator, 2).unwrap().timer().unwrap();
        env.device.clear();

        fire(&mut sessions, &mut env, timer);

        assert_eq!(
            env.device.action_frames(),
            vec![(PEER, ActionFrame::Delba { tid: 2, initiator: true, reason: ReasonCode::TIMEOUT })]
        );
        assert_eq!(sessions.session(Direction::Originator, 2).unwrap().state(), SessionState::Idle);
        assert!(env.timer.is_empty());
    }

    #[test]
    fn recipient_accepts_and_clamps_window() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.on_addba_request(0, 9, 256, 10, &mut env.env());

        let session = sessions.session(Direction::Recipient, 0).unwrap();
        assert_eq!(session.state(), SessionState::Agreed);
        assert_eq!(session.window_size(), 64);
        assert_eq!(session.window(), (10, 73));
        assert!(session.timer().is_some());
        assert_eq!(
            env.device.action_frames(),
            vec![(
                PEER,
                ActionFrame::AddbaResponse {
                    tid: 0,
                    dialog_token: 9,
                    status: StatusCode::SUCCESS,
                    buffer_size: 64,
                }
            )]
        );
    }

    #[test]
    fn repeated_addba_request_keeps_one_timer() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.on_addba_request(0, 1, 64, 0, &mut env.env());
        sessions.on_addba_request(0, 2, 64, 0, &mut env.env());
        assert_eq!(env.timer.len(), 1);
        assert_eq!(sessions.session(Direction::Recipient, 0).unwrap().dialog_token(), 2);
    }

    #[test]
    fn invalid_tid_addba_request_refused() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.on_addba_request(16, 1, 64, 0, &mut env.env());
        assert_eq!(
            env.device.action_frames(),
            vec![(
                PEER,
                ActionFrame::AddbaResponse {
                    tid: 16,
                    dialog_token: 1,
                    status: StatusCode::INVALID_PARAMETERS,
                    buffer_size: 0,
                }
            )]
        );
        assert!(env.timer.is_empty());
    }

    #[test]
    fn delete_recipient_session_releases_buffers() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.on_addba_request(1, 1, 8, 4094, &mut env.env());
        sessions.buffer_frame(1, 4095, vec![1], &mut env.env()).expect("in window");
        sessions.buffer_frame(1, 2, vec![2], &mut env.env()).expect("in window after wrap");
        assert_variant!(
            sessions.buffer_frame(1, 10, vec![3], &mut env.env()),
            Err(Error::InvalidState(_))
        );
        assert_eq!(sessions.session(Direction::Recipient, 1).unwrap().buffered_frames(), 2);

        sessions
            .delete_session(1, Direction::Recipient, ReasonCode::END_TS_BA_DLS, &mut env.env())
            .expect("delete");
        assert_eq!(env.stats.ba_frames_released, 2);
        assert_eq!(env.device.delba_count(), 1);
        let session = sessions.session(Direction::Recipient, 1).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.buffered_frames(), 0);
        assert!(env.timer.is_empty());
    }

    #[test]
    fn delete_idle_session_fails() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        assert_variant!(
            sessions.delete_session(0, Direction::Originator, ReasonCode::STA_LEAVING, &mut env.env()),
            Err(Error::InvalidState(_))
        );
        assert!(env.device.frames.is_empty());
    }

    #[test]
    fn directions_are_independent() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(4, 0, &mut env.env()).expect("request");
        sessions.on_addba_request(4, 1, 64, 0, &mut env.env());
        sessions.on_delba(4, true, &mut env.env());
        assert_eq!(sessions.session(Direction::Recipient, 4).unwrap().state(), SessionState::Idle);
        assert_eq!(
            sessions.session(Direction::Originator, 4).unwrap().state(),
            SessionState::Requested
        );
        assert_eq!(env.timer.len(), 1);
    }

    #[test]
    fn release_all_is_silent() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.request_session(3, 0, &mut env.env()).expect("request");
        sessions.on_addba_request(0, 1, 64, 0, &mut env.env());
        sessions.buffer_frame(0, 1, vec![0], &mut env.env()).expect("in window");
        env.device.clear();

        sessions.release_all(&mut env.env());

        assert_eq!(sessions.active(), 0);
        assert!(env.device.frames.is_empty());
        assert!(env.timer.is_empty());
        assert_eq!(env.stats.ba_frames_released, 1);
    }

    #[test]
    fn stale_timer_ignored() {
        let mut env = TestEnv::new();
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.on_addba_request(0, 1, 64, 0, &mut env.env());
        sessions.on_timeout(EventId(999), 0, Direction::Recipient, &mut env.env());
        assert_eq!(sessions.session(Direction::Recipient, 0).unwrap().state(), SessionState::Agreed);
    }

    #[test]
    fn dialog_tokens_skip_zero() {
        let mut sessions = BlockAckSessions::new(PEER);
        sessions.next_dialog_token = 255;
        assert_eq!(sessions.take_dialog_token(), 255);
        assert_eq!(sessions.take_dialog_token(), 1);
    }
}
