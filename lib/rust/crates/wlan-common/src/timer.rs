// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::{collections::HashMap, time::Duration};

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// A scheduler to schedule and cancel timeouts. Expired timeouts are reported back to the
/// owner of the `Timer` by the scheduler's host, which then calls `Timer::triggered`.
pub trait Scheduler {
    /// Requests to schedule an event. Returns a unique ID used to cancel the scheduled event.
    fn schedule(&mut self, after: Duration) -> EventId;
    /// Cancels a previously scheduled event.
    fn cancel(&mut self, id: EventId);
}

/// A timer to schedule and cancel timeouts and retrieve triggered events.
pub struct Timer<E> {
    events: HashMap<EventId, E>,
    scheduler: Box<dyn Scheduler>,
}

impl<E> Timer<E> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self { events: HashMap::default(), scheduler }
    }

    /// Returns the event a fired timeout belongs to. Events trigger no more than once and
    /// never after they were canceled.
    pub fn triggered(&mut self, event_id: &EventId) -> Option<E> {
        self.events.remove(event_id)
    }

    pub fn schedule_after(&mut self, after: Duration, event: E) -> EventId {
        let event_id = self.scheduler.schedule(after);
        self.events.insert(event_id, event);
        event_id
    }

    pub fn cancel_event(&mut self, event_id: EventId) {
        if self.events.remove(&event_id).is_some() {
            self.scheduler.cancel(event_id);
        }
    }

    pub fn cancel_all(&mut self) {
        for event_id in self.events.keys() {
            self.scheduler.cancel(*event_id);
        }
        self.events.clear();
    }

    pub fn is_scheduled(&self, event_id: &EventId) -> bool {
        self.events.contains_key(event_id)
    }

    pub fn scheduled_events(&self) -> impl Iterator<Item = (&EventId, &E)> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(any(test, feature = "testing"))]
pub use fake::FakeScheduler;

#[cfg(any(test, feature = "testing"))]
mod fake {
    use {
        super::{EventId, Scheduler},
        std::{cell::RefCell, rc::Rc, time::Duration},
    };

    #[derive(Default, Debug)]
    struct State {
        next_id: u64,
        scheduled: Vec<(EventId, Duration)>,
        canceled: Vec<EventId>,
    }

    /// Records every request. Clones share the same record so a test can keep a handle
    /// after moving the scheduler into a `Timer`.
    #[derive(Default, Clone, Debug)]
    pub struct FakeScheduler {
        state: Rc<RefCell<State>>,
    }

    impl FakeScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn scheduled(&self) -> Vec<(EventId, Duration)> {
            self.state.borrow().scheduled.clone()
        }

        pub fn canceled(&self) -> Vec<EventId> {
            self.state.borrow().canceled.clone()
        }

        /// Timeouts which were scheduled and not yet canceled.
        pub fn pending(&self) -> Vec<(EventId, Duration)> {
            let state = self.state.borrow();
            state
                .scheduled
                .iter()
                .filter(|(id, _)| !state.canceled.contains(id))
                .cloned()
                .collect()
        }
    }

    impl Scheduler for FakeScheduler {
        fn schedule(&mut self, after: Duration) -> EventId {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            let id = EventId(state.next_id);
            state.scheduled.push((id, after));
            id
        }

        fn cancel(&mut self, id: EventId) {
            self.state.borrow_mut().canceled.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_cancel_event() {
        #[derive(PartialEq, Eq, Debug, Hash)]
        struct FooEvent(u8);

        let scheduler = FakeScheduler::new();
        let mut timer = Timer::<FooEvent>::new(Box::new(scheduler.clone()));
        let after = Duration::from_millis(5);

        // Verify event triggers no more than once.
        let event_id = timer.schedule_after(after, FooEvent(8));
        assert_eq!(timer.triggered(&event_id), Some(FooEvent(8)));
        assert_eq!(timer.triggered(&event_id), None);

        // Verify event does not trigger if it was canceled.
        let event_id = timer.schedule_after(after, FooEvent(9));
        timer.cancel_event(event_id);
        assert_eq!(timer.triggered(&event_id), None);
        assert_eq!(scheduler.canceled(), vec![event_id]);

        // Verify multiple events can be scheduled and canceled.
        let event_id_1 = timer.schedule_after(after, FooEvent(8));
        let event_id_2 = timer.schedule_after(after, FooEvent(9));
        let event_id_3 = timer.schedule_after(after, FooEvent(10));
        timer.cancel_event(event_id_2);
        assert_eq!(timer.triggered(&event_id_2), None);
        assert_eq!(timer.triggered(&event_id_3), Some(FooEvent(10)));
        assert_eq!(timer.triggered(&event_id_1), Some(FooEvent(8)));
        assert!(timer.is_empty());
    }

    #[test]
    fn cancel_all() {
        let scheduler = FakeScheduler::new();
        let mut timer = Timer::<_>::new(Box::new(scheduler.clone()));
        let after = Duration::from_millis(5);

        let event_id_1 = timer.schedule_after(after, 8);
        let event_id_2 = timer.schedule_after(after, 9);
        let event_id_3 = timer.schedule_after(after, 10);
        assert_eq!(timer.len(), 3);
        timer.cancel_all();
        assert_eq!(timer.triggered(&event_id_1), None);
        assert_eq!(timer.triggered(&event_id_2), None);
        assert_eq!(timer.triggered(&event_id_3), None);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn cancel_fired_event_is_noop() {
        let scheduler = FakeScheduler::new();
        let mut timer = Timer::<_>::new(Box::new(scheduler.clone()));
        let event_id = timer.schedule_after(Duration::from_secs(1), ());
        assert!(timer.is_scheduled(&event_id));
        assert_eq!(timer.triggered(&event_id), Some(()));
        timer.cancel_event(event_id);
        assert!(scheduler.canceled().is_empty());
    }
}
