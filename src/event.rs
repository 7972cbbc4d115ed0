//! Bounded multi-producer, single-consumer event queue through which the
//! engine notifies the embedder of state transitions (§4.b).
//!
//! Grounded on `original_source/lib/LibDS/include/DS_Events.h` and
//! `lib/LibDS-Legacy/src/queue.c`'s bounded array + drop-oldest behavior.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::{ControlMode, Station};

/// Default queue depth. Generous enough that a momentary embedder stall
/// (one UI frame) doesn't lose events, small enough to bound memory use.
pub const DEFAULT_CAPACITY: usize = 256;

/// A tagged state-transition record.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FmsCommsChanged(bool),
    RadioCommsChanged(bool),
    RobotCommsChanged(bool),
    RobotCodeChanged(bool),
    RobotModeChanged(ControlMode),
    RobotEnabledChanged(bool),
    RobotVoltageChanged(f32),
    RobotCpuChanged(u8),
    RobotRamChanged(u8),
    RobotDiskChanged(u8),
    RobotCanChanged(u8),
    RobotStationChanged(Station),
    RobotEstopChanged(bool),
    JoystickCountChanged(usize),
    NetConsoleNewMessage(String),
    StatusStringChanged(String),
}

/// Bounded FIFO of [`Event`]s. `push` never blocks and never fails: if the
/// queue is full the oldest event is discarded, and the embedder simply
/// observes a gap the next time it polls.
pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> EventQueue {
        EventQueue {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Pushes an event, discarding the oldest queued event if at capacity.
    pub fn push(&self, event: Event) {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
    }

    /// Pops the oldest queued event, if any.
    pub fn poll(&self) -> Option<Event> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_then_poll_is_fifo() {
        let q = EventQueue::new(4);
        q.push(Event::RobotEnabledChanged(true));
        q.push(Event::RobotEnabledChanged(false));
        assert_eq!(q.poll(), Some(Event::RobotEnabledChanged(true)));
        assert_eq!(q.poll(), Some(Event::RobotEnabledChanged(false)));
        assert_eq!(q.poll(), None);
    }

    #[test]
    fn overflow_drops_oldest_and_bounds_growth() {
        let q = EventQueue::new(2);
        q.push(Event::RobotCpuChanged(1));
        q.push(Event::RobotCpuChanged(2));
        q.push(Event::RobotCpuChanged(3));
        assert_eq!(q.len(), 2);
        assert_eq!(q.poll(), Some(Event::RobotCpuChanged(2)));
        assert_eq!(q.poll(), Some(Event::RobotCpuChanged(3)));
    }
}
