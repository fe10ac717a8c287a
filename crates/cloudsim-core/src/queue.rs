//! Queue of pending events and the simulation clock.

use std::collections::{BinaryHeap, HashSet};

use crate::component::Id;
use crate::event::{Event, EventData, EventId};
use crate::log::log_incorrect_event;

/// Tolerance used when comparing simulation times and capacities.
pub const EPSILON: f64 = 1e-12;

/// Min-heap of events by `(time, id)` plus the set of ids which are still deliverable.
///
/// Cancelling removes the id from the set, the event itself stays in the heap and is dropped when it
/// reaches the top. The set never holds ids of delivered or cancelled events.
pub(crate) struct EventQueue {
    clock: f64,
    heap: BinaryHeap<Event>,
    pending: HashSet<EventId>,
    next_id: EventId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            clock: 0.,
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Total number of events ever pushed, including cancelled ones.
    pub fn created(&self) -> u64 {
        self.next_id
    }

    /// Schedules the event at `now + delay`.
    ///
    /// Panics on negative delay: events from the past would move the clock backwards.
    pub fn push(&mut self, data: Box<dyn EventData>, src: Id, dst: Id, delay: f64) -> EventId {
        let event = Event {
            id: self.next_id,
            time: self.clock + delay.max(0.),
            src,
            dst,
            data,
        };
        if delay < -EPSILON || delay.is_nan() {
            log_incorrect_event(event, &format!("negative delay {}", delay));
            panic!("event delay must be non-negative, got {}", delay);
        }
        self.next_id += 1;
        self.pending.insert(event.id);
        let id = event.id;
        self.heap.push(event);
        id
    }

    /// Takes the earliest deliverable event and moves the clock to its time.
    pub fn pop(&mut self) -> Option<Event> {
        while let Some(event) = self.heap.pop() {
            if self.pending.remove(&event.id) {
                self.clock = self.clock.max(event.time);
                return Some(event);
            }
        }
        None
    }

    /// Time of the earliest deliverable event.
    pub fn next_time(&mut self) -> Option<f64> {
        while let Some(event) = self.heap.peek() {
            if self.pending.contains(&event.id) {
                return Some(event.time);
            }
            self.heap.pop();
        }
        None
    }

    /// Returns `false` if the event was already delivered or cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Payload {}

    fn push(queue: &mut EventQueue, delay: f64) -> EventId {
        queue.push(Box::new(Payload {}), 0, 1, delay)
    }

    #[test]
    fn test_cancel_keeps_only_pending_ids() {
        let mut queue = EventQueue::new();
        let first = push(&mut queue, 1.);
        let second = push(&mut queue, 2.);
        assert_eq!(queue.pop().map(|e| e.id), Some(first));
        assert!(!queue.cancel(first));
        assert!(queue.cancel(second));
        assert!(!queue.cancel(second));
        assert!(queue.pending.is_empty());
        assert_eq!(queue.next_time(), None);
        assert!(queue.heap.is_empty());
        assert_eq!(queue.created(), 2);
    }

    #[test]
    fn test_clock_follows_popped_events() {
        let mut queue = EventQueue::new();
        push(&mut queue, 2.5);
        push(&mut queue, 0.5);
        assert_eq!(queue.next_time(), Some(0.5));
        queue.pop();
        assert_eq!(queue.time(), 0.5);
        // delay is counted from the current time
        push(&mut queue, 1.);
        assert_eq!(queue.pop().map(|e| e.time), Some(1.5));
        assert_eq!(queue.pop().map(|e| e.time), Some(2.5));
        assert_eq!(queue.time(), 2.5);
    }
}
