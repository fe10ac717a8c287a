//! Per-component handle to the simulation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::Id;
use crate::event::{EventData, EventId};
use crate::queue::EventQueue;

/// Handle through which a component reads the clock and schedules events.
///
/// Every component owns its context, created by [`Simulation::create_context`](crate::Simulation::create_context).
/// Events emitted through it carry the component id as the source.
pub struct SimulationContext {
    id: Id,
    name: String,
    queue: Rc<RefCell<EventQueue>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, queue: Rc<RefCell<EventQueue>>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            queue,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.queue.borrow().time()
    }

    /// Sends `data` to component `dst`, delivered after `delay`.
    ///
    /// Panics if `delay` is negative.
    pub fn emit<T: EventData>(&mut self, data: T, dst: Id, delay: f64) -> EventId {
        self.queue.borrow_mut().push(Box::new(data), self.id, dst, delay)
    }

    pub fn emit_now<T: EventData>(&mut self, data: T, dst: Id) -> EventId {
        self.emit(data, dst, 0.)
    }

    /// Sends `data` to the component itself, e.g. to wake up later.
    pub fn emit_self<T: EventData>(&mut self, data: T, delay: f64) -> EventId {
        self.emit(data, self.id, delay)
    }

    /// Withdraws a pending event, returns `false` if it was already delivered or cancelled.
    pub fn cancel_event(&mut self, id: EventId) -> bool {
        self.queue.borrow_mut().cancel(id)
    }
}
