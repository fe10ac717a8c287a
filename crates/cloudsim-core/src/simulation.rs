//! Simulation driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, log_enabled, trace, Level};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::log::{level_label, log_undelivered_event, paint};
use crate::queue::EventQueue;

/// Registry of named components and the loop delivering their events.
///
/// Time is purely logical: the clock jumps to the time of each delivered event and never goes back.
/// Events with the same time are delivered in the order they were emitted, so runs are reproducible.
pub struct Simulation {
    queue: Rc<RefCell<EventQueue>>,
    ids: HashMap<String, Id>,
    names: Vec<String>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(EventQueue::new())),
            ids: HashMap::new(),
            names: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Returns the id of the named component, registering it on first use.
    fn register(&mut self, name: &str) -> Id {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len() as Id;
        self.ids.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        self.handlers.push(None);
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] registered component {}",
            self.time(),
            level_label(Level::Debug),
            json!({"name": name, "id": id})
        );
        id
    }

    /// Creates the context of a component. Ids are assigned sequentially from 0.
    pub fn create_context(&mut self, name: &str) -> SimulationContext {
        let id = self.register(name);
        SimulationContext::new(id, name, self.queue.clone())
    }

    /// Sets the handler receiving events of the named component and returns its id.
    ///
    /// A context created earlier under the same name refers to the same component.
    pub fn add_handler(&mut self, name: &str, handler: Rc<RefCell<dyn EventHandler>>) -> Id {
        let id = self.register(name);
        self.handlers[id as usize] = Some(handler);
        id
    }

    pub fn time(&self) -> f64 {
        self.queue.borrow().time()
    }

    /// Number of events emitted so far, cancelled ones included.
    pub fn event_count(&self) -> u64 {
        self.queue.borrow().created()
    }

    /// Delivers the next event. Returns `false` if there are no pending events.
    ///
    /// An event addressed to a component without handler is logged and dropped.
    pub fn step(&mut self) -> bool {
        let next = self.queue.borrow_mut().pop();
        let event = match next {
            Some(event) => event,
            None => return false,
        };
        if log_enabled!(Level::Trace) {
            self.trace_event(&event);
        }
        let handler = self.handlers.get(event.dst as usize).cloned().flatten();
        match handler {
            Some(handler) => handler.borrow_mut().on(event),
            None => log_undelivered_event(event),
        }
        true
    }

    /// Delivers up to `count` events, returns `false` if the queue ran out.
    pub fn steps(&mut self, count: u64) -> bool {
        (0..count).all(|_| self.step())
    }

    /// Delivers events with time up to `now + duration`.
    ///
    /// Returns `true` if some events remain after that time.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let until = self.time() + duration;
        loop {
            let next_time = self.queue.borrow_mut().next_time();
            match next_time {
                Some(time) if time <= until => {
                    self.step();
                }
                Some(_) => return true,
                None => return false,
            }
        }
    }

    fn trace_event(&self, event: &Event) {
        let name = |id: Id| self.names.get(id as usize).map(String::as_str).unwrap_or("?");
        trace!(
            target: name(event.dst),
            "[{:.3} {} {}] {}",
            event.time,
            paint("EVENT", colored::Color::BrightBlack),
            name(event.dst),
            json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": name(event.src)})
        );
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
