use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use cloudsim_core::{cast, Event, EventHandler, Id, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Ping {
    tag: u32,
}

#[derive(Clone, Serialize)]
struct Unknown {}

/// Records every received ping as (time, tag, src).
struct Recorder {
    received: Vec<(f64, u32, Id)>,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        let src = event.src;
        let time = event.time;
        cast!(match event.data {
            Ping { tag } => {
                self.received.push((time, tag, src));
            }
        })
    }
}

/// Bounces every ping back to its sender after a fixed delay until the tag reaches the limit.
struct Bouncer {
    delay: f64,
    limit: u32,
    ctx: SimulationContext,
}

impl EventHandler for Bouncer {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            Ping { tag } => {
                if tag < self.limit {
                    self.ctx.emit(Ping { tag: tag + 1 }, src, self.delay);
                }
            }
        })
    }
}

fn recorder(sim: &mut Simulation, name: &str) -> (Rc<RefCell<Recorder>>, Id) {
    let rec = Rc::new(RefCell::new(Recorder { received: Vec::new() }));
    let id = sim.add_handler(name, rec.clone());
    (rec, id)
}

fn tags(rec: &Rc<RefCell<Recorder>>) -> Vec<u32> {
    rec.borrow().received.iter().map(|r| r.1).collect()
}

#[test]
fn test_events_are_delivered_in_time_order() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");

    ctx.emit(Ping { tag: 3 }, rec_id, 3.0);
    ctx.emit(Ping { tag: 1 }, rec_id, 1.0);
    ctx.emit(Ping { tag: 2 }, rec_id, 2.0);
    while sim.step() {}

    assert_eq!(tags(&rec), vec![1, 2, 3]);
    assert_eq!(sim.time(), 3.0);
}

#[test]
fn test_equal_time_events_are_fifo() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");

    for tag in 0..10 {
        ctx.emit(Ping { tag }, rec_id, 5.0);
    }
    ctx.emit_now(Ping { tag: 100 }, rec_id);
    while sim.step() {}

    assert_eq!(tags(&rec), vec![100, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_ping_pong_keeps_clock_monotonic() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut left_ctx = sim.create_context("left");
    let right_ctx = sim.create_context("right");
    let right_id = sim.add_handler(
        "right",
        Rc::new(RefCell::new(Bouncer {
            delay: 0.5,
            limit: 6,
            ctx: right_ctx,
        })),
    );
    let left_handler_ctx = sim.create_context("left");
    let left_id = sim.add_handler(
        "left",
        Rc::new(RefCell::new(Bouncer {
            delay: 0.25,
            limit: 6,
            ctx: left_handler_ctx,
        })),
    );
    left_ctx.emit(Ping { tag: 0 }, right_id, 0.);
    left_ctx.emit(Ping { tag: 9 }, rec_id, 1.1);

    let mut last_time = sim.time();
    while sim.step() {
        assert!(sim.time() >= last_time);
        last_time = sim.time();
    }
    assert_eq!(left_ctx.id(), left_id);
    // tags 0..=6 travel right, left, right... with delays 0.5 and 0.25
    assert_eq!(sim.time(), 0.5 * 3. + 0.25 * 3.);
    assert_eq!(sim.event_count(), 8);
    assert_eq!(rec.borrow().received, vec![(1.1, 9, left_id)]);
}

#[test]
fn test_cancelled_event_is_skipped() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");

    ctx.emit(Ping { tag: 1 }, rec_id, 1.0);
    let cancelled = ctx.emit(Ping { tag: 2 }, rec_id, 2.0);
    ctx.emit(Ping { tag: 3 }, rec_id, 3.0);
    assert!(ctx.cancel_event(cancelled));
    assert!(!ctx.cancel_event(cancelled));

    while sim.step() {}
    assert_eq!(tags(&rec), vec![1, 3]);
    // cancelled events are counted but never delivered
    assert_eq!(sim.event_count(), 3);
}

#[test]
fn test_delivered_event_cannot_be_cancelled() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");

    let first = ctx.emit(Ping { tag: 1 }, rec_id, 1.0);
    let second = ctx.emit(Ping { tag: 2 }, rec_id, 2.0);
    assert!(sim.step());
    assert!(!ctx.cancel_event(first));
    assert!(ctx.cancel_event(second));
    assert!(!sim.step());
    assert_eq!(tags(&rec), vec![1]);
    assert_eq!(sim.time(), 1.0);
}

#[test]
fn test_step_for_duration_stops_before_later_events() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");
    ctx.emit(Ping { tag: 1 }, rec_id, 1.0);
    ctx.emit(Ping { tag: 2 }, rec_id, 10.0);
    let cancelled = ctx.emit(Ping { tag: 3 }, rec_id, 20.0);
    ctx.cancel_event(cancelled);

    assert!(sim.step_for_duration(5.0));
    assert_eq!(tags(&rec), vec![1]);
    // the clock stays at the last delivered event
    assert_eq!(sim.time(), 1.0);
    assert!(!sim.step_for_duration(10.0));
    assert_eq!(tags(&rec), vec![1, 2]);
    assert!(!sim.step());
}

#[test]
fn test_steps_reports_exhausted_queue() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");
    for tag in 0..3 {
        ctx.emit(Ping { tag }, rec_id, 1.0);
    }
    assert!(sim.steps(2));
    assert!(!sim.steps(2));
    assert_eq!(tags(&rec), vec![0, 1, 2]);
}

#[test]
fn test_undelivered_and_unhandled_events_are_dropped() {
    let mut sim = Simulation::new();
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");
    let nobody = sim.create_context("nobody").id();

    ctx.emit_now(Ping { tag: 1 }, nobody);
    ctx.emit_now(Unknown {}, rec_id);
    ctx.emit_self(Ping { tag: 2 }, 1.0);
    assert!(sim.steps(3));
    assert!(!sim.step());
    assert!(rec.borrow().received.is_empty());
}

#[test]
fn test_context_ids_are_reused_by_name() {
    let mut sim = Simulation::new();
    let a = sim.create_context("a");
    let b = sim.create_context("b");
    assert_eq!(a.id(), 0);
    assert_eq!(b.id(), 1);
    assert_eq!(b.name(), "b");
    let (_, id) = recorder(&mut sim, "a");
    assert_eq!(id, 0);
    assert_eq!(sim.create_context("b").id(), 1);
    assert_eq!(sim.create_context("c").id(), 2);
}

#[test]
#[should_panic]
fn test_negative_delay_panics() {
    let mut sim = Simulation::new();
    let (_, rec_id) = recorder(&mut sim, "rec");
    let mut ctx = sim.create_context("client");
    ctx.emit(Ping { tag: 1 }, rec_id, -1.0);
}
