//! Logging in simulation time.
//!
//! Records are prefixed with `[time LEVEL component]`, so the log of a run reads as a timeline.
//! The macros expand to the [`log`](https://docs.rs/log) crate, the calling crate must depend on it.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::{error, Level};
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

/// Colors the label when stderr is a terminal.
pub fn paint(label: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        label.color(color)
    } else {
        label.normal()
    }
}

/// Fixed-width label of the level.
pub fn level_label(level: Level) -> ColoredString {
    match level {
        Level::Error => paint("ERROR", Color::Red),
        Level::Warn => paint("WARN ", Color::Yellow),
        Level::Info => paint("INFO ", Color::Green),
        Level::Debug => paint("DEBUG", Color::Blue),
        Level::Trace => paint("TRACE", Color::Cyan),
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $ctx:expr, $format:literal $($arg:tt)*) => {
        log::log!(
            target: $ctx.name(),
            $level,
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(),
            $crate::log::level_label($level),
            $ctx.name()
            $($arg)*
        )
    };
}

/// Logs a message of the component at the info level.
///
/// ```rust
/// use cloudsim_core::{log_info, Simulation, SimulationContext};
///
/// struct Host {
///     ctx: SimulationContext,
/// }
///
/// impl Host {
///     fn boot(&self) {
///         log_info!(self.ctx, "booted with {} PEs", 4);
///     }
/// }
///
/// let mut sim = Simulation::new();
/// Host { ctx: sim.create_context("host") }.boot();
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(log::Level::Info, $ctx, $($arg)+));
}

#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(log::Level::Debug, $ctx, $($arg)+));
}

#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(log::Level::Trace, $ctx, $($arg)+));
}

#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(log::Level::Warn, $ctx, $($arg)+));
}

#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_at!(log::Level::Error, $ctx, $($arg)+));
}

fn report(event: Event, problem: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        level_label(Level::Error),
        problem,
        json!({
            "type": type_name(&event.data).unwrap_or("unknown"),
            "data": event.data,
            "src": event.src,
            "dst": event.dst
        })
    );
}

/// Called by [`cast!`](crate::cast!) for payloads matching no arm.
pub fn log_unhandled_event(event: Event) {
    report(event, "Unhandled event");
}

pub(crate) fn log_undelivered_event(event: Event) {
    report(event, "Undelivered event");
}

pub(crate) fn log_incorrect_event(event: Event, msg: &str) {
    report(event, &format!("Incorrect event ({})", msg));
}
