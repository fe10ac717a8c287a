//! Event handling.

use crate::event::Event;

/// Component receiving events from the simulation.
pub trait EventHandler {
    /// Processes the event. Events emitted here are queued before the next event is delivered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use cloudsim_core::{cast, Event, EventHandler, Simulation, SimulationContext};
    ///
    /// #[derive(Serialize)]
    /// pub struct Deposit {
    ///     amount: u32,
    /// }
    ///
    /// pub struct Account {
    ///     balance: u32,
    ///     ctx: SimulationContext,
    /// }
    ///
    /// impl EventHandler for Account {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             Deposit { amount } => {
    ///                 self.balance += amount;
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new();
    /// let mut client = sim.create_context("client");
    /// let account = Rc::new(RefCell::new(Account { balance: 0, ctx: sim.create_context("account") }));
    /// let account_id = sim.add_handler("account", account.clone());
    /// client.emit(Deposit { amount: 16 }, account_id, 1.2);
    /// assert_eq!(account.borrow().balance, 0);
    /// sim.step();
    /// assert_eq!(account.borrow().balance, 16);
    /// ```
    fn on(&mut self, event: Event);
}

/// Matches the event payload against payload types and runs the arm of the first one that fits.
///
/// The event is consumed, so read `event.src` or `event.time` before the macro if an arm needs them.
/// A payload matching no arm is logged as unhandled at the error level.
///
/// ```rust
/// use serde::Serialize;
/// use cloudsim_core::{cast, Event, EventHandler};
///
/// #[derive(Serialize)]
/// pub struct Ping {}
///
/// #[derive(Serialize)]
/// pub struct Resize {
///     size: f64,
/// }
///
/// pub struct Component {
///     pings: u32,
///     size: f64,
/// }
///
/// impl EventHandler for Component {
///     fn on(&mut self, event: Event) {
///         cast!(match event.data {
///             Ping {} => {
///                 self.pings += 1;
///             }
///             Resize { size } => {
///                 self.size = size;
///             }
///         })
///     }
/// }
/// ```
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        'cast: {
            let $crate::event::Event { id: __id, time: __time, src: __src, dst: __dst, data: __data } = $event;
            $(
                let __data = match __data.downcast::<$type>() {
                    Ok(__value) => {
                        let $type { $($tt)* } = *__value;
                        { $($expr)* }
                        break 'cast;
                    }
                    Err(__other) => __other,
                };
            )+
            $crate::log::log_unhandled_event($crate::event::Event {
                id: __id,
                time: __time,
                src: __src,
                dst: __dst,
                data: __data,
            });
        }
    };
}
