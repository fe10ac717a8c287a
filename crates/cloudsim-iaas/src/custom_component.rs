//! Interface of user-defined components added to cloud simulation.

use cloudsim_core::context::SimulationContext;
use cloudsim_core::handler::EventHandler;

/// Component which can be built by [`CloudSimulation`](crate::simulation::CloudSimulation),
/// e.g. a user workload driving brokers during the run.
pub trait CustomComponent: EventHandler {
    fn new(ctx: SimulationContext) -> Self
    where
        Self: Sized;

    /// Initializes component and emits its first events.
    fn init(&mut self);
}
