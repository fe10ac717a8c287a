//! Events exchanged by simulation components.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::Serialize;

use crate::component::Id;

/// Sequential event number, also the tie-breaker between events scheduled at the same time.
pub type EventId = u64;

/// Payload of an event.
///
/// Any `Serialize + 'static` type is a payload. Serialization is only used to trace events in logs,
/// handlers get the typed value back with [`cast!`](crate::cast!).
pub trait EventData: Downcast + erased_serde::Serialize {}

impl<T: Serialize + 'static> EventData for T {}

impl_downcast!(EventData);
erased_serde::serialize_trait_object!(EventData);

pub struct Event {
    pub id: EventId,
    /// Simulation time at which the event is delivered.
    pub time: f64,
    pub src: Id,
    pub dst: Id,
    pub data: Box<dyn EventData>,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap, so the earliest (time, id) must compare as the greatest.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then(other.id.cmp(&self.id))
    }
}
