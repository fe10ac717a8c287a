//! Implementations of cloudlet schedulers.

pub mod space_shared;
pub mod time_shared;
