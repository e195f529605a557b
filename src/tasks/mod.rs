//! Background Tasks Module
//!
//! Host-side tasks that drive a cache on a schedule. The cache itself owns no
//! timers.

mod purge;

pub use purge::spawn_purge_task;
