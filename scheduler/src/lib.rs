//! A fair scheduler library.
//!
//! This library provides the process types, the [`Scheduler`] trait and a
//! simplified [cfs](https://opensource.com/article/19/2/fair-scheduling-linux)
//! policy backed by a red-black tree.
//!

mod error;
pub mod rbtree;
mod scheduler;

pub use crate::error::ConfigError;
pub use crate::scheduler::{
    CfsConfig, Pid, Process, ProcessColor, ProcessRecord, ProcessState, Scheduler, Time,
};

mod schedulers;

pub use schedulers::Cfs;

/// Returns a structure that implements the `Scheduler` trait with a simplified cfs policy
/// * `target_latency` - the time window within which every resident process should get
///                      at least one turn; each of `N` contending processes gets
///                      `target_latency / N` time units.
/// * `minimum_granularity` - the smallest quantum a process is ever granted, no matter
///                           how many processes contend for the processor.
///
/// Fails if either value is not positive or `minimum_granularity > target_latency`.
pub fn cfs(target_latency: i64, minimum_granularity: i64) -> Result<Cfs, ConfigError> {
    Ok(Cfs::new(CfsConfig::new(target_latency, minimum_granularity)?))
}
