//! Scheduling policies
//!
//! Each policy lives in its own file and is exported here.
mod cfs;
pub use cfs::Cfs;
