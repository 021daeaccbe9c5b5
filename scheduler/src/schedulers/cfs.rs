use log::{debug, trace};

use crate::rbtree::RbTree;
use crate::{CfsConfig, Pid, Process, ProcessState, Scheduler, Time};

/// A simplified completely fair scheduler.
///
/// Resident processes are kept in a red-black tree keyed by vruntime and the
/// leftmost one always runs next. Processes with equal vruntime run in the
/// order they were admitted.
pub struct Cfs {
    tree: RbTree<Time, Pid>,
    config: CfsConfig,
}

impl Cfs {
    pub fn new(config: CfsConfig) -> Self {
        Cfs {
            tree: RbTree::new(),
            config,
        }
    }
}

impl Scheduler for Cfs {
    fn admit(&mut self, process: &mut Process) {
        self.tree.insert(process.vruntime(), process.pid());
        process.set_state(ProcessState::Resident);
        debug!(
            "admit {} (pid {}) with vruntime {}",
            process.name(),
            process.pid(),
            process.vruntime()
        );
        trace!("tree {}", self.tree);
    }

    fn select_next(&mut self, processes: &mut [Process]) -> Option<Pid> {
        let (vruntime, pid) = self.tree.extract_minimum()?;
        let process = &mut processes[pid.index()];
        debug_assert_eq!(process.vruntime(), vruntime);
        process.set_state(ProcessState::Running);
        debug!("select {} (pid {}) with vruntime {}", process.name(), pid, vruntime);
        trace!("tree {}", self.tree);
        Some(pid)
    }

    fn resident_count(&self) -> usize {
        self.tree.len()
    }

    fn compute_quantum(&self, contending: usize) -> Time {
        let contending = contending.max(1) as Time;
        let fair_share = self.config.target_latency() / contending;
        fair_share.max(self.config.minimum_granularity())
    }

    fn residents(&self) -> Vec<(Time, Pid)> {
        self.tree.iter().map(|(vruntime, pid)| (vruntime, *pid)).collect()
    }
}
