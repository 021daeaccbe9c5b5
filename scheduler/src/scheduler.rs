use std::fmt::{self, Display};
use std::num::{NonZeroU64, NonZeroUsize};
use std::str::FromStr;

use crate::error::ConfigError;

/// A unit of virtual time.
pub type Time = u64;

/// The PID of a process
///
/// PIDs follow registration order and start from 1.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Pid(NonZeroUsize);

impl Pid {
    pub fn new(pid: usize) -> Pid {
        Pid(NonZeroUsize::new(pid).expect("PIDs start from 1"))
    }

    /// Position of the process in the backlog.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }
}

impl PartialEq<usize> for Pid {
    fn eq(&self, other: &usize) -> bool {
        self.0.get() == *other
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hex color string used by renderers to tell processes apart.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct ProcessColor(&'static str);

impl ProcessColor {
    pub const PALETTE: [ProcessColor; 12] = [
        ProcessColor("#FFDFD3"),
        ProcessColor("#FFF9AA"),
        ProcessColor("#BCF6FE"),
        ProcessColor("#AFD5AA"),
        ProcessColor("#FFC2EF"),
        ProcessColor("#CAA7BD"),
        ProcessColor("#CEB8FF"),
        ProcessColor("#6CB2D1"),
        ProcessColor("#FECBA5"),
        ProcessColor("#B7C68B"),
        ProcessColor("#DF9881"),
        ProcessColor("#89FAA6"),
    ];

    /// The palette entry for the `index`-th registered process.
    pub fn for_index(index: usize) -> ProcessColor {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn hex(&self) -> &'static str {
        self.0
    }
}

impl Display for ProcessColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a process is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Registered but not admitted yet.
    Backlog,

    /// Waiting in the scheduler's tree.
    Resident,

    /// Extracted from the tree and owning the processor.
    Running,

    /// Completed at `time_finished`.
    Finished {
        /// The clock value when the process completed.
        time_finished: Time,
    },
}

impl Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Backlog => write!(f, "BACKLOG"),
            ProcessState::Resident => write!(f, "READY"),
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::Finished { time_finished } => write!(f, "DONE@{}", time_finished),
        }
    }
}

/// A raw process description as handed over by a front-end.
///
/// Values are signed so that out of range input can be reported instead of
/// being unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRecord {
    pub name: String,
    pub start_time: i64,
    pub total_time_needed: i64,
}

impl ProcessRecord {
    pub fn new(name: impl Into<String>, start_time: i64, total_time_needed: i64) -> Self {
        ProcessRecord {
            name: name.into(),
            start_time,
            total_time_needed,
        }
    }

    /// Checks the record and returns `(start_time, total_time_needed)`.
    pub fn validate(&self) -> Result<(Time, NonZeroU64), ConfigError> {
        let start_time = Time::try_from(self.start_time).map_err(|_| ConfigError::StartTime {
            name: self.name.clone(),
            value: self.start_time,
        })?;
        let total_time_needed = u64::try_from(self.total_time_needed)
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or_else(|| ConfigError::TotalTime {
                name: self.name.clone(),
                value: self.total_time_needed,
            })?;
        Ok((start_time, total_time_needed))
    }
}

/// Parses a `name start_time total_time_needed` record.
impl FromStr for ProcessRecord {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ConfigError::MalformedRecord {
            record: s.trim().to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split_whitespace().collect();
        let [name, start_time, total_time_needed] = parts[..] else {
            return Err(malformed("a process consists of 3 parts"));
        };
        let start_time = start_time
            .parse::<i64>()
            .map_err(|_| malformed("start time is not an integer"))?;
        let total_time_needed = total_time_needed
            .parse::<i64>()
            .map_err(|_| malformed("total time is not an integer"))?;

        Ok(ProcessRecord::new(name, start_time, total_time_needed))
    }
}

/// The schedulable entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pid: Pid,
    name: String,
    start_time: Time,
    total_time_needed: NonZeroU64,
    vruntime: Time,
    state: ProcessState,
    color: ProcessColor,
}

impl Process {
    /// Builds the backlog entry for the `index`-th validated record.
    pub fn from_record(index: usize, record: &ProcessRecord) -> Result<Self, ConfigError> {
        let (start_time, total_time_needed) = record.validate()?;
        Ok(Process {
            pid: Pid::new(index + 1),
            name: record.name.clone(),
            start_time,
            total_time_needed,
            vruntime: 0,
            state: ProcessState::Backlog,
            color: ProcessColor::for_index(index),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn total_time_needed(&self) -> Time {
        self.total_time_needed.get()
    }

    pub fn vruntime(&self) -> Time {
        self.vruntime
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn color(&self) -> ProcessColor {
        self.color
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ProcessState::Finished { .. })
    }

    pub fn in_tree(&self) -> bool {
        self.state == ProcessState::Resident
    }

    pub fn time_finished(&self) -> Option<Time> {
        match self.state {
            ProcessState::Finished { time_finished } => Some(time_finished),
            _ => None,
        }
    }

    /// Execution still owed before the process completes.
    pub fn remaining(&self) -> Time {
        self.total_time_needed().saturating_sub(self.vruntime)
    }

    /// Whether the process may be admitted at `time`.
    pub fn is_eligible(&self, time: Time) -> bool {
        self.state == ProcessState::Backlog && self.start_time <= time
    }

    pub fn set_state(&mut self, state: ProcessState) {
        debug_assert!(!self.is_done(), "process {} is already finished", self.pid);
        self.state = state;
    }

    /// Charges `duration` units of execution.
    pub fn charge(&mut self, duration: Time) {
        debug_assert_eq!(self.state, ProcessState::Running);
        self.vruntime += duration;
    }

    /// Marks the process finished if it received all the time it needs.
    pub fn complete_if_done(&mut self, time: Time) -> bool {
        if self.vruntime >= self.total_time_needed() {
            self.set_state(ProcessState::Finished { time_finished: time });
            true
        } else {
            false
        }
    }
}

/// Validated scheduler parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CfsConfig {
    target_latency: NonZeroU64,
    minimum_granularity: NonZeroU64,
}

impl CfsConfig {
    /// * `target_latency` - the window within which every resident process should run once.
    /// * `minimum_granularity` - the floor on a single run quantum, at most `target_latency`.
    pub fn new(target_latency: i64, minimum_granularity: i64) -> Result<Self, ConfigError> {
        let target_latency = u64::try_from(target_latency)
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or(ConfigError::TargetLatency {
                value: target_latency,
            })?;
        let minimum_granularity = u64::try_from(minimum_granularity)
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or(ConfigError::MinimumGranularity {
                value: minimum_granularity,
            })?;
        if minimum_granularity > target_latency {
            return Err(ConfigError::GranularityExceedsLatency {
                minimum_granularity: minimum_granularity.get(),
                target_latency: target_latency.get(),
            });
        }
        Ok(CfsConfig {
            target_latency,
            minimum_granularity,
        })
    }

    pub fn target_latency(&self) -> Time {
        self.target_latency.get()
    }

    pub fn minimum_granularity(&self) -> Time {
        self.minimum_granularity.get()
    }
}

/// The trait that any scheduling policy driven by the simulator implements.
///
/// The scheduler keeps resident processes by [`Pid`]; process data stays in the
/// simulator's backlog.
pub trait Scheduler {
    /// Makes `process` resident, keyed by its current vruntime.
    fn admit(&mut self, process: &mut Process);

    /// Extracts the resident process that should run next.
    ///
    /// Returns [`None`] when no process is resident.
    fn select_next(&mut self, processes: &mut [Process]) -> Option<Pid>;

    /// Number of resident processes.
    fn resident_count(&self) -> usize;

    /// The quantum granted when `contending` processes compete for the processor,
    /// counting the one about to run.
    fn compute_quantum(&self, contending: usize) -> Time;

    /// How long `process` runs when `contending` processes compete: the quantum
    /// capped by the execution the process still needs.
    fn run_length(&self, process: &Process, contending: usize) -> Time {
        self.compute_quantum(contending).min(process.remaining())
    }

    /// Resident processes in scheduling order, as `(vruntime, pid)`.
    fn residents(&self) -> Vec<(Time, Pid)>;
}
