//! A step-wise scheduling simulation library
//!
//! This is used for simulating schedulers from the [`scheduler`] crate.
//! A [`Simulator`] advances one transition per [`Simulator::step`] call so a
//! driver (a renderer, a log writer, a test) can observe the scheduler
//! between mutations.

use std::fmt::{self, Display};

use log::{debug, info};
use scheduler::{ConfigError, Pid, Process, ProcessRecord, Scheduler, Time};

mod events;
mod summary;

pub use events::{format_logs, Event, Log};
pub use summary::{Summary, SummaryRow};

/// The phase the simulator executes on its next step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimState {
    /// Admit the first eligible backlog process.
    Admitting,
    /// Extract the next process, or idle for one time unit.
    Selecting,
    /// Run the extracted process for one quantum.
    Running,
    /// Complete the process or put it back in the tree.
    Requeuing,
    /// Every process has completed.
    Finished,
}

impl Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimState::Admitting => write!(f, "ADMITTING"),
            SimState::Selecting => write!(f, "SELECTING"),
            SimState::Running => write!(f, "RUNNING"),
            SimState::Requeuing => write!(f, "REQUEUING"),
            SimState::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Receives every step log as it is recorded.
pub trait Observer {
    fn notify(&mut self, log: &Log);
}

impl<F: FnMut(&Log)> Observer for F {
    fn notify(&mut self, log: &Log) {
        self(log)
    }
}

/// The simulation state machine.
pub struct Simulator<S: Scheduler> {
    scheduler: S,
    processes: Vec<Process>,
    time: Time,
    current: Option<Pid>,
    state: SimState,
    logs: Vec<Log>,
    keep_logs: bool,
    observers: Vec<Box<dyn Observer>>,
}

impl<S: Scheduler> Simulator<S> {
    /// Builds a simulation over `records`.
    ///
    /// * `scheduler` - the policy to simulate.
    /// * `records` - the processes, in registration order. Processes with equal
    ///               vruntime are admitted and selected in this order.
    ///
    /// Every record is validated before any is registered. The clock never
    /// passes the latest start time plus the sum of all total times, so that
    /// bound must fit in [`Time`].
    pub fn new(scheduler: S, records: &[ProcessRecord]) -> Result<Self, ConfigError> {
        let processes = records
            .iter()
            .enumerate()
            .map(|(index, record)| Process::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        let latest_start = processes.iter().map(Process::start_time).max().unwrap_or(0);
        processes
            .iter()
            .try_fold(latest_start, |bound, process| {
                bound.checked_add(process.total_time_needed())
            })
            .ok_or(ConfigError::ClockOverflow { latest_start })?;

        Ok(Simulator {
            scheduler,
            processes,
            time: 0,
            current: None,
            state: SimState::Admitting,
            logs: vec![],
            keep_logs: true,
            observers: vec![],
        })
    }

    /// Registers an observer that is notified on every recorded step.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Stops storing logs in [`Simulator::logs`]. Observers are still
    /// notified on every step.
    pub fn without_logs(mut self) -> Self {
        self.keep_logs = false;
        self.logs.clear();
        self
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SimState::Finished
    }

    /// All registered processes, in registration order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// The process extracted from the tree, while it runs.
    pub fn current(&self) -> Option<&Process> {
        self.current.map(|pid| &self.processes[pid.index()])
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The logs of every step that produced an event.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Executes exactly one state transition.
    ///
    /// Returns the event the transition produced, if any. Once the simulation
    /// is finished this is a no-op that returns [`None`].
    pub fn step(&mut self) -> Option<Event> {
        debug!("step at time {} in state {}", self.time, self.state);
        let event = match self.state {
            SimState::Admitting => self.admit_next(),
            SimState::Selecting => Some(self.select()),
            SimState::Running => Some(self.run()),
            SimState::Requeuing => Some(self.requeue()),
            SimState::Finished => None,
        }?;
        self.record(&event);
        Some(event)
    }

    /// Drives [`Simulator::step`] until the simulation is finished.
    pub fn run_to_completion(&mut self) -> &[Log] {
        while !self.is_finished() {
            self.step();
        }
        &self.logs
    }

    /// Statistics for every process, available once the simulation is finished.
    pub fn summary(&self) -> Option<Summary> {
        if !self.is_finished() {
            return None;
        }
        let rows = self
            .processes
            .iter()
            .map(SummaryRow::new)
            .collect::<Option<Vec<_>>>()?;
        Some(Summary { rows })
    }

    fn admit_next(&mut self) -> Option<Event> {
        let time = self.time;
        if let Some(process) = self.processes.iter_mut().find(|p| p.is_eligible(time)) {
            self.scheduler.admit(process);
            return Some(admitted(process));
        }

        if self.processes.iter().all(Process::is_done) {
            info!("all processes finished at time {}", self.time);
            self.state = SimState::Finished;
            Some(Event::Finished { time: self.time })
        } else {
            self.state = SimState::Selecting;
            None
        }
    }

    fn select(&mut self) -> Event {
        self.state = SimState::Admitting;
        match self.scheduler.select_next(&mut self.processes) {
            Some(pid) => {
                self.current = Some(pid);
                self.state = SimState::Running;
                Event::Selected {
                    pid,
                    name: self.processes[pid.index()].name().to_string(),
                }
            }
            None => {
                self.time += 1;
                debug!("idle, time advances to {}", self.time);
                Event::Idle { time: self.time }
            }
        }
    }

    fn run(&mut self) -> Event {
        let pid = self.running_pid();
        // The running process is out of the tree, so count it back in.
        let contending = self.scheduler.resident_count() + 1;
        let duration = self
            .scheduler
            .run_length(&self.processes[pid.index()], contending);

        let process = &mut self.processes[pid.index()];
        process.charge(duration);
        self.time += duration;
        self.state = SimState::Requeuing;
        debug!(
            "{} ran for {} of {} contending, vruntime now {}",
            process.name(),
            duration,
            contending,
            process.vruntime()
        );

        Event::Ran {
            pid,
            name: process.name().to_string(),
            duration,
            color: process.color(),
        }
    }

    fn requeue(&mut self) -> Event {
        let pid = self.running_pid();
        self.current = None;
        self.state = SimState::Admitting;

        let process = &mut self.processes[pid.index()];
        if process.complete_if_done(self.time) {
            info!("{} completed at time {}", process.name(), self.time);
            let turnaround = self.time - process.start_time();
            Event::Completed {
                pid,
                name: process.name().to_string(),
                time_finished: self.time,
                total: process.total_time_needed(),
                waited: turnaround.saturating_sub(process.total_time_needed()),
            }
        } else {
            self.scheduler.admit(process);
            admitted(process)
        }
    }

    fn running_pid(&self) -> Pid {
        match self.current {
            Some(pid) => pid,
            None => panic!("simulator is {} without a selected process", self.state),
        }
    }

    fn record(&mut self, event: &Event) {
        if !self.keep_logs && self.observers.is_empty() {
            return;
        }
        let tree = self
            .scheduler
            .residents()
            .into_iter()
            .map(|(vruntime, pid)| (vruntime, self.processes[pid.index()].name().to_string()))
            .collect();
        let log = Log {
            event: event.clone(),
            time: self.time,
            tree,
        };
        for observer in self.observers.iter_mut() {
            observer.notify(&log);
        }
        if self.keep_logs {
            self.logs.push(log);
        }
    }
}

fn admitted(process: &Process) -> Event {
    Event::Admitted {
        pid: process.pid(),
        name: process.name().to_string(),
        vruntime: process.vruntime(),
        total: process.total_time_needed(),
        color: process.color(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use scheduler::cfs;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn every_process_finishes(
            records in proptest::collection::vec((0i64..30, 1i64..40), 0..12),
            target_latency in 1i64..40,
            granularity_percent in 1i64..=100,
        ) {
            let minimum_granularity = (target_latency * granularity_percent / 100).max(1);
            let records: Vec<ProcessRecord> = records
                .iter()
                .enumerate()
                .map(|(index, (start, total))| ProcessRecord::new(format!("P{index}"), *start, *total))
                .collect();
            let mut simulator =
                Simulator::new(cfs(target_latency, minimum_granularity).unwrap(), &records).unwrap();

            // Each run consumes at least one unit, and idle ticks are bounded by the last arrival.
            let total: i64 = records.iter().map(|r| r.total_time_needed).sum();
            let bound = 4 * (records.len() as i64 + total + 30) + 8;
            let mut steps = 0;
            while !simulator.is_finished() {
                simulator.step();
                steps += 1;
                prop_assert!(steps <= bound, "no termination after {} steps", steps);
            }

            let summary = simulator.summary().unwrap();
            prop_assert_eq!(summary.rows.len(), records.len());
            for (row, record) in summary.rows.iter().zip(&records) {
                prop_assert!(row.finish_time >= record.start_time as Time + record.total_time_needed as Time);
                prop_assert!(row.turnaround >= row.service_time);
            }
            prop_assert!(simulator.processes().iter().all(|p| p.vruntime() == p.total_time_needed()));
        }
    }
}
