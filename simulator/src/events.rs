use std::fmt::{self, Display};

use scheduler::{Pid, ProcessColor, Time};

/// An observable mutation produced by one [`crate::Simulator::step`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A process was inserted into the scheduler's tree.
    Admitted {
        pid: Pid,
        name: String,
        vruntime: Time,
        total: Time,
        color: ProcessColor,
    },

    /// The leftmost process was extracted to run next.
    Selected { pid: Pid, name: String },

    /// The selected process ran for `duration` time units.
    Ran {
        pid: Pid,
        name: String,
        duration: Time,
        color: ProcessColor,
    },

    /// A process received all the time it needs.
    Completed {
        pid: Pid,
        name: String,
        time_finished: Time,
        total: Time,
        /// Time spent admitted but not running.
        waited: Time,
    },

    /// Nothing was ready; the clock advanced to `time`.
    Idle { time: Time },

    /// Every process has completed.
    Finished { time: Time },
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Admitted {
                name,
                vruntime,
                total,
                ..
            } => write!(
                f,
                "Process {} is being inserted into the tree with a vruntime of {} (out of {})",
                name, vruntime, total
            ),
            Event::Selected { name, .. } => {
                write!(f, "Process {} has been removed from the tree to run next", name)
            }
            Event::Ran { name, duration, .. } => write!(
                f,
                "Process {} has been scheduled to run for {} time units",
                name, duration
            ),
            Event::Completed {
                name,
                time_finished,
                total,
                waited,
                ..
            } => write!(
                f,
                "Process {} has completed at time {}. It ran for {} time units and waited for {} time units",
                name, time_finished, total, waited
            ),
            Event::Idle { time } => write!(f, "No process available, time advances to {}", time),
            Event::Finished { time } => write!(f, "Finished at time {}", time),
        }
    }
}

/// Running step log
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    /// The event produced by the step.
    pub event: Event,

    /// The clock after the step.
    pub time: Time,

    /// Resident processes in scheduling order, as `(vruntime, name)`.
    pub tree: Vec<(Time, String)>,
}

impl Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.event)?;
        writeln!(f, "TIME {}", self.time)?;
        write!(f, "TREE [")?;
        for (index, (vruntime, name)) in self.tree.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", vruntime, name)?;
        }
        writeln!(f, "]")
    }
}

/// Format the [`crate::Simulator`]'s logs to a [`String`].
///
/// * `logs` - the logs recorded by the simulator.
///
/// ## Example
///
/// ```rust
/// use scheduler::ProcessRecord;
/// use simulator::{format_logs, Simulator};
///
/// let records = [ProcessRecord::new("A", 0, 5)];
/// let mut simulator = Simulator::new(scheduler::cfs(20, 4).unwrap(), &records).unwrap();
/// simulator.run_to_completion();
///
/// println!("{}", format_logs(simulator.logs()));
/// ```
pub fn format_logs(logs: &[Log]) -> String {
    let mut s = String::new();
    for (step, log) in logs.iter().enumerate() {
        s.push_str(&format!("===== Step: {} =====\n{}\n", step + 1, log));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lists_tree_in_order() {
        let log = Log {
            event: Event::Selected {
                pid: Pid::new(1),
                name: "A".into(),
            },
            time: 6,
            tree: vec![(0, "C".into()), (6, "A".into())],
        };
        assert_eq!(
            log.to_string(),
            "Process A has been removed from the tree to run next\nTIME 6\nTREE [0:C, 6:A]\n"
        );
    }

    #[test]
    fn format_numbers_steps() {
        let log = Log {
            event: Event::Finished { time: 3 },
            time: 3,
            tree: vec![],
        };
        assert_eq!(
            format_logs(&[log.clone(), log]),
            "===== Step: 1 =====\nFinished at time 3\nTIME 3\nTREE []\n\n\
             ===== Step: 2 =====\nFinished at time 3\nTIME 3\nTREE []\n\n"
        );
    }
}
