use std::fmt::{self, Display};

use scheduler::{Pid, Process, Time};

/// Per process statistics of a finished simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub pid: Pid,
    pub name: String,
    pub arrival_time: Time,
    /// Total time the process needed.
    pub service_time: Time,
    pub finish_time: Time,
    /// `finish_time - arrival_time`
    pub turnaround: Time,
    /// Turnaround time not spent running.
    pub waiting_time: Time,
    /// `turnaround / service_time`
    pub normalized_turnaround: f64,
}

impl SummaryRow {
    /// Returns [`None`] if the process has not finished.
    pub fn new(process: &Process) -> Option<SummaryRow> {
        let finish_time = process.time_finished()?;
        let turnaround = finish_time - process.start_time();
        let service_time = process.total_time_needed();
        Some(SummaryRow {
            pid: process.pid(),
            name: process.name().to_string(),
            arrival_time: process.start_time(),
            service_time,
            finish_time,
            turnaround,
            waiting_time: turnaround.saturating_sub(service_time),
            normalized_turnaround: turnaround as f64 / service_time as f64,
        })
    }
}

impl Display for SummaryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}",
            self.name,
            self.arrival_time,
            self.service_time,
            self.finish_time,
            self.turnaround,
            self.waiting_time,
            self.normalized_turnaround
        )
    }
}

/// Statistics of a finished simulation, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Summary =====")?;
        writeln!(f, "NAME\tARRIVAL\tSERVICE\tFINISH\tTURN\tWAIT\tNORM")?;
        for row in &self.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
