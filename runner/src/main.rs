use std::env;
use std::error::Error;

use log::info;
use scheduler::{cfs, ProcessRecord};
use simulator::{format_logs, Simulator};

const DEFAULT_PROCESSES: &str = "A 0 20;B 0 5;C 0 10";

/// Reads an integer setting, falling back to `default` when unset.
fn setting(name: &str, default: i64) -> Result<i64, Box<dyn Error>> {
    match env::var(name) {
        Ok(value) => Ok(value
            .trim()
            .parse::<i64>()
            .map_err(|err| format!("{name}={value}: {err}"))?),
        Err(_) => Ok(default),
    }
}

/// Reads `;` separated `name start_time total_time_needed` records.
fn processes() -> Result<Vec<ProcessRecord>, Box<dyn Error>> {
    let list = env::var("PROCESSES").unwrap_or_else(|_| DEFAULT_PROCESSES.to_string());
    let records = list
        .split(';')
        .filter(|record| !record.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ProcessRecord>, _>>()?;
    Ok(records)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let target_latency = setting("TARGET_LATENCY", 20)?;
    let minimum_granularity = setting("MINIMUM_GRANULARITY", 4)?;
    let records = processes()?;

    info!(
        "target latency {target_latency}, minimum granularity {minimum_granularity}, {} processes",
        records.len()
    );

    let mut simulator = Simulator::new(cfs(target_latency, minimum_granularity)?, &records)?;
    let logs = simulator.run_to_completion();
    println!("{}", format_logs(logs));

    if let Some(summary) = simulator.summary() {
        println!("{}", summary);
    }
    Ok(())
}

// Do not delete this line
#[cfg(test)]
mod tests;
