use scheduler::{cfs, Cfs, ProcessRecord};

use std::env;
use std::fs;

use simulator::format_logs;
use simulator::Simulator;

mod arrivals;

static SCHEDULER: &str = "cfs";

fn write_logs(folder: &str, name: &str, logs: &str) {
    let (target_latency, minimum_granularity) = arguments();
    fs::create_dir_all(format!("../outputs/{SCHEDULER}/{folder}")).unwrap();
    fs::write(
        format!(
            "../outputs/{SCHEDULER}/{folder}/{name}___{target_latency}_{minimum_granularity}.log"
        ),
        logs,
    )
    .unwrap();
}

fn read_logs(folder: &str, name: &str) -> String {
    let (target_latency, minimum_granularity) = arguments();
    fs::read_to_string(format!(
        "../outputs/{SCHEDULER}/{folder}/{name}___{target_latency}_{minimum_granularity}.log"
    ))
    .unwrap()
}

/// Runs the simulation to completion and compares its logs and summary
/// with the reference output.
fn run(folder: &str, name: &str, records: &[ProcessRecord]) {
    let mut simulator = Simulator::new(scheduler(), records).unwrap();
    let mut output = format_logs(simulator.run_to_completion());
    output.push_str(&simulator.summary().unwrap().to_string());

    if env::var("WRITE_OUTPUT").is_ok() {
        write_logs(folder, name, &output);
    } else {
        let reference = read_logs(folder, name);

        println!("\nleft = Correct Output\nright = Your Output\n");
        use pretty_assertions::assert_eq;
        assert_eq!(reference, output);
    }
}

fn arguments() -> (i64, i64) {
    let target_latency = env::var("TARGET_LATENCY")
        .unwrap_or("20".to_string())
        .parse::<i64>()
        .unwrap();
    let minimum_granularity = env::var("MINIMUM_GRANULARITY")
        .unwrap_or("4".to_string())
        .parse::<i64>()
        .unwrap();
    (target_latency, minimum_granularity)
}

fn scheduler() -> Cfs {
    let (target_latency, minimum_granularity) = arguments();

    println!("Target latency {target_latency}\nMinimum granularity {minimum_granularity}");
    cfs(target_latency, minimum_granularity).unwrap()
}

fn records(records: &[(&str, i64, i64)]) -> Vec<ProcessRecord> {
    records
        .iter()
        .map(|(name, start, total)| ProcessRecord::new(*name, *start, *total))
        .collect()
}
