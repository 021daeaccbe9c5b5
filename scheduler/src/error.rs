//! Errors raised while validating scheduler input.
//!
//! Every variant names the constraint that was violated so a front-end can
//! report it and let the user retry with corrected input.

use std::fmt;

/// A rejected configuration value or process record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Target latency must be a positive integer.
    TargetLatency { value: i64 },
    /// Minimum granularity must be a positive integer.
    MinimumGranularity { value: i64 },
    /// Minimum granularity must not exceed target latency.
    GranularityExceedsLatency {
        minimum_granularity: u64,
        target_latency: u64,
    },
    /// A process start time must be non-negative.
    StartTime { name: String, value: i64 },
    /// A process must need a positive amount of time.
    TotalTime { name: String, value: i64 },
    /// A process record could not be read.
    MalformedRecord { record: String, reason: String },
    /// The latest start time plus every process's total time must fit in
    /// the simulation clock.
    ClockOverflow { latest_start: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TargetLatency { value } => {
                write!(f, "invalid target latency {}: must be positive", value)
            }
            ConfigError::MinimumGranularity { value } => {
                write!(f, "invalid minimum granularity {}: must be positive", value)
            }
            ConfigError::GranularityExceedsLatency {
                minimum_granularity,
                target_latency,
            } => write!(
                f,
                "invalid minimum granularity {}: exceeds target latency {}",
                minimum_granularity, target_latency
            ),
            ConfigError::StartTime { name, value } => write!(
                f,
                "invalid start time {} for process {}: must be non-negative",
                value, name
            ),
            ConfigError::TotalTime { name, value } => write!(
                f,
                "invalid total time {} for process {}: must be positive",
                value, name
            ),
            ConfigError::MalformedRecord { record, reason } => {
                write!(f, "malformed process record `{}`: {}", record, reason)
            }
            ConfigError::ClockOverflow { latest_start } => write!(
                f,
                "workload starting as late as {} needs more time than the clock can hold ({})",
                latest_start,
                u64::MAX
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::ConfigError;

    #[test]
    fn messages_name_the_constraint() {
        let err = ConfigError::GranularityExceedsLatency {
            minimum_granularity: 8,
            target_latency: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid minimum granularity 8: exceeds target latency 4"
        );
        let err = ConfigError::TotalTime {
            name: "B".into(),
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "invalid total time 0 for process B: must be positive"
        );
        let err = ConfigError::ClockOverflow { latest_start: 7 };
        assert_eq!(
            err.to_string(),
            "workload starting as late as 7 needs more time than the clock can hold (18446744073709551615)"
        );
    }
}
