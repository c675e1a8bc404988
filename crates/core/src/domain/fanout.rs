// Per-host outcome bookkeeping for multi-host operations

use thiserror::Error;

use crate::domain::command::CommandError;

/// Outcome of one host's unit of work
#[derive(Debug)]
pub struct HostOutcome<T = ()> {
    pub host: String,
    pub result: Result<T, CommandError>,
}

/// Every host's outcome, in input host order
#[derive(Debug)]
pub struct FanoutReport<T = ()> {
    outcomes: Vec<HostOutcome<T>>,
}

impl<T> FanoutReport<T> {
    pub fn new(outcomes: Vec<HostOutcome<T>>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[HostOutcome<T>] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded_hosts(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.host.as_str())
            .collect()
    }

    pub fn failed_hosts(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.host.as_str())
            .collect()
    }

    pub fn into_outcomes(self) -> Vec<HostOutcome<T>> {
        self.outcomes
    }

    /// Ok with every host's value, or every failure keyed by host
    pub fn into_result(self) -> Result<Vec<(String, T)>, HostFailures> {
        let total = self.outcomes.len();
        let mut values = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for outcome in self.outcomes {
            match outcome.result {
                Ok(value) => values.push((outcome.host, value)),
                Err(error) => failures.push(HostFailure {
                    host: outcome.host,
                    error,
                }),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            Err(HostFailures { total, failures })
        }
    }
}

/// One failed host
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub error: CommandError,
}

/// Failures of a multi-host operation, never collapsed into one error
#[derive(Error, Debug)]
#[error("{} of {} hosts failed: {}", .failures.len(), .total, summarize(.failures))]
pub struct HostFailures {
    pub total: usize,
    pub failures: Vec<HostFailure>,
}

impl HostFailures {
    pub fn hosts(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.host.as_str()).collect()
    }

    pub fn error_for(&self, host: &str) -> Option<&CommandError> {
        self.failures
            .iter()
            .find(|f| f.host == host)
            .map(|f| &f.error)
    }
}

fn summarize(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.host, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command::CommandOutput;

    fn exit_error(host: &str) -> CommandError {
        CommandError::Exit {
            command: format!("gpssh -h {}", host),
            code: Some(1),
            output: CommandOutput::new("", "boom", Some(1)),
        }
    }

    #[test]
    fn test_into_result_keeps_every_failure() {
        let report = FanoutReport::new(vec![
            HostOutcome {
                host: "sdw1".to_string(),
                result: Ok(()),
            },
            HostOutcome {
                host: "sdw2".to_string(),
                result: Err(exit_error("sdw2")),
            },
            HostOutcome {
                host: "sdw3".to_string(),
                result: Err(exit_error("sdw3")),
            },
        ]);

        assert_eq!(report.succeeded_hosts(), vec!["sdw1"]);
        assert_eq!(report.failed_hosts(), vec!["sdw2", "sdw3"]);

        let failures = report.into_result().unwrap_err();
        assert_eq!(failures.total, 3);
        assert_eq!(failures.hosts(), vec!["sdw2", "sdw3"]);
        assert_eq!(failures.error_for("sdw3").and_then(|e| e.exit_code()), Some(1));

        let message = failures.to_string();
        assert!(message.starts_with("2 of 3 hosts failed"));
        assert!(message.contains("sdw2"));
    }

    #[test]
    fn test_all_success_returns_values_in_order() {
        let report = FanoutReport::new(vec![
            HostOutcome {
                host: "a".to_string(),
                result: Ok(1),
            },
            HostOutcome {
                host: "b".to_string(),
                result: Ok(2),
            },
        ]);

        assert!(report.is_success());
        let values = report.into_result().unwrap();
        assert_eq!(values, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }
}
