// Host fan-out - one unit of work per host, run concurrently and joined

use std::future::Future;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::{CommandError, FanoutReport, HostOutcome};

/// Run `operation` once per host concurrently and collect every outcome
///
/// The report keeps input host order. A failing host never aborts the
/// others; callers turn the report into an error with
/// `FanoutReport::into_result`.
///
/// # Arguments
/// * `action` - Short label used in logs (e.g. "start agent service")
/// * `hosts` - Target hosts
/// * `operation` - Builds the per-host future from the host name
pub async fn fan_out<T, F, Fut>(action: &str, hosts: &[String], operation: F) -> FanoutReport<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, CommandError>>,
{
    let pending = hosts.iter().map(|host| {
        let work = operation(host.clone());
        let host = host.clone();
        async move {
            HostOutcome {
                result: work.await,
                host,
            }
        }
    });

    let outcomes = join_all(pending).await;

    for outcome in &outcomes {
        if let Err(error) = &outcome.result {
            warn!(action = %action, host = %outcome.host, error = %error, "Host operation failed");
        }
    }

    let report = FanoutReport::new(outcomes);
    info!(
        action = %action,
        total = report.len(),
        failed = report.failed_hosts().len(),
        "Fan-out finished"
    );
    report
}
