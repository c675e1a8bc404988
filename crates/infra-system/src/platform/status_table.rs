// Status table rendering shared by every platform variant
// reason: tabled for column alignment, same as the gpctl tables

use std::io::Write;

use tabled::builder::Builder;
use tabled::settings::Style;

use gpmgmt_core::domain::ServiceStatus;

const HEADER: [&str; 5] = ["ROLE", "HOST", "STATUS", "PID", "UPTIME"];

/// Write one row per status, in input order
///
/// Nothing is written for an empty status list.
pub fn render_status_table(
    out: &mut dyn Write,
    service_name: &str,
    statuses: &[ServiceStatus],
    skip_header: bool,
) -> std::io::Result<()> {
    if statuses.is_empty() {
        return Ok(());
    }

    let mut builder = Builder::default();
    if !skip_header {
        builder.push_record(HEADER);
    }

    for status in statuses {
        let pid = if status.pid == 0 {
            String::new()
        } else {
            status.pid.to_string()
        };
        builder.push_record([
            service_name.to_string(),
            status.host.clone(),
            status.state.to_string(),
            pid,
            status.uptime.clone(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::blank());
    writeln!(out, "{}", table)
}
