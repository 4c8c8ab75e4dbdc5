//! Human-readable rendering of a [`ReplicationReport`] for the terminal.

use std::fmt::Write as _;

use ideograbber_core::ReplicationReport;

pub const NOTHING_SELECTED: &str = "Please select some expressions and servers.";

fn expressions(count: usize) -> &'static str {
    if count == 1 {
        "expression"
    } else {
        "expressions"
    }
}

/// Renders the summary shown after a batch.
///
/// Successes are summarised as a count; each failure gets its own line with the
/// platform's reason and error code.
pub fn render_report(report: &ReplicationReport) -> String {
    if report.is_empty() {
        return NOTHING_SELECTED.to_string();
    }

    let mut out = String::new();
    let succeeded = report.succeeded();
    if succeeded > 0 {
        let _ = writeln!(
            out,
            "Successfully copied {succeeded} {}",
            expressions(succeeded)
        );
    }

    let failures = report.failures();
    if !failures.is_empty() {
        let _ = writeln!(
            out,
            "Failed to copy {} {}:",
            failures.len(),
            expressions(failures.len())
        );
        for failure in failures {
            let _ = writeln!(
                out,
                "- {} to {}: {} ({})",
                failure.item.name, failure.destination.name, failure.reason, failure.code
            );
        }
    }

    if out.is_empty() {
        out.push_str("Nothing was copied.");
    }
    out.trim_end().to_string()
}
