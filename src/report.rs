//! Summary report generation.
//!
//! Pulls together three independent, optional inputs: the test log,
//! the registration hand-off file, and the Kasm credentials file. Any
//! of them may be missing; the report always renders.

use std::path::Path;

use log::warn;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::api_types::{RegistrationResult, TestSummary};

pub const PASS_MARKER: &str = "[PASS]";
pub const FAIL_MARKER: &str = "[FAIL]";
pub const WARNING_MARKER: &str = "[WARNING]";
const ERROR_MARKER: &str = "[ERROR]";

pub const DEFAULT_KASM_URL: &str = "https://localhost:443";

const REPORT_WIDTH: usize = 60;

/// The report lists at most this many captured error lines; the
/// summary itself retains all of them.
const MAX_RENDERED_ERRORS: usize = 5;

/// Scan a test log for pass/fail/warning markers. A missing or
/// unreadable log is reported as a warning and yields an all-zero
/// summary rather than an error.
pub fn parse_log_file(path: &Path) -> TestSummary {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("log file {} not found: {err}", path.display());
            return TestSummary::default();
        }
    };

    summarize(&content)
}

/// Count markers in log text. `tests_run` is derived from the pass
/// and fail counts, never stored independently.
pub fn summarize(content: &str) -> TestSummary {
    let tests_passed = content.matches(PASS_MARKER).count() as u64;
    let tests_failed = content.matches(FAIL_MARKER).count() as u64;
    let warnings = content.matches(WARNING_MARKER).count() as u64;

    let errors = content
        .lines()
        .filter(|line| line.contains(FAIL_MARKER) || line.contains(ERROR_MARKER))
        .map(|line| line.trim().to_owned())
        .collect();

    TestSummary {
        tests_run: tests_passed + tests_failed,
        tests_passed,
        tests_failed,
        warnings,
        errors,
    }
}

/// Load the hand-off file written by `lxd-register`. Missing and
/// malformed files are both treated as absent.
pub fn load_registration_data(path: &Path) -> Option<RegistrationResult> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Read `key=value` pairs, one per line, splitting on the first `=`
/// only. No escaping, no quoting; order is preserved. A missing file
/// is `None` and renders as the default-URL placeholder.
pub fn load_credentials(path: &Path) -> Option<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path).ok()?;

    Some(
        content
            .lines()
            .filter_map(|line| line.trim().split_once('='))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect(),
    )
}

/// A deployment passes iff at least one test passed and none failed.
/// An empty log never counts as success.
pub fn overall_success(summary: &TestSummary) -> bool {
    summary.tests_failed == 0 && summary.tests_passed > 0
}

fn section(out: &mut String, title: &str) {
    out.push_str(&"-".repeat(REPORT_WIDTH));
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(REPORT_WIDTH));
    out.push('\n');
}

fn report_timestamp() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    OffsetDateTime::now_utc().format(&format).unwrap_or_default()
}

/// Render the fixed-layout deployment report. Sections appear in a
/// stable order regardless of which inputs were available.
pub fn render_report(
    summary: &TestSummary,
    registration: Option<&RegistrationResult>,
    credentials: Option<&[(String, String)]>,
) -> String {
    let mut out = String::new();
    let banner = "=".repeat(REPORT_WIDTH);

    out.push_str(&banner);
    out.push('\n');
    out.push_str("  KASM WORKSPACES DEPLOYMENT - SUMMARY REPORT\n");
    out.push_str(&banner);
    out.push_str("\n\n");

    out.push_str(&format!("Report Generated: {}\n\n", report_timestamp()));

    section(&mut out, "TEST RESULTS");
    out.push_str(&format!("Total Tests Run:     {}\n", summary.tests_run));
    out.push_str(&format!("Tests Passed:        {}\n", summary.tests_passed));
    out.push_str(&format!("Tests Failed:        {}\n", summary.tests_failed));
    out.push_str(&format!("Warnings:            {}\n", summary.warnings));

    if !summary.errors.is_empty() {
        out.push_str("\nErrors/Failures:\n");
        for error in summary.errors.iter().take(MAX_RENDERED_ERRORS) {
            out.push_str(&format!("  - {error}\n"));
        }
    }
    out.push('\n');

    section(&mut out, "LXD REGISTRATION STATUS");
    match registration {
        Some(reg) => {
            let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
            out.push_str(&format!(
                "Registration Attempted: {}\n",
                yes_no(reg.registration_attempted)
            ));
            out.push_str(&format!(
                "Registration Success:   {}\n",
                yes_no(reg.success)
            ));
            out.push_str(&format!("LXD Endpoint:          {}\n", reg.endpoint));
            out.push_str(&format!(
                "Hostname:              {}\n",
                reg.instance_data.hostname
            ));
            out.push_str(&format!(
                "Local IP:              {}\n",
                reg.instance_data.local_ip
            ));
        }
        None => out.push_str("Registration data not available\n"),
    }
    out.push('\n');

    section(&mut out, "KASM WORKSPACES INFORMATION");
    match credentials {
        Some(pairs) => {
            for (key, value) in pairs {
                out.push_str(&format!("{key:<20}: {value}\n"));
            }
        }
        None => {
            out.push_str("Kasm credentials file not found\n");
            out.push_str(&format!("Default URL: {DEFAULT_KASM_URL}\n"));
        }
    }
    out.push('\n');

    section(&mut out, "OVERALL STATUS");
    if overall_success(summary) {
        out.push_str("\u{2713} DEPLOYMENT SUCCESSFUL\n");
        out.push_str("  Kasm Workspaces is ready for use\n");
        out.push_str("  API is accessible via Swagger interface\n");
    } else {
        out.push_str("\u{2717} DEPLOYMENT INCOMPLETE\n");
        out.push_str("  Some tests failed - review logs for details\n");
    }

    out.push('\n');
    out.push_str(&banner);
    out.push('\n');
    out.push_str("  END OF REPORT\n");
    out.push_str(&banner);
    out.push('\n');

    out
}
