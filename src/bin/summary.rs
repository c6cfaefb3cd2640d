//! Deployment summary reporter. Reads the test log given on the
//! command line plus the optional registration hand-off and
//! credentials files, prints the consolidated report, and exits 0
//! only when the verdict rule passes.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::warn;
use serde::Deserialize;

use kasm_lxd_connector::report;

/// Generate a deployment summary report from a test log.
#[derive(Parser, Debug)]
#[command(name = "summary-report")]
struct Cli {
    /// Path to the test log to summarize
    log_file: PathBuf,
}

#[derive(Deserialize, Debug)]
struct EnvVars {
    #[serde(default = "default_registration_path")]
    registration_path: PathBuf,
    #[serde(default = "default_credentials_path")]
    credentials_path: PathBuf,
}

fn default_registration_path() -> PathBuf {
    PathBuf::from("/tmp/lxd_registration.json")
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("/tmp/kasm_credentials.txt")
}

fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let env: EnvVars = match envy::from_env() {
        Ok(env) => env,
        Err(err) => {
            warn!("invalid environment, using defaults: {err}");
            EnvVars {
                registration_path: default_registration_path(),
                credentials_path: default_credentials_path(),
            }
        }
    };

    let summary = report::parse_log_file(&cli.log_file);
    let registration = report::load_registration_data(&env.registration_path);
    let credentials = report::load_credentials(&env.credentials_path);

    print!(
        "{}",
        report::render_report(&summary, registration.as_ref(), credentials.as_deref())
    );

    if report::overall_success(&summary) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
