//! One-shot registration connector. Posts local host facts to the LXD
//! orchestration endpoint and persists the outcome to the hand-off
//! file. Always exits 0: callers inspect the persisted `success`
//! field, not the exit code.

use std::path::Path;

use anyhow::Result;
use env_logger::Env;
use log::{info, warn};
use serde::Deserialize;
use time::OffsetDateTime;

use kasm_lxd_connector::api_types::RegistrationResult;
use kasm_lxd_connector::registrar;

#[derive(Deserialize, Debug)]
struct EnvVars {
    #[serde(default = "default_endpoint")]
    lxd_endpoint: String,
    #[serde(default = "default_result_path")]
    result_path: String,
    #[serde(default = "default_kasm_url")]
    kasm_url: String,
}

fn default_endpoint() -> String {
    String::from("https://201.151.150.226:8443")
}

fn default_result_path() -> String {
    String::from("/tmp/lxd_registration.json")
}

fn default_kasm_url() -> String {
    String::from("https://localhost:443")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let env: EnvVars = envy::from_env()?;
    info!("LXD instance registration connector");
    info!("Environment: {:?}", &env);

    info!("[STEP 1/3] gathering system information");
    let instance = registrar::gather_instance_info(&env.kasm_url);
    info!(
        "instance: {} ({}) at {}",
        instance.hostname, instance.local_ip, instance.kasm_url
    );

    info!("[STEP 2/3] registering instance with LXD endpoint");
    let client = registrar::build_client()?;
    let outcome = registrar::register(&client, &env.lxd_endpoint, &instance).await;
    let success = outcome.success;

    info!("[STEP 3/3] saving registration result");
    let result = RegistrationResult {
        registration_attempted: true,
        success,
        endpoint: env.lxd_endpoint,
        instance_data: instance,
        response: outcome.response,
        timestamp: OffsetDateTime::now_utc(),
    };
    if let Err(err) = registrar::save_registration_result(&result, Path::new(&env.result_path)) {
        warn!("could not save result file: {err:#}");
    }

    if success {
        info!("registration completed successfully");
    } else {
        // Unreachable endpoints are expected in CI; the connector's job
        // is to attempt and record, so this still exits 0.
        info!("registration connector executed (endpoint may be unreachable)");
    }

    Ok(())
}
