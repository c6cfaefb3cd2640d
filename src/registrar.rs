//! Instance registration against the LXD orchestration endpoint.
//!
//! One HTTPS POST, no retries. Network failures are an expected
//! condition in CI runners, so every error is folded into a structured
//! response value and returned as a non-success outcome instead of
//! propagating; the process exit code never reflects the result.

use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::{error, info};
use reqwest::StatusCode;
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::api_types::{InstanceInfo, RegistrationResult};

/// Registration path on the remote endpoint. The actual LXD API shape
/// is unconfirmed; this mirrors the instances collection.
pub const REGISTER_PATH: &str = "/1.0/instances";

pub const USER_AGENT: &str = "Kasm-LXD-Connector/1.0";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// What a single registration attempt produced. The `success` flag in
/// the persisted hand-off file is the only truthful outcome indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterOutcome {
    pub success: bool,
    pub response: Value,
}

/// Gather local host facts for the registration payload. Hostname or
/// IP resolution failures degrade to loopback values; this never fails.
pub fn gather_instance_info(kasm_url: &str) -> InstanceInfo {
    let hostname =
        sysinfo::System::host_name().unwrap_or_else(|| String::from("localhost"));
    let local_ip = resolve_local_ip(&hostname);

    InstanceInfo {
        hostname,
        local_ip,
        kasm_url: kasm_url.to_owned(),
        timestamp: OffsetDateTime::now_utc(),
        instance_type: String::from("kasm_workspace"),
        status: String::from("active"),
    }
}

fn resolve_local_ip(hostname: &str) -> String {
    (hostname, 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.find(|addr| addr.is_ipv4()))
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| String::from("127.0.0.1"))
}

/// Build the client used for the single registration call. The remote
/// serves a self-signed certificate, so TLS verification is disabled.
pub fn build_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// POST the instance facts to `<endpoint>/1.0/instances`.
pub async fn register(
    client: &reqwest::Client,
    endpoint: &str,
    info: &InstanceInfo,
) -> RegisterOutcome {
    let url = format!("{endpoint}{REGISTER_PATH}");
    info!("registering instance to {url}");

    let response = match client.post(&url).json(info).send().await {
        Ok(response) => response,
        Err(err) => {
            return RegisterOutcome {
                success: false,
                response: classify_send_error(&err),
            }
        }
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if registered_status(status) {
        info!("instance registered, status {status}");
        RegisterOutcome {
            success: true,
            response: parse_success_body(body),
        }
    } else {
        error!("registration failed with status {status}");
        RegisterOutcome {
            success: false,
            response: json!({ "error": body, "status_code": status.as_u16() }),
        }
    }
}

fn registered_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED
    )
}

/// A successful response body is passed through when it parses as
/// JSON; anything else is wrapped so the raw text survives.
fn parse_success_body(body: String) -> Value {
    serde_json::from_str(&body)
        .unwrap_or_else(|_| json!({ "status": "registered", "raw_response": body }))
}

fn classify_send_error(err: &reqwest::Error) -> Value {
    if err.is_timeout() {
        error!("request timeout: {err}");
        json!({ "error": "timeout", "message": err.to_string() })
    } else if err.is_connect() {
        error!("connection failed: {err}; the endpoint may be unreachable");
        json!({ "error": "connection_failed", "message": err.to_string() })
    } else {
        error!("unexpected error: {err}");
        json!({ "error": "unexpected", "message": err.to_string() })
    }
}

/// Write the hand-off file consumed by the summary reporter,
/// overwriting any previous run. Persistence is best effort; callers
/// log the error and keep going.
pub fn save_registration_result(
    result: &RegistrationResult,
    path: &Path,
) -> anyhow::Result<()> {
    let payload = serde_json::to_string_pretty(result)
        .context("failed to serialize registration result")?;
    std::fs::write(path, payload)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("registration result saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use reqwest::StatusCode;
    use serde_json::json;
    use time::macros::datetime;

    use crate::api_types::RegistrationResult;

    use super::{
        gather_instance_info, parse_success_body, registered_status, resolve_local_ip,
        save_registration_result,
    };

    #[test]
    pub fn instance_info_constants() {
        let info = gather_instance_info("https://localhost:443");
        assert_eq!(info.instance_type, "kasm_workspace");
        assert_eq!(info.status, "active");
        assert_eq!(info.kasm_url, "https://localhost:443");
        assert!(!info.hostname.is_empty());
        assert!(!info.local_ip.is_empty());
    }

    #[test]
    pub fn unresolvable_hostname_falls_back_to_loopback() {
        let ip = resolve_local_ip("host-that-does-not-resolve.invalid");
        assert_eq!(ip, "127.0.0.1");
    }

    #[test]
    pub fn accepted_statuses() {
        assert!(registered_status(StatusCode::OK));
        assert!(registered_status(StatusCode::CREATED));
        assert!(registered_status(StatusCode::ACCEPTED));
        assert!(!registered_status(StatusCode::NO_CONTENT));
        assert!(!registered_status(StatusCode::FORBIDDEN));
        assert!(!registered_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    pub fn json_body_passes_through() {
        assert_eq!(
            parse_success_body(r#"{"id":"inst-7"}"#.to_owned()),
            json!({"id": "inst-7"})
        );
    }

    #[test]
    pub fn non_json_body_is_wrapped() {
        assert_eq!(
            parse_success_body("created".to_owned()),
            json!({"status": "registered", "raw_response": "created"})
        );
    }

    fn sample_result(success: bool) -> RegistrationResult {
        RegistrationResult {
            registration_attempted: true,
            success,
            endpoint: "https://201.151.150.226:8443".to_owned(),
            instance_data: gather_instance_info("https://localhost:443"),
            response: json!({"error": "connection_failed", "message": "refused"}),
            timestamp: datetime!(2024-01-15 10:30:05 UTC),
        }
    }

    #[test]
    pub fn save_overwrites_previous_run() {
        let dir = tempdir::TempDir::new("registrar_test").unwrap();
        let path = dir.path().join("lxd_registration.json");

        save_registration_result(&sample_result(false), &path).unwrap();
        save_registration_result(&sample_result(true), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let persisted: RegistrationResult = serde_json::from_str(&content).unwrap();
        assert!(persisted.success);
        assert!(persisted.registration_attempted);
    }

    #[test]
    pub fn save_into_missing_directory_reports_error() {
        let dir = tempdir::TempDir::new("registrar_test").unwrap();
        let path = dir.path().join("no_such_dir").join("result.json");
        assert!(save_registration_result(&sample_result(true), &path).is_err());
    }
}
