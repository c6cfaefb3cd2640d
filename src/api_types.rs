//! Types shared between the registration connector and the summary reporter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Facts about the local host, captured fresh on every registration run.
/// Never persisted on its own, only embedded in [RegistrationResult].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub hostname: String,
    /// Dotted-quad address, `127.0.0.1` when resolution fails.
    pub local_ip: String,
    pub kasm_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub status: String,
}

/// Outcome of one registration attempt, written to the hand-off file
/// consumed by the reporter. Flat object, no versioning field; the
/// layout is a compatibility contract between the two binaries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub registration_attempted: bool,
    pub success: bool,
    pub endpoint: String,
    pub instance_data: InstanceInfo,
    /// Parsed JSON from the remote, or a synthesized error object.
    pub response: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Counters scraped from a test log. Recomputed on every reporter run.
///
/// `tests_run` is always `tests_passed + tests_failed`; it is derived
/// at construction and never mutated independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub tests_run: u64,
    pub tests_passed: u64,
    pub tests_failed: u64,
    pub warnings: u64,
    /// Every `[FAIL]`/`[ERROR]` line, trimmed, in file order.
    pub errors: Vec<String>,
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use time::macros::datetime;

    use super::{InstanceInfo, RegistrationResult};

    fn sample_info() -> InstanceInfo {
        InstanceInfo {
            hostname: "ci-host".to_owned(),
            local_ip: "10.0.4.12".to_owned(),
            kasm_url: "https://localhost:443".to_owned(),
            timestamp: datetime!(2024-01-15 10:30:00 UTC),
            instance_type: "kasm_workspace".to_owned(),
            status: "active".to_owned(),
        }
    }

    #[test]
    pub fn instance_info_serde() {
        assert_eq!(
            serde_json::to_string(&sample_info()).unwrap(),
            r#"{"hostname":"ci-host","local_ip":"10.0.4.12","kasm_url":"https://localhost:443","timestamp":"2024-01-15T10:30:00Z","type":"kasm_workspace","status":"active"}"#
        );

        assert_eq!(
            sample_info(),
            serde_json::from_str::<InstanceInfo>(
                r#"
            {
                "hostname": "ci-host",
                "local_ip": "10.0.4.12",
                "kasm_url": "https://localhost:443",
                "timestamp": "2024-01-15T10:30:00Z",
                "type": "kasm_workspace",
                "status": "active"
            }
        "#
            )
            .unwrap()
        );
    }

    #[test]
    pub fn registration_result_serde() {
        let result = RegistrationResult {
            registration_attempted: true,
            success: false,
            endpoint: "https://201.151.150.226:8443".to_owned(),
            instance_data: sample_info(),
            response: json!({"error": "connection_failed", "message": "refused"}),
            timestamp: datetime!(2024-01-15 10:30:05 UTC),
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: RegistrationResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(result, decoded);

        // Timestamps must carry the trailing-Z UTC marker on the wire.
        assert!(encoded.contains(r#""timestamp":"2024-01-15T10:30:05Z""#));
    }
}
