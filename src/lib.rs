//! Deployment connector for Kasm workspaces running on LXD hosts.
//!
//! Two binaries share this library. `lxd-register` posts local host
//! facts to the orchestration endpoint and persists the outcome to the
//! hand-off file; `summary-report` renders a consolidated deployment
//! report from the test log, the hand-off file, and the Kasm
//! credentials file.

pub mod api_types;
pub mod registrar;
pub mod report;
