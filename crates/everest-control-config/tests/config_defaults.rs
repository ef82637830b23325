//! Config defaults and section validation tests for everest-control-config.
// everest-control-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Section Validation Tests
// Description: Validate default behavior and per-section invariants.
// Purpose: Ensure an empty config is valid and bad values fail closed.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use everest_control_config::AuditSinkKind;
use everest_control_config::EverestControlConfig;

mod common;

use crate::common::assert_invalid;

type TestResult = Result<(), String>;

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    assert!(config.rbac.enabled);
    assert_eq!(config.audit.sink, AuditSinkKind::Stderr);
    assert_eq!(config.cluster.connect_timeout(), Duration::from_millis(5_000));
    assert_eq!(config.cluster.request_timeout(), Duration::from_millis(30_000));
    assert!(config.cluster.ca_file.is_none());
    Ok(())
}

#[test]
fn default_chart_ref_points_at_db_namespace_chart() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    let chart = config.installer.chart_ref();
    assert_eq!(chart.name, "everest-db-namespace");
    assert_eq!(chart.version, None);
    assert_eq!(
        chart.repo_url.as_deref(),
        Some("https://percona.github.io/percona-helm-charts/")
    );
    assert_eq!(chart.directory, None);
    Ok(())
}

#[test]
fn chart_ref_carries_version_and_directory() -> TestResult {
    let config = EverestControlConfig::from_toml(
        r#"
[installer]
chart_version = " 1.4.0 "
chart_dir = "/src/everest-helm"
"#,
    )
    .map_err(|err| err.to_string())?;
    let chart = config.installer.chart_ref();
    assert_eq!(chart.version.as_deref(), Some("1.4.0"));
    assert_eq!(chart.directory, Some(PathBuf::from("/src/everest-helm")));
    Ok(())
}

#[test]
fn cluster_rejects_non_http_url() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[cluster]\napi_url = \"ftp://cluster.local\"\n"),
        "must be http or https",
    )
}

#[test]
fn cluster_rejects_unparseable_url() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[cluster]\napi_url = \"not a url\"\n"),
        "cluster.api_url is invalid",
    )
}

#[test]
fn cluster_rejects_connect_timeout_below_minimum() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[cluster]\nconnect_timeout_ms = 10\n"),
        "cluster.connect_timeout_ms must be between",
    )
}

#[test]
fn cluster_rejects_request_timeout_above_maximum() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[cluster]\nrequest_timeout_ms = 600001\n"),
        "cluster.request_timeout_ms must be between",
    )
}

#[test]
fn cluster_rejects_request_shorter_than_connect() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml(
            "[cluster]\nconnect_timeout_ms = 10000\nrequest_timeout_ms = 5000\n",
        ),
        "request_timeout_ms must be >= connect_timeout_ms",
    )
}

#[test]
fn cluster_accepts_ca_file() -> TestResult {
    let config = EverestControlConfig::from_toml(
        "[cluster]\napi_url = \"https://10.0.0.1:6443\"\nca_file = \"/var/run/ca.crt\"\n",
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.cluster.ca_file.as_deref(), Some("/var/run/ca.crt"));
    Ok(())
}

#[test]
fn cluster_rejects_blank_ca_file() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[cluster]\nca_file = \"  \"\n"),
        "cluster.ca_file must be non-empty",
    )
}

#[test]
fn installer_rejects_empty_chart_name() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[installer]\nchart_name = \"  \"\n"),
        "installer.chart_name must be non-empty",
    )
}

#[test]
fn installer_rejects_blank_chart_version() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[installer]\nchart_version = \"\"\n"),
        "installer.chart_version must be non-empty when set",
    )
}

#[test]
fn file_audit_sink_requires_path() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[audit]\nsink = \"file\"\n"),
        "audit.path is required for the file sink",
    )
}

#[test]
fn file_audit_sink_with_path_validates() -> TestResult {
    let config = EverestControlConfig::from_toml(
        "[audit]\nsink = \"file\"\npath = \"/var/log/everest/audit.jsonl\"\n",
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.audit.sink, AuditSinkKind::File);
    Ok(())
}

#[test]
fn unknown_audit_sink_is_a_parse_error() -> TestResult {
    assert_invalid(
        EverestControlConfig::from_toml("[audit]\nsink = \"syslog\"\n"),
        "config parse error",
    )
}
