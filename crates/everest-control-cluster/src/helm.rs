// everest-control-cluster/src/helm.rs
// ============================================================================
// Module: Helm Release Installer
// Description: ReleaseInstaller backed by the helm binary.
// Purpose: Install or upgrade the per-namespace database chart.
// Dependencies: everest-control-core, tokio
// ============================================================================

//! ## Overview
//! Each install runs `helm upgrade --install` once. The child process is
//! killed when the install future is dropped, so a cancelled provisioning
//! step does not leave helm running in the background.
//!
//! A local chart directory takes precedence over the chart name, version,
//! and repository.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use everest_control_core::InstallError;
use everest_control_core::InstallRequest;
use everest_control_core::ReleaseInstaller;
use tokio::process::Command;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum helm stderr carried into an error message.
pub(crate) const MAX_STDERR_BYTES: usize = 4 * 1024;

// ============================================================================
// SECTION: Installer
// ============================================================================

/// Release installer that shells out to helm.
#[derive(Debug, Clone)]
pub struct HelmReleaseInstaller {
    /// Helm binary name or path.
    binary: PathBuf,
    /// Kubeconfig passed with `--kubeconfig`.
    kubeconfig: Option<PathBuf>,
}

impl HelmReleaseInstaller {
    /// Creates an installer using the given helm binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
        }
    }

    /// Passes an explicit kubeconfig to every helm invocation.
    #[must_use]
    pub fn with_kubeconfig(mut self, kubeconfig: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(kubeconfig.into());
        self
    }

    /// Builds the helm argument list for a request.
    fn install_args(&self, request: &InstallRequest) -> Result<Vec<OsString>, InstallError> {
        let mut args: Vec<OsString> = vec![
            "upgrade".into(),
            "--install".into(),
            request.release_name.clone().into(),
        ];
        match &request.chart.directory {
            Some(directory) => args.push(directory.clone().into_os_string()),
            None => {
                args.push(request.chart.name.clone().into());
                if let Some(repo_url) = &request.chart.repo_url {
                    push_flag(&mut args, "--repo", repo_url);
                }
                if let Some(version) = &request.chart.version {
                    push_flag(&mut args, "--version", version);
                }
            }
        }
        push_flag(&mut args, "--namespace", &request.release_namespace);
        if request.create_namespace {
            args.push("--create-namespace".into());
        }
        for value in &request.values {
            push_flag(&mut args, "--set", value);
        }
        if !request.namespace_labels.is_empty() {
            let labels = serde_json::to_string(&request.namespace_labels)
                .map_err(|err| InstallError::Failed(err.to_string()))?;
            push_flag(&mut args, "--set-json", format!("namespaceLabels={labels}"));
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            push_flag(&mut args, "--kubeconfig", kubeconfig);
        }
        Ok(args)
    }
}

#[async_trait]
impl ReleaseInstaller for HelmReleaseInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<(), InstallError> {
        let args = self.install_args(request)?;
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                InstallError::Unavailable(format!("{}: {err}", self.binary.display()))
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = tail_utf8(&output.stderr, MAX_STDERR_BYTES);
        let detail = if stderr.is_empty() { output.status.to_string() } else { stderr };
        Err(InstallError::Failed(format!("release {}: {detail}", request.release_name)))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends a flag and its value.
fn push_flag(args: &mut Vec<OsString>, flag: &str, value: impl Into<OsString>) {
    args.push(flag.into());
    args.push(value.into());
}

/// Returns at most `limit` trailing bytes of output as trimmed text.
fn tail_utf8(bytes: &[u8], limit: usize) -> String {
    let start = bytes.len().saturating_sub(limit);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
