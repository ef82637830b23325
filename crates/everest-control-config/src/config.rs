// everest-control-config/src/config.rs
// ============================================================================
// Module: Everest Control Configuration
// Description: Configuration loading and validation for the control plane.
// Purpose: Provide strict, fail-closed config parsing with RBAC compilation.
// Dependencies: everest-control-core, serde, toml, url
// ============================================================================

//! ## Overview
//! This module loads `everest-control.toml`, applies defaults, and validates
//! every section. Validation is fail-closed: unknown resource types and
//! actions, malformed object patterns, dangling role bindings, and
//! out-of-range timeouts are rejected before anything talks to a cluster.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use everest_control_core::Action;
use everest_control_core::ChartRef;
use everest_control_core::ObjectPattern;
use everest_control_core::Permission;
use everest_control_core::Policy;
use everest_control_core::ResourceType;
use everest_control_core::Role;
use everest_control_core::RoleName;
use everest_control_core::SubjectId;
use everest_control_core::core::constants::DB_NAMESPACE_CHART_NAME;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default config file name.
pub(crate) const DEFAULT_CONFIG_NAME: &str = "everest-control.toml";
/// Environment variable for config path.
pub(crate) const CONFIG_ENV_VAR: &str = "EVEREST_CONTROL_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of role definitions.
pub(crate) const MAX_ROLES: usize = 1024;
/// Maximum number of subject bindings.
pub(crate) const MAX_BINDINGS: usize = 4096;

/// Default cluster API URL when running inside a cluster.
pub(crate) const DEFAULT_CLUSTER_API_URL: &str = "https://kubernetes.default.svc";
/// Default cluster connect timeout in milliseconds.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Default cluster request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum cluster connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum cluster connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Minimum cluster request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum cluster request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;

/// Default helm binary, resolved through `PATH`.
pub(crate) const DEFAULT_HELM_BINARY: &str = "helm";
/// Default chart repository.
pub(crate) const DEFAULT_CHART_REPO_URL: &str = "https://percona.github.io/percona-helm-charts/";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Everest control plane configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EverestControlConfig {
    /// Role-based access control.
    #[serde(default)]
    pub rbac: RbacConfig,
    /// Cluster API connection.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Release installer.
    #[serde(default)]
    pub installer: InstallerConfig,
    /// Audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EverestControlConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from the argument, then `EVEREST_CONTROL_CONFIG`,
    /// then `everest-control.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rbac.validate()?;
        self.cluster.validate()?;
        self.installer.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: RBAC
// ============================================================================

/// Role-based access control configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RbacConfig {
    /// Enforce the policy; `false` permits every request.
    #[serde(default = "default_rbac_enabled")]
    pub enabled: bool,
    /// Role definitions.
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    /// Subject to role bindings.
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            enabled: default_rbac_enabled(),
            roles: Vec::new(),
            bindings: Vec::new(),
        }
    }
}

/// One role definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    /// Role name.
    pub name: String,
    /// Ordered permission tuples.
    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
}

/// One permission tuple as written in config.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionConfig {
    /// Resource type, e.g. `database-clusters`.
    pub resource: String,
    /// Action, e.g. `read`.
    pub action: String,
    /// Object pattern `namespace/name`; either segment may be `*`.
    pub object: String,
}

/// Binding of one subject to role names.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    /// Subject identifier.
    pub subject: String,
    /// Role names, in binding order.
    pub roles: Vec<String>,
}

impl RbacConfig {
    /// Validates RBAC configuration by compiling it.
    fn validate(&self) -> Result<(), ConfigError> {
        self.to_policy().map(|_| ())
    }

    /// Compiles the configured roles and bindings into a policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown resource types or actions,
    /// malformed object patterns, empty names, duplicate roles, or bindings
    /// to undefined roles.
    pub fn to_policy(&self) -> Result<Policy, ConfigError> {
        if self.roles.len() > MAX_ROLES {
            return Err(ConfigError::Invalid(format!("rbac.roles exceeds {MAX_ROLES} entries")));
        }
        if self.bindings.len() > MAX_BINDINGS {
            return Err(ConfigError::Invalid(format!(
                "rbac.bindings exceeds {MAX_BINDINGS} entries"
            )));
        }
        let roles = self.roles.iter().map(RoleConfig::to_role).collect::<Result<Vec<_>, _>>()?;
        let mut bindings = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let subject = binding.subject.trim();
            if subject.is_empty() {
                return Err(ConfigError::Invalid(
                    "rbac.bindings.subject must be non-empty".to_string(),
                ));
            }
            if binding.roles.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "rbac binding for '{subject}' names no roles"
                )));
            }
            let role_names = binding.roles.iter().map(|role| RoleName::new(role.trim())).collect();
            bindings.push((SubjectId::new(subject), role_names));
        }
        Policy::new(roles, bindings).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

impl RoleConfig {
    /// Converts the role definition into a core role.
    fn to_role(&self) -> Result<Role, ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("rbac.roles.name must be non-empty".to_string()));
        }
        let permissions = self
            .permissions
            .iter()
            .map(|permission| permission.to_permission(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Role::new(name, permissions))
    }
}

impl PermissionConfig {
    /// Converts the tuple into a core permission.
    fn to_permission(&self, role: &str) -> Result<Permission, ConfigError> {
        let resource = ResourceType::parse(self.resource.trim()).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "role '{role}': unknown resource type '{}'",
                self.resource
            ))
        })?;
        let action = Action::parse(self.action.trim()).ok_or_else(|| {
            ConfigError::Invalid(format!("role '{role}': unknown action '{}'", self.action))
        })?;
        let object: ObjectPattern = self
            .object
            .trim()
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("role '{role}': {err}")))?;
        Ok(Permission::new(resource, action, object))
    }
}

// ============================================================================
// SECTION: Cluster
// ============================================================================

/// Cluster API connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster API server.
    #[serde(default = "default_cluster_api_url")]
    pub api_url: String,
    /// File holding the bearer token.
    #[serde(default)]
    pub token_file: Option<String>,
    /// PEM bundle of the cluster CA.
    #[serde(default)]
    pub ca_file: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: default_cluster_api_url(),
            token_file: None,
            ca_file: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.api_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("cluster.api_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("cluster.api_url must be http or https".to_string()));
        }
        if let Some(path) = &self.token_file {
            validate_path_string("cluster.token_file", path)?;
        }
        if let Some(path) = &self.ca_file {
            validate_path_string("cluster.ca_file", path)?;
        }
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "cluster.connect_timeout_ms must be between {MIN_CONNECT_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "cluster.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.request_timeout_ms < self.connect_timeout_ms {
            return Err(ConfigError::Invalid(
                "cluster.request_timeout_ms must be >= connect_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ============================================================================
// SECTION: Installer
// ============================================================================

/// Release installer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallerConfig {
    /// Helm binary name or path.
    #[serde(default = "default_helm_binary")]
    pub helm_binary: String,
    /// Kubeconfig passed to helm.
    #[serde(default)]
    pub kubeconfig: Option<String>,
    /// Chart name.
    #[serde(default = "default_chart_name")]
    pub chart_name: String,
    /// Chart version; latest when unset.
    #[serde(default)]
    pub chart_version: Option<String>,
    /// Chart repository URL.
    #[serde(default = "default_chart_repo_url")]
    pub repo_url: Option<String>,
    /// Local checkout of the main chart; overrides the repository.
    #[serde(default)]
    pub chart_dir: Option<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            helm_binary: default_helm_binary(),
            kubeconfig: None,
            chart_name: default_chart_name(),
            chart_version: None,
            repo_url: default_chart_repo_url(),
            chart_dir: None,
        }
    }
}

impl InstallerConfig {
    /// Validates installer configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("installer.helm_binary", &self.helm_binary)?;
        if let Some(path) = &self.kubeconfig {
            validate_path_string("installer.kubeconfig", path)?;
        }
        if self.chart_name.trim().is_empty() {
            return Err(ConfigError::Invalid("installer.chart_name must be non-empty".to_string()));
        }
        if let Some(version) = &self.chart_version
            && version.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "installer.chart_version must be non-empty when set".to_string(),
            ));
        }
        if let Some(repo_url) = &self.repo_url {
            Url::parse(repo_url.trim()).map_err(|err| {
                ConfigError::Invalid(format!("installer.repo_url is invalid: {err}"))
            })?;
        }
        if let Some(path) = &self.chart_dir {
            validate_path_string("installer.chart_dir", path)?;
        }
        Ok(())
    }

    /// Returns the configured chart reference.
    #[must_use]
    pub fn chart_ref(&self) -> ChartRef {
        ChartRef {
            name: self.chart_name.trim().to_string(),
            version: self.chart_version.as_ref().map(|version| version.trim().to_string()),
            repo_url: self.repo_url.as_ref().map(|url| url.trim().to_string()),
            directory: self.chart_dir.as_ref().map(|dir| PathBuf::from(dir.trim())),
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O errors while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// Parsing errors.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation errors.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input or environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default for `rbac.enabled`.
pub(crate) const fn default_rbac_enabled() -> bool {
    true
}

/// Default for `cluster.api_url`.
pub(crate) fn default_cluster_api_url() -> String {
    DEFAULT_CLUSTER_API_URL.to_string()
}

/// Default for `cluster.connect_timeout_ms`.
pub(crate) const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default for `cluster.request_timeout_ms`.
pub(crate) const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default for `installer.helm_binary`.
pub(crate) fn default_helm_binary() -> String {
    DEFAULT_HELM_BINARY.to_string()
}

/// Default for `installer.chart_name`.
pub(crate) fn default_chart_name() -> String {
    DB_NAMESPACE_CHART_NAME.to_string()
}

/// Default for `installer.repo_url`.
#[allow(clippy::unnecessary_wraps, reason = "Serde default must match the field type.")]
pub(crate) fn default_chart_repo_url() -> Option<String> {
    Some(DEFAULT_CHART_REPO_URL.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
