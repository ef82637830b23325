// everest-control-core/src/core/constants.rs
// ============================================================================
// Module: Everest Constants
// Description: Fixed names shared with the platform's cluster components.
// Purpose: Keep reserved namespaces, ownership labels, and chart names in one place.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Constants that must agree with what the platform installs into the
//! cluster. Changing any of them changes what counts as a reserved or
//! managed namespace.

/// Namespace where the platform's own control plane runs.
pub const SYSTEM_NAMESPACE: &str = "everest-system";
/// Namespace where monitoring configuration is created.
pub const MONITORING_NAMESPACE: &str = "everest-monitoring";
/// Namespace owned by the operator lifecycle manager.
pub const OLM_NAMESPACE: &str = "everest-olm";
/// Namespaces that may never be provisioned as database namespaces.
pub const RESERVED_NAMESPACES: [&str; 3] = [SYSTEM_NAMESPACE, MONITORING_NAMESPACE, OLM_NAMESPACE];

/// Label key identifying the manager of a cluster resource.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Label value identifying this platform as manager.
pub const MANAGED_BY_VALUE: &str = "everest";

/// Reserved role that bypasses every permission check.
pub const ADMIN_ROLE: &str = "admin";
/// Wildcard sentinel for a single object-pattern segment.
pub const WILDCARD: &str = "*";

/// Chart name of the per-namespace database release.
pub const DB_NAMESPACE_CHART_NAME: &str = "everest-db-namespace";
/// Sub-chart location relative to a local checkout of the main chart.
pub const DB_NAMESPACE_SUBCHART_PATH: &str = "charts/everest-db-namespace";

/// Label on restore objects naming the database cluster they restore.
pub const RESTORE_CLUSTER_LABEL: &str = "clusterName";
