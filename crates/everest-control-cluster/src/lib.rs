// everest-control-cluster/src/lib.rs
// ============================================================================
// Module: Everest Control Cluster Library
// Description: Production backends for the cluster and release interfaces.
// Purpose: Talk to the cluster API server and drive the helm binary.
// Dependencies: everest-control-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`KubeClusterClient`] implements [`everest_control_core::ClusterClient`]
//! over the cluster REST API. [`HelmReleaseInstaller`] implements
//! [`everest_control_core::ReleaseInstaller`] by running `helm upgrade
//! --install` as a child process.
//!
//! Security posture: cluster responses and helm output are untrusted; both are
//! size-bounded before they are parsed or surfaced.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod helm;
pub mod kube;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use helm::HelmReleaseInstaller;
pub use kube::KubeClusterClient;
pub use kube::TokenError;
pub use kube::read_ca_file;
pub use kube::read_token_file;
