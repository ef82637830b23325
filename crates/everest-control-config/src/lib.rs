// everest-control-config/src/lib.rs
// ============================================================================
// Module: Everest Control Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for everest-control.toml semantics.
// Dependencies: everest-control-core, serde, toml
// ============================================================================

//! ## Overview
//! `everest-control-config` defines the configuration model for the Everest
//! control plane. Loading is strict and fail-closed: the file is size-limited,
//! must be UTF-8, and every section is validated before the config is handed
//! out. The RBAC section is compiled into a core [`everest_control_core::Policy`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
