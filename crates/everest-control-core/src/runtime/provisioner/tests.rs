// everest-control-core/src/runtime/provisioner/tests.rs
// ============================================================================
// Module: Namespace Provisioner Unit Tests
// Description: Release value ordering and step descriptions.
// Purpose: Pin the installer-facing values and operator-facing labels.
// Dependencies: super
// ============================================================================

use super::release_values;
use super::step_description;
use crate::core::NamespaceName;
use crate::core::OperatorSelection;
use crate::core::ProvisionMode;

#[test]
fn release_values_keep_fixed_order() {
    let operators = OperatorSelection {
        pxc: true,
        psmdb: false,
        pg: true,
    };
    assert_eq!(
        release_values(operators, false),
        vec![
            "cleanupOnUninstall=false",
            "pxc=true",
            "postgresql=true",
            "psmdb=false",
            "telemetry=true",
        ]
    );
}

#[test]
fn release_values_invert_telemetry_flag() {
    let values = release_values(OperatorSelection::all(), true);
    assert_eq!(values.last().map(String::as_str), Some("telemetry=false"));
}

#[test]
fn step_descriptions_follow_mode() {
    let namespace = NamespaceName::new("db1");
    assert_eq!(
        step_description(
            ProvisionMode::Install {
                take_ownership: true
            },
            &namespace
        ),
        "Installing namespace 'db1'"
    );
    assert_eq!(step_description(ProvisionMode::Update, &namespace), "Updating namespace 'db1'");
}
