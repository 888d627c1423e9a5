//! Unit tests for tunnel orchestration.

use std::time::Duration;

use rstest::fixture;

use super::{
    AccountCredentials, ConvergencePolicy, ObfsproxyOptions, TunnelOrchestrator, TunnelSettings,
    WireguardOptions,
};
use crate::linode::{FieldError, InstanceStatus, LinodeError, ProviderError};
use crate::test_support::{RecordingSink, ScriptedPlane, instance, script};

mod guard;
mod provisioning;

const PREFIX: &str = "burrow_tunnel";
const SCRIPT_LABEL: &str = "burrow_node";

type Orchestrator = TunnelOrchestrator<ScriptedPlane, RecordingSink>;

fn quick_policy() -> ConvergencePolicy {
    ConvergencePolicy::new(Duration::ZERO, 3)
}

fn orchestrator(plane: &ScriptedPlane, sink: &RecordingSink) -> Orchestrator {
    TunnelOrchestrator::new(plane.clone(), sink.clone()).with_policy(quick_policy())
}

/// Plane with the provisioning script and no tunnel instance.
#[fixture]
fn empty_account() -> ScriptedPlane {
    let plane = ScriptedPlane::new();
    plane.add_instance(instance(7, "web-frontend", InstanceStatus::Running));
    plane.add_script(script(11, "unrelated"));
    plane.add_script(script(42, SCRIPT_LABEL));
    plane
}

/// Plane with the provisioning script and one running tunnel instance.
#[fixture]
fn tunnelled_account() -> ScriptedPlane {
    let plane = empty_account();
    plane.add_instance(instance(55, "burrow_tunnel-1a2b3c4d", InstanceStatus::Running));
    plane
}

#[fixture]
fn settings() -> TunnelSettings {
    TunnelSettings {
        account: AccountCredentials {
            name: String::from("alice"),
            password: String::from("correct horse"),
        },
        root_password: String::from("r00t-Password!"),
        ssh_keys: vec![String::from("ssh-ed25519 AAAAC3Nza alice@laptop")],
        wireguard: Some(WireguardOptions {
            port: 51820,
            server_key: String::from("server-private-key"),
            peer_keys: vec![String::from("peer-a"), String::from("peer-b")],
        }),
        obfs4: Some(ObfsproxyOptions {
            port: 443,
            secret: String::from("obfs4-secret"),
        }),
        obfs6: None,
    }
}

fn provider_error(status: u16, reason: &str) -> LinodeError {
    LinodeError::Provider(ProviderError {
        errors: vec![FieldError {
            field: String::new(),
            reason: reason.to_owned(),
        }],
        status,
    })
}
