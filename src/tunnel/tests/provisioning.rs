//! Tests for provisioning script lookup and parameter assembly.

use rstest::rstest;
use serde_json::json;

use super::{SCRIPT_LABEL, empty_account, settings};
use crate::backend::ScriptData;
use crate::events::TunnelEvent;
use crate::test_support::{RecordingSink, ScriptedPlane, script};
use crate::tunnel::{ObfsproxyOptions, TunnelError, TunnelSettings, resolve_script};

#[rstest]
fn disabled_feature_emits_only_its_flag(settings: TunnelSettings) {
    let input = TunnelSettings {
        wireguard: None,
        ..settings
    };
    let data = ScriptData::for_tunnel(&input);

    assert_eq!(data.get("udf_enable_wireguard"), Some(&json!(0)));
    assert!(!data.contains_key("udf_wireguard_port"));
    assert!(!data.contains_key("udf_wireguard_private_key"));
    assert!(!data.contains_key("udf_wireguard_peer_keys"));

    assert_eq!(data.get("udf_enable_obfs4"), Some(&json!(1)));
    assert_eq!(data.get("udf_obfs4_port"), Some(&json!(443)));
    assert_eq!(data.get("udf_obfs4_secret"), Some(&json!("obfs4-secret")));

    assert_eq!(data.get("udf_enable_obfs6"), Some(&json!(0)));
    assert!(!data.contains_key("udf_obfs6_port"));
}

#[rstest]
fn enabled_wireguard_joins_peer_keys(settings: TunnelSettings) {
    let data = ScriptData::for_tunnel(&settings);
    assert_eq!(data.get("udf_local_user_name"), Some(&json!("alice")));
    assert_eq!(data.get("udf_local_user_password"), Some(&json!("correct horse")));
    assert_eq!(data.get("udf_enable_wireguard"), Some(&json!(1)));
    assert_eq!(data.get("udf_wireguard_port"), Some(&json!(51820)));
    assert_eq!(
        data.get("udf_wireguard_private_key"),
        Some(&json!("server-private-key"))
    );
    assert_eq!(data.get("udf_wireguard_peer_keys"), Some(&json!("peer-a peer-b")));
}

#[rstest]
fn toggling_a_feature_back_on_reproduces_the_map(settings: TunnelSettings) {
    let baseline = ScriptData::for_tunnel(&settings);
    let obfs6 = ObfsproxyOptions {
        port: 8443,
        secret: String::from("obfs6-secret"),
    };

    let switched_on = TunnelSettings {
        obfs6: Some(obfs6.clone()),
        ..settings
    };
    let switched_off = TunnelSettings {
        obfs6: None,
        ..switched_on.clone()
    };
    let switched_back = TunnelSettings {
        obfs6: Some(obfs6),
        ..switched_off.clone()
    };

    let enabled = ScriptData::for_tunnel(&switched_on);
    assert_ne!(enabled, baseline);
    assert_eq!(enabled.get("udf_obfs6_secret"), Some(&json!("obfs6-secret")));
    assert_eq!(ScriptData::for_tunnel(&switched_off), baseline);
    assert_eq!(ScriptData::for_tunnel(&switched_back), enabled);
}

#[test]
fn empty_settings_still_emit_every_flag() {
    let data = ScriptData::for_tunnel(&TunnelSettings::default());
    let keys: Vec<&str> = data.iter().map(|(key, _)| key).collect();
    assert_eq!(
        keys,
        [
            "udf_enable_obfs4",
            "udf_enable_obfs6",
            "udf_enable_wireguard",
            "udf_local_user_name",
            "udf_local_user_password",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn resolves_exact_label(empty_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    let found = resolve_script(&empty_account, &sink, SCRIPT_LABEL)
        .await
        .unwrap_or_else(|err| panic!("script should resolve: {err}"));
    assert_eq!(found.id, 42);
    assert!(sink.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn duplicate_labels_pick_the_last_and_warn(empty_account: ScriptedPlane) {
    empty_account.add_script(script(43, SCRIPT_LABEL));
    let sink = RecordingSink::new();

    let found = resolve_script(&empty_account, &sink, SCRIPT_LABEL)
        .await
        .unwrap_or_else(|err| panic!("script should resolve: {err}"));

    assert_eq!(found.id, 43);
    assert_eq!(
        sink.events(),
        [TunnelEvent::DuplicateScript {
            label: SCRIPT_LABEL.to_owned(),
            count: 2,
            selected: 43,
        }]
    );
}

#[rstest]
#[tokio::test]
async fn missing_script_is_reported_by_label(empty_account: ScriptedPlane) {
    let sink = RecordingSink::new();
    let err = resolve_script(&empty_account, &sink, "burrow_node_v2")
        .await
        .expect_err("label should not match");
    assert_eq!(
        err,
        TunnelError::ScriptMissing {
            label: String::from("burrow_node_v2")
        }
    );
}
