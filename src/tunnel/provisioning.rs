//! Provisioning script lookup and parameter assembly.
//!
//! The tunnel node is configured at boot by a provisioning script owned by
//! the account. The script is found by label, and its user-defined fields
//! are filled from [`TunnelSettings`]. Every optional feature always emits
//! its enable flag; the feature's own fields follow only when it is on.

use serde::Deserialize;

use crate::backend::{ControlPlane, ScriptData};
use crate::events::{EventSink, TunnelEvent};
use crate::linode::StackScript;

use super::TunnelError;

const UDF_USER_NAME: &str = "udf_local_user_name";
const UDF_USER_PASSWORD: &str = "udf_local_user_password";
const UDF_ENABLE_WIREGUARD: &str = "udf_enable_wireguard";
const UDF_WIREGUARD_PORT: &str = "udf_wireguard_port";
const UDF_WIREGUARD_PRIVATE_KEY: &str = "udf_wireguard_private_key";
const UDF_WIREGUARD_PEER_KEYS: &str = "udf_wireguard_peer_keys";
const UDF_ENABLE_OBFS4: &str = "udf_enable_obfs4";
const UDF_OBFS4_PORT: &str = "udf_obfs4_port";
const UDF_OBFS4_SECRET: &str = "udf_obfs4_secret";
const UDF_ENABLE_OBFS6: &str = "udf_enable_obfs6";
const UDF_OBFS6_PORT: &str = "udf_obfs6_port";
const UDF_OBFS6_SECRET: &str = "udf_obfs6_secret";

/// Regular (non-root) account created on the node.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct AccountCredentials {
    /// Account name.
    #[serde(default)]
    pub name: String,
    /// Account password.
    #[serde(default)]
    pub password: String,
}

/// WireGuard relay settings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct WireguardOptions {
    /// UDP port the relay listens on.
    pub port: u16,
    /// Server private key.
    pub server_key: String,
    /// Public keys of the peers allowed to connect.
    #[serde(default)]
    pub peer_keys: Vec<String>,
}

/// Obfuscating proxy settings, shared by the IPv4 and IPv6 variants.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ObfsproxyOptions {
    /// TCP port the proxy listens on.
    pub port: u16,
    /// Shared secret.
    pub secret: String,
}

/// Caller-supplied configuration of the tunnel node.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct TunnelSettings {
    /// Regular account created on the node.
    #[serde(default)]
    pub account: AccountCredentials,
    /// Root password for the instance.
    #[serde(default)]
    pub root_password: String,
    /// SSH public keys authorized for root.
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    /// WireGuard relay, when enabled.
    #[serde(default)]
    pub wireguard: Option<WireguardOptions>,
    /// IPv4 obfuscating proxy, when enabled.
    #[serde(default)]
    pub obfs4: Option<ObfsproxyOptions>,
    /// IPv6 obfuscating proxy, when enabled.
    #[serde(default)]
    pub obfs6: Option<ObfsproxyOptions>,
}

impl ScriptData {
    /// Maps tunnel settings onto the provisioning script's fields.
    #[must_use]
    pub fn for_tunnel(settings: &TunnelSettings) -> Self {
        let mut data = Self::new();
        data.insert(UDF_USER_NAME, settings.account.name.as_str());
        data.insert(UDF_USER_PASSWORD, settings.account.password.as_str());

        data.insert(UDF_ENABLE_WIREGUARD, u8::from(settings.wireguard.is_some()));
        if let Some(wireguard) = &settings.wireguard {
            data.insert(UDF_WIREGUARD_PORT, wireguard.port);
            data.insert(UDF_WIREGUARD_PRIVATE_KEY, wireguard.server_key.as_str());
            data.insert(UDF_WIREGUARD_PEER_KEYS, wireguard.peer_keys.join(" "));
        }

        data.insert(UDF_ENABLE_OBFS4, u8::from(settings.obfs4.is_some()));
        if let Some(obfs4) = &settings.obfs4 {
            data.insert(UDF_OBFS4_PORT, obfs4.port);
            data.insert(UDF_OBFS4_SECRET, obfs4.secret.as_str());
        }

        data.insert(UDF_ENABLE_OBFS6, u8::from(settings.obfs6.is_some()));
        if let Some(obfs6) = &settings.obfs6 {
            data.insert(UDF_OBFS6_PORT, obfs6.port);
            data.insert(UDF_OBFS6_SECRET, obfs6.secret.as_str());
        }
        data
    }
}

/// Script reference and parameters handed to a create or rebuild spec.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Provisioning {
    /// Selected script.
    pub script: StackScript,
    /// Parameters for the script's user-defined fields.
    pub data: ScriptData,
}

/// Finds the account's script labelled `label`.
///
/// When several scripts share the label the last one listed is used and a
/// [`TunnelEvent::DuplicateScript`] warning is emitted.
///
/// # Errors
///
/// Returns [`TunnelError::Provider`] when listing fails and
/// [`TunnelError::ScriptMissing`] when no script carries the label.
pub async fn resolve_script<P, E>(
    plane: &P,
    sink: &E,
    label: &str,
) -> Result<StackScript, TunnelError>
where
    P: ControlPlane,
    E: EventSink,
{
    let scripts = plane.list_scripts().await?;
    let mut matches: Vec<StackScript> = scripts
        .into_iter()
        .filter(|script| script.label == label)
        .collect();
    let count = matches.len();
    let selected = matches.pop().ok_or_else(|| TunnelError::ScriptMissing {
        label: label.to_owned(),
    })?;

    if count > 1 {
        sink.emit(TunnelEvent::DuplicateScript {
            label: label.to_owned(),
            count,
            selected: selected.id,
        });
    }
    Ok(selected)
}

/// Resolves the script and assembles its parameters.
///
/// # Errors
///
/// Propagates [`resolve_script`] failures.
pub async fn provisioning_for<P, E>(
    plane: &P,
    sink: &E,
    label: &str,
    settings: &TunnelSettings,
) -> Result<Provisioning, TunnelError>
where
    P: ControlPlane,
    E: EventSink,
{
    let script = resolve_script(plane, sink, label).await?;
    Ok(Provisioning {
        script,
        data: ScriptData::for_tunnel(settings),
    })
}
