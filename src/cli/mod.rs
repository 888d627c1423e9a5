//! Command-line interface definitions for the `burrow` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `burrow` binary.
#[derive(Debug, Parser)]
#[command(
    name = "burrow",
    about = "Provision and manage a single Linode tunnel node",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,
    /// Linode personal access token for this invocation.
    ///
    /// Overrides the `access_token` configured in `burrow.toml` or
    /// `BURROW_ACCESS_TOKEN`.
    #[arg(long, value_name = "TOKEN", global = true)]
    pub(crate) access_token: Option<String>,
    /// Operation to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Lifecycle and catalog operations.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create the tunnel node and wait for it to run.
    Create(CreateCommand),
    /// Reinstall the tunnel node in place and wait for it to run.
    Rebuild(RebuildCommand),
    /// Delete the tunnel node.
    Destroy,
    /// Show the tunnel node.
    Status,
    /// List every instance on the account.
    ListInstances,
    /// List instance plans.
    ListPlans,
    /// List regions.
    ListRegions,
    /// List deployable images.
    ListImages,
    /// List the account's provisioning scripts.
    ListScripts,
}

/// Arguments for `burrow create`.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Plan (instance type) identifier, for example `g6-nanode-1`.
    #[arg(long, value_name = "PLAN")]
    pub(crate) plan: String,
    /// Region identifier, for example `eu-central`.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: String,
    /// Node configuration.
    #[command(flatten)]
    pub(crate) tunnel: TunnelArgs,
}

/// Arguments for `burrow rebuild`.
#[derive(Debug, Args)]
pub(crate) struct RebuildCommand {
    /// Node configuration.
    #[command(flatten)]
    pub(crate) tunnel: TunnelArgs,
}

/// Node configuration handed to the provisioning script.
///
/// A relay is enabled by giving its port; the matching key or secret is then
/// required.
#[derive(Debug, Default, Args)]
pub(crate) struct TunnelArgs {
    /// Name of the regular account created on the node.
    #[arg(long, value_name = "NAME", default_value = "")]
    pub(crate) account_name: String,
    /// Password of the regular account.
    #[arg(long, value_name = "PASSWORD", default_value = "")]
    pub(crate) account_password: String,
    /// Root password for the instance.
    #[arg(long, value_name = "PASSWORD", default_value = "")]
    pub(crate) root_password: String,
    /// SSH public key authorized for root; repeat for several keys.
    #[arg(long = "ssh-key", value_name = "KEY")]
    pub(crate) ssh_keys: Vec<String>,
    /// Enable the WireGuard relay on this UDP port.
    #[arg(long, value_name = "PORT", requires = "wireguard_key")]
    pub(crate) wireguard_port: Option<u16>,
    /// WireGuard server private key.
    #[arg(long, value_name = "KEY", requires = "wireguard_port")]
    pub(crate) wireguard_key: Option<String>,
    /// Public key of a WireGuard peer; repeat for several peers.
    #[arg(long = "wireguard-peer", value_name = "KEY", requires = "wireguard_port")]
    pub(crate) wireguard_peers: Vec<String>,
    /// Enable the IPv4 obfuscating proxy on this TCP port.
    #[arg(long, value_name = "PORT", requires = "obfs4_secret")]
    pub(crate) obfs4_port: Option<u16>,
    /// IPv4 obfuscating proxy secret.
    #[arg(long, value_name = "SECRET", requires = "obfs4_port")]
    pub(crate) obfs4_secret: Option<String>,
    /// Enable the IPv6 obfuscating proxy on this TCP port.
    #[arg(long, value_name = "PORT", requires = "obfs6_secret")]
    pub(crate) obfs6_port: Option<u16>,
    /// IPv6 obfuscating proxy secret.
    #[arg(long, value_name = "SECRET", requires = "obfs6_port")]
    pub(crate) obfs6_secret: Option<String>,
}
