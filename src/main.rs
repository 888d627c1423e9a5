//! Binary entry point for the burrow CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use burrow::tunnel::{AccountCredentials, ObfsproxyOptions, WireguardOptions};
use burrow::{
    Authenticated, BurrowConfig, ConfigError, CreateTunnel, Credentials, ProtocolError,
    RebuildTunnel, TracingSink, TunnelRequest, TunnelSettings, handle_request,
};

mod cli;

use cli::{Cli, Command, TunnelArgs};

const DEFAULT_FILTER: &str = "burrow=info,warn";
const VERBOSE_FILTER: &str = "burrow=debug,warn";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("unable to encode response: {0}")]
    Encode(#[from] ProtocolError),
    #[error("unable to write response: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs the requested operation and prints the reply. Returns whether the
/// operation succeeded.
async fn run(cli: Cli) -> Result<bool, CliError> {
    let config = BurrowConfig::load_without_cli_args()?;
    config.validate()?;

    let request = request_from(cli.access_token, cli.command);
    let response = handle_request(&config, TracingSink, &request).await;
    let payload = response.encode()?;
    write_response(io::stdout().lock(), &payload)?;
    Ok(response.is_success())
}

fn request_from(access_token: Option<String>, command: Command) -> TunnelRequest {
    let auth = Credentials::new(access_token.unwrap_or_default());
    match command {
        Command::Create(args) => TunnelRequest::Create(CreateTunnel {
            auth,
            plan: args.plan,
            region: args.region,
            tunnel: tunnel_settings(args.tunnel),
        }),
        Command::Rebuild(args) => TunnelRequest::Rebuild(RebuildTunnel {
            auth,
            tunnel: tunnel_settings(args.tunnel),
        }),
        Command::Destroy => TunnelRequest::Destroy(Authenticated { auth }),
        Command::Status => TunnelRequest::Status(Authenticated { auth }),
        Command::ListInstances => TunnelRequest::ListInstances(Authenticated { auth }),
        Command::ListPlans => TunnelRequest::ListPlans(Authenticated { auth }),
        Command::ListRegions => TunnelRequest::ListRegions(Authenticated { auth }),
        Command::ListImages => TunnelRequest::ListImages(Authenticated { auth }),
        Command::ListScripts => TunnelRequest::ListScripts(Authenticated { auth }),
    }
}

fn tunnel_settings(args: TunnelArgs) -> TunnelSettings {
    let wireguard = args.wireguard_port.map(|port| WireguardOptions {
        port,
        server_key: args.wireguard_key.unwrap_or_default(),
        peer_keys: args.wireguard_peers,
    });
    TunnelSettings {
        account: AccountCredentials {
            name: args.account_name,
            password: args.account_password,
        },
        root_password: args.root_password,
        ssh_keys: args.ssh_keys,
        wireguard,
        obfs4: obfsproxy(args.obfs4_port, args.obfs4_secret),
        obfs6: obfsproxy(args.obfs6_port, args.obfs6_secret),
    }
}

fn obfsproxy(port: Option<u16>, secret: Option<String>) -> Option<ObfsproxyOptions> {
    port.map(|listen| ObfsproxyOptions {
        port: listen,
        secret: secret.unwrap_or_default(),
    })
}

fn write_response(mut target: impl Write, payload: &[u8]) -> Result<(), CliError> {
    target
        .write_all(payload)
        .and_then(|()| target.write_all(b"\n"))
        .and_then(|()| target.flush())
        .map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
