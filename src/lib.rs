//! Core library for the burrow tunnel provisioner.
//!
//! The crate drives the lifecycle of a single tunnel node on Linode
//! (create → wait for `running` → rebuild or destroy) behind a control-plane
//! abstraction, and exposes the catalog listings a client needs to pick a
//! plan, region and image.

pub mod backend;
pub mod config;
pub mod events;
pub mod linode;
pub mod protocol;
pub mod test_support;
pub mod tunnel;

pub use backend::{
    ControlPlane, InstanceSpec, InstanceSpecBuilder, RebuildSpec, RebuildSpecBuilder, ScriptData,
    SpecError,
};
pub use config::{BurrowConfig, ConfigError};
pub use events::{EventSink, InstanceSummary, TracingSink, TunnelEvent};
pub use linode::{ApiSettings, LinodeApi, LinodeError};
pub use protocol::{
    Authenticated, CreateTunnel, Credentials, ErrorClass, ErrorReport, Operation, Outcome,
    ProtocolError, RebuildTunnel, TunnelRequest, TunnelResponse,
};
pub use tunnel::service::{handle_payload, handle_request};
pub use tunnel::{
    ConvergencePolicy, TunnelDefaults, TunnelError, TunnelOrchestrator, TunnelSettings,
};
