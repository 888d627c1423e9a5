//! Wire types for the Linode v4 API.
//!
//! Every record here is owned by the provider; the engine only ever holds a
//! transient, possibly stale copy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier assigned to a Linode instance.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wraps a raw provider identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw provider identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state reported by the provider.
///
/// Transitions are provider-driven; the engine only waits for `Running`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Powered off.
    Offline,
    /// Booting.
    Booting,
    /// Running.
    Running,
    /// Shutting down.
    ShuttingDown,
    /// Rebooting.
    Rebooting,
    /// Being provisioned.
    Provisioning,
    /// Being deleted.
    Deleting,
    /// Being migrated between hosts.
    Migrating,
    /// Being restored from a backup.
    Restoring,
    /// Being rebuilt from an image.
    Rebuilding,
    /// Being cloned.
    Cloning,
    /// A state this crate does not know about yet.
    #[default]
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Returns the provider's spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Booting => "booting",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Rebooting => "rebooting",
            Self::Provisioning => "provisioning",
            Self::Deleting => "deleting",
            Self::Migrating => "migrating",
            Self::Restoring => "restoring",
            Self::Rebuilding => "rebuilding",
            Self::Cloning => "cloning",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources allotted to an instance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceSpecs {
    /// Disk size in MB.
    #[serde(default)]
    pub disk: u64,
    /// Memory in MB.
    #[serde(default)]
    pub memory: u64,
    /// Virtual CPU count.
    #[serde(default)]
    pub vcpus: u32,
    /// Monthly network transfer allowance in GB.
    #[serde(default)]
    pub transfer: u64,
}

/// A single Linode instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instance {
    /// Provider identifier.
    pub id: InstanceId,
    /// Human-readable label; the tunnel role is encoded as its prefix.
    pub label: String,
    /// Display group.
    #[serde(default)]
    pub group: String,
    /// Region the instance lives in.
    #[serde(default)]
    pub region: String,
    /// Plan (the provider calls it `type`).
    #[serde(rename = "type", default)]
    pub plan: String,
    /// Image the instance was deployed from, when known.
    #[serde(default)]
    pub image: Option<String>,
    /// Current lifecycle state.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Public and private IPv4 addresses.
    #[serde(default)]
    pub ipv4: Vec<String>,
    /// SLAAC IPv6 address.
    #[serde(default)]
    pub ipv6: Option<String>,
    /// Creation timestamp.
    #[serde(rename = "created", default)]
    pub created_at: String,
    /// Last update timestamp.
    #[serde(rename = "updated", default)]
    pub updated_at: String,
    /// Hypervisor tag (for example `kvm`).
    #[serde(default)]
    pub hypervisor: String,
    /// Allotted resources.
    #[serde(default)]
    pub specs: InstanceSpecs,
}

/// A provisioning script (StackScript).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StackScript {
    /// Provider identifier.
    pub id: u64,
    /// Label used as the lookup key.
    pub label: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Images the script is compatible with.
    #[serde(default)]
    pub images: Vec<String>,
    /// Whether the script is visible to other accounts.
    #[serde(default)]
    pub is_public: bool,
}

/// Hourly and monthly plan pricing.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PlanPrice {
    /// Hourly price in USD.
    #[serde(default)]
    pub hourly: f64,
    /// Monthly price in USD.
    #[serde(default)]
    pub monthly: f64,
}

/// An instance plan from the public catalog.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Plan {
    /// Plan identifier (for example `g6-nanode-1`).
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Disk size in MB.
    #[serde(default)]
    pub disk: u64,
    /// Memory in MB.
    #[serde(default)]
    pub memory: u64,
    /// Monthly network transfer allowance in GB.
    #[serde(default)]
    pub transfer: u64,
    /// Outbound bandwidth in Mbit/s.
    #[serde(default)]
    pub network_out: u64,
    /// Virtual CPU count.
    #[serde(default)]
    pub vcpus: u32,
    /// Pricing.
    #[serde(default)]
    pub price: PlanPrice,
}

/// A geographic region from the public catalog.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Region {
    /// Region identifier (for example `eu-central`).
    pub id: String,
    /// ISO country code.
    #[serde(default)]
    pub country: String,
}

/// A deployable image.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Image {
    /// Image identifier (for example `linode/debian12`).
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the image is public.
    #[serde(default)]
    pub is_public: bool,
    /// Size in MB.
    #[serde(default)]
    pub size: u64,
    /// Creator of the image.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Creation timestamp.
    #[serde(rename = "created", default)]
    pub created_at: String,
    /// Distribution vendor.
    #[serde(default)]
    pub vendor: Option<String>,
    /// Whether the image is deprecated.
    #[serde(default)]
    pub deprecated: bool,
}

/// Envelope returned by every list endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// One-based number of this page, as echoed by the provider.
    ///
    /// Informational only; the cursor keeps its own counter.
    #[serde(default)]
    pub page: u32,
    /// Total number of pages.
    #[serde(default)]
    pub pages: u32,
    /// Total number of results across all pages.
    #[serde(default)]
    pub results: u64,
}

/// The page-envelope contract consumed by [`super::PageCursor`].
pub trait Paginated {
    /// Item type carried by each page.
    type Item;

    /// Total number of pages reported by the provider.
    fn page_count(&self) -> u32;

    /// Consumes the envelope, yielding the items on this page.
    fn into_items(self) -> Vec<Self::Item>;
}

impl<T> Paginated for Page<T> {
    type Item = T;

    fn page_count(&self) -> u32 {
        self.pages
    }

    fn into_items(self) -> Vec<T> {
        self.data
    }
}
