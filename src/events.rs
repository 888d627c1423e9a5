//! Structured events emitted by the tunnel engine.
//!
//! Engine components never log directly. They describe what happened as a
//! [`TunnelEvent`] and hand it to the [`EventSink`] they were built with.
//! Production code uses [`TracingSink`]; tests capture events with
//! `test_support::RecordingSink`.

use std::sync::Arc;

use crate::linode::{Instance, InstanceId, InstanceStatus};
use crate::protocol::Operation;

/// Identifying fields of an instance snapshot carried by events.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSummary {
    /// Provider identifier.
    pub id: InstanceId,
    /// Instance label.
    pub label: String,
    /// Region the instance lives in.
    pub region: String,
    /// Plan identifier.
    pub plan: String,
    /// Status at the time of the snapshot.
    pub status: InstanceStatus,
    /// IPv4 addresses.
    pub ipv4: Vec<String>,
    /// IPv6 address, when assigned.
    pub ipv6: Option<String>,
}

impl From<&Instance> for InstanceSummary {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id,
            label: instance.label.clone(),
            region: instance.region.clone(),
            plan: instance.plan.clone(),
            status: instance.status,
            ipv4: instance.ipv4.clone(),
            ipv6: instance.ipv6.clone(),
        }
    }
}

/// Something the engine observed or did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TunnelEvent {
    /// A request entered the dispatch path.
    RequestReceived {
        /// Requested operation.
        operation: Operation,
    },
    /// The role guard rejected an operation.
    GuardFailure {
        /// Role label prefix that was looked up.
        prefix: String,
        /// Human-readable reason.
        reason: String,
    },
    /// More than one instance carries the role prefix.
    MultipleTunnels {
        /// Role label prefix that was looked up.
        prefix: String,
        /// Number of matching instances.
        count: usize,
    },
    /// One of several instances matching the role prefix.
    TunnelInstance {
        /// Zero-based position in listing order.
        index: usize,
        /// Snapshot of the matching instance.
        instance: InstanceSummary,
    },
    /// Several provisioning scripts share the requested label.
    DuplicateScript {
        /// Script label.
        label: String,
        /// Number of scripts with that label.
        count: usize,
        /// Identifier of the script that was selected.
        selected: u64,
    },
    /// A create or rebuild was accepted by the provider.
    Submitted {
        /// Operation that submitted the instance.
        operation: Operation,
        /// Snapshot returned by the provider.
        instance: InstanceSummary,
    },
    /// One status poll completed without reaching `running`.
    PollAttempt {
        /// Instance being polled.
        id: InstanceId,
        /// One-based attempt number.
        attempt: u32,
        /// Observed status.
        status: InstanceStatus,
    },
    /// The instance reached `running`.
    InstanceReady {
        /// Snapshot in the `running` state.
        instance: InstanceSummary,
        /// Number of polls it took.
        attempts: u32,
    },
    /// The poll budget ran out before the instance reached `running`.
    ConvergenceTimedOut {
        /// Last snapshot fetched.
        instance: InstanceSummary,
        /// Number of polls performed.
        attempts: u32,
    },
    /// A provider call failed.
    ProviderFailure {
        /// Operation during which the call failed.
        operation: Operation,
        /// Rendered error.
        message: String,
    },
    /// The tunnel instance was deleted.
    InstanceDeleted {
        /// Snapshot of the deleted instance.
        instance: InstanceSummary,
    },
}

/// Receives engine events.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn emit(&self, event: TunnelEvent);
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: TunnelEvent) {
        (**self).emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: TunnelEvent) {
        (**self).emit(event);
    }
}

/// Forwards events to `tracing` with structured fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: TunnelEvent) {
        match event {
            TunnelEvent::RequestReceived { operation } => {
                tracing::info!(operation = %operation, "request received");
            }
            TunnelEvent::GuardFailure { prefix, reason } => {
                tracing::error!(
                    prefix = %prefix,
                    reason = %reason,
                    "tunnel guard rejected operation"
                );
            }
            TunnelEvent::MultipleTunnels { prefix, count } => {
                tracing::error!(prefix = %prefix, count, "multiple tunnel instances are active");
            }
            TunnelEvent::TunnelInstance { index, instance } => {
                tracing::error!(
                    index,
                    id = %instance.id,
                    label = %instance.label,
                    region = %instance.region,
                    status = %instance.status,
                    "active tunnel instance"
                );
            }
            TunnelEvent::DuplicateScript {
                label,
                count,
                selected,
            } => {
                tracing::warn!(
                    label = %label,
                    count,
                    selected,
                    "provisioning script label is ambiguous"
                );
            }
            TunnelEvent::Submitted {
                operation,
                instance,
            } => {
                tracing::info!(
                    operation = %operation,
                    id = %instance.id,
                    label = %instance.label,
                    status = %instance.status,
                    "submitted; waiting until running"
                );
            }
            TunnelEvent::PollAttempt {
                id,
                attempt,
                status,
            } => {
                tracing::debug!(id = %id, attempt, status = %status, "instance not running yet");
            }
            TunnelEvent::InstanceReady { instance, attempts } => {
                tracing::info!(
                    id = %instance.id,
                    label = %instance.label,
                    ipv4 = ?instance.ipv4,
                    ipv6 = ?instance.ipv6,
                    attempts,
                    "instance is running"
                );
            }
            TunnelEvent::ConvergenceTimedOut { instance, attempts } => {
                tracing::warn!(
                    id = %instance.id,
                    label = %instance.label,
                    plan = %instance.plan,
                    status = %instance.status,
                    ipv4 = ?instance.ipv4,
                    ipv6 = ?instance.ipv6,
                    attempts,
                    "instance took too long to come online"
                );
            }
            TunnelEvent::ProviderFailure { operation, message } => {
                tracing::error!(operation = %operation, error = %message, "provider call failed");
            }
            TunnelEvent::InstanceDeleted { instance } => {
                tracing::info!(id = %instance.id, label = %instance.label, "instance deleted");
            }
        }
    }
}
