//! Enforces the one-tunnel-per-account convention.
//!
//! The tunnel instance is recognised by its label prefix. The guard lists
//! every instance, keeps the ones whose label starts with the prefix and
//! checks the count. Listing and the mutation that follows are separate
//! provider calls, so two concurrent creates can both pass the guard; the
//! provider offers nothing to close that window.

use crate::backend::ControlPlane;
use crate::events::{EventSink, TunnelEvent};
use crate::linode::Instance;

use super::TunnelError;

/// Label-prefix lookup of the tunnel instance.
#[derive(Debug)]
pub struct TunnelGuard<'a, P, E> {
    plane: &'a P,
    sink: &'a E,
    prefix: &'a str,
}

impl<'a, P, E> TunnelGuard<'a, P, E>
where
    P: ControlPlane,
    E: EventSink,
{
    /// Creates a guard for instances labelled `prefix*`.
    #[must_use]
    pub const fn new(plane: &'a P, sink: &'a E, prefix: &'a str) -> Self {
        Self {
            plane,
            sink,
            prefix,
        }
    }

    /// Succeeds only when no instance carries the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::AlreadyExists`] when at least one instance
    /// matches, or [`TunnelError::Provider`] when listing fails.
    pub async fn ensure_absent(&self) -> Result<(), TunnelError> {
        if self.lookup().await?.is_some() {
            return Err(self.reject(TunnelError::AlreadyExists {
                prefix: self.prefix.to_owned(),
            }));
        }
        Ok(())
    }

    /// Returns the tunnel instance, the first match in listing order when
    /// several exist.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::DoesNotExist`] when nothing matches, or
    /// [`TunnelError::Provider`] when listing fails.
    pub async fn ensure_present(&self) -> Result<Instance, TunnelError> {
        self.lookup().await?.ok_or_else(|| {
            self.reject(TunnelError::DoesNotExist {
                prefix: self.prefix.to_owned(),
            })
        })
    }

    async fn lookup(&self) -> Result<Option<Instance>, TunnelError> {
        let instances = self.plane.list_instances().await?;
        let matching: Vec<Instance> = instances
            .into_iter()
            .filter(|instance| instance.label.starts_with(self.prefix))
            .collect();

        if matching.len() > 1 {
            self.sink.emit(TunnelEvent::MultipleTunnels {
                prefix: self.prefix.to_owned(),
                count: matching.len(),
            });
            for (index, instance) in matching.iter().enumerate() {
                self.sink.emit(TunnelEvent::TunnelInstance {
                    index,
                    instance: instance.into(),
                });
            }
        }
        Ok(matching.into_iter().next())
    }

    fn reject(&self, err: TunnelError) -> TunnelError {
        self.sink.emit(TunnelEvent::GuardFailure {
            prefix: self.prefix.to_owned(),
            reason: err.to_string(),
        });
        err
    }
}
