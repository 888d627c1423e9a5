//! Polls a freshly submitted instance until it reports `running`.

use std::time::Duration;

use tokio::time::sleep;

use crate::backend::ControlPlane;
use crate::events::{EventSink, TunnelEvent};
use crate::linode::{Instance, InstanceId, InstanceStatus};

use super::TunnelError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(7);
const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Timing of the convergence loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConvergencePolicy {
    /// Delay between status checks.
    pub interval: Duration,
    /// Number of status checks before giving up.
    pub max_attempts: u32,
}

impl ConvergencePolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Wait before the first status check, two intervals long.
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.interval.saturating_mul(2)
    }
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Drives the status-check loop for one instance.
#[derive(Debug)]
pub struct ConvergencePoller<'a, P, E> {
    plane: &'a P,
    sink: &'a E,
    policy: ConvergencePolicy,
}

impl<'a, P, E> ConvergencePoller<'a, P, E>
where
    P: ControlPlane,
    E: EventSink,
{
    /// Creates a poller over `plane`.
    #[must_use]
    pub const fn new(plane: &'a P, sink: &'a E, policy: ConvergencePolicy) -> Self {
        Self {
            plane,
            sink,
            policy,
        }
    }

    /// Waits the grace period, then checks the status every interval until
    /// the instance is `running`.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] as soon as a status check fails and
    /// [`TunnelError::ConvergenceTimeout`] once `max_attempts` checks have
    /// not observed `running`.
    pub async fn await_running(&self, id: InstanceId) -> Result<Instance, TunnelError> {
        sleep(self.policy.grace()).await;

        let mut attempts: u32 = 0;
        loop {
            let instance = self.plane.get_instance(id).await?;
            attempts = attempts.saturating_add(1);

            if instance.status == InstanceStatus::Running {
                self.sink.emit(TunnelEvent::InstanceReady {
                    instance: (&instance).into(),
                    attempts,
                });
                return Ok(instance);
            }

            if attempts >= self.policy.max_attempts {
                self.sink.emit(TunnelEvent::ConvergenceTimedOut {
                    instance: (&instance).into(),
                    attempts,
                });
                return Err(TunnelError::ConvergenceTimeout { id, attempts });
            }

            self.sink.emit(TunnelEvent::PollAttempt {
                id,
                attempt: attempts,
                status: instance.status,
            });
            sleep(self.policy.interval).await;
        }
    }
}
