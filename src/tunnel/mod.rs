//! Lifecycle orchestration of the tunnel node.
//!
//! [`TunnelOrchestrator`] composes the role guard, provisioning lookup,
//! instance specs and convergence poller into the lifecycle verbs. Every
//! verb runs strictly sequentially: one provider call at a time.

mod converge;
mod error;
mod guard;
mod provisioning;
pub mod service;

use uuid::Uuid;

use crate::backend::{ControlPlane, InstanceSpec, RebuildSpec};
use crate::events::{EventSink, TunnelEvent};
use crate::linode::{Image, Instance, Plan, Region, StackScript};
use crate::protocol::{Operation, Outcome, TunnelRequest, TunnelResponse};

pub use converge::{ConvergencePolicy, ConvergencePoller};
pub use error::TunnelError;
pub use guard::TunnelGuard;
pub use provisioning::{
    AccountCredentials, ObfsproxyOptions, Provisioning, TunnelSettings, WireguardOptions,
    provisioning_for, resolve_script,
};

/// Label prefix identifying the tunnel instance.
pub const DEFAULT_LABEL_PREFIX: &str = "burrow_tunnel";
/// Image tunnel instances are deployed from.
pub const DEFAULT_IMAGE: &str = "linode/debian12";
/// Label of the provisioning script that configures the node.
pub const DEFAULT_SCRIPT_LABEL: &str = "burrow_node";

const LABEL_SUFFIX_LEN: usize = 8;

/// Deployment-wide naming used by every verb.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TunnelDefaults {
    /// Label prefix identifying the tunnel instance.
    pub label_prefix: String,
    /// Image the instance is created and rebuilt from.
    pub image: String,
    /// Label of the provisioning script.
    pub script_label: String,
}

impl Default for TunnelDefaults {
    fn default() -> Self {
        Self {
            label_prefix: DEFAULT_LABEL_PREFIX.to_owned(),
            image: DEFAULT_IMAGE.to_owned(),
            script_label: DEFAULT_SCRIPT_LABEL.to_owned(),
        }
    }
}

/// Entry points for every lifecycle verb.
#[derive(Debug)]
pub struct TunnelOrchestrator<P, E> {
    plane: P,
    sink: E,
    defaults: TunnelDefaults,
    policy: ConvergencePolicy,
}

impl<P, E> TunnelOrchestrator<P, E>
where
    P: ControlPlane,
    E: EventSink,
{
    /// Creates an orchestrator with default naming and poll policy.
    #[must_use]
    pub fn new(plane: P, sink: E) -> Self {
        Self {
            plane,
            sink,
            defaults: TunnelDefaults::default(),
            policy: ConvergencePolicy::default(),
        }
    }

    /// Overrides naming.
    #[must_use]
    pub fn with_defaults(mut self, defaults: TunnelDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Overrides the convergence policy.
    ///
    /// Tests use this to keep polling fast.
    #[must_use]
    pub const fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Control plane the orchestrator drives.
    #[must_use]
    pub const fn plane(&self) -> &P {
        &self.plane
    }

    fn guard(&self) -> TunnelGuard<'_, P, E> {
        TunnelGuard::new(&self.plane, &self.sink, &self.defaults.label_prefix)
    }

    fn poller(&self) -> ConvergencePoller<'_, P, E> {
        ConvergencePoller::new(&self.plane, &self.sink, self.policy)
    }

    /// Creates the tunnel instance and waits for it to run.
    ///
    /// Plan and region are checked before any provider call. When the
    /// instance does not reach `running` in time, or a status check fails,
    /// the instance as returned by the create call is reported instead.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Validation`] for a blank plan or region,
    /// [`TunnelError::AlreadyExists`] when a tunnel is present,
    /// [`TunnelError::ScriptMissing`] when the provisioning script is not
    /// found, and [`TunnelError::Provider`] when a provider call fails.
    pub async fn create(
        &self,
        plan: &str,
        region: &str,
        settings: &TunnelSettings,
    ) -> Result<Instance, TunnelError> {
        let builder = InstanceSpec::builder()
            .plan(plan)
            .region(region)
            .label(self.new_label())
            .image(self.defaults.image.as_str())
            .authorized_keys(settings.ssh_keys.clone())
            .backups_enabled(false)
            .booted(true);
        builder.validate()?;

        self.guard().ensure_absent().await?;
        let provisioning = provisioning_for(
            &self.plane,
            &self.sink,
            &self.defaults.script_label,
            settings,
        )
        .await?;

        let mut builder = builder.script(provisioning.script.id, provisioning.data);
        if !settings.root_password.is_empty() {
            builder = builder.root_password(settings.root_password.as_str());
        }
        let spec = builder.build()?;

        let submitted = self.plane.create_instance(&spec).await?;
        Ok(self.converge(Operation::Create, submitted).await)
    }

    /// Rebuilds the tunnel instance in place and waits for it to run.
    ///
    /// Falls back to the instance returned by the rebuild call like
    /// [`Self::create`] does.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::DoesNotExist`] when no tunnel is present,
    /// [`TunnelError::ScriptMissing`] when the provisioning script is not
    /// found, and [`TunnelError::Provider`] when a provider call fails.
    pub async fn rebuild(&self, settings: &TunnelSettings) -> Result<Instance, TunnelError> {
        let tunnel = self.guard().ensure_present().await?;
        let provisioning = provisioning_for(
            &self.plane,
            &self.sink,
            &self.defaults.script_label,
            settings,
        )
        .await?;

        let mut builder = RebuildSpec::builder(tunnel.id)
            .image(self.defaults.image.as_str())
            .authorized_keys(settings.ssh_keys.clone())
            .script(provisioning.script.id, provisioning.data)
            .booted(true);
        if !settings.root_password.is_empty() {
            builder = builder.root_password(settings.root_password.as_str());
        }
        let spec = builder.build()?;

        let submitted = self.plane.rebuild_instance(&spec).await?;
        Ok(self.converge(Operation::Rebuild, submitted).await)
    }

    /// Deletes the tunnel instance.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::DoesNotExist`] when no tunnel is present and
    /// [`TunnelError::Provider`] when a provider call fails.
    pub async fn destroy(&self) -> Result<(), TunnelError> {
        let tunnel = self.guard().ensure_present().await?;
        self.plane.delete_instance(tunnel.id).await?;
        self.sink.emit(TunnelEvent::InstanceDeleted {
            instance: (&tunnel).into(),
        });
        Ok(())
    }

    /// Returns the current snapshot of the tunnel instance.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::DoesNotExist`] when no tunnel is present and
    /// [`TunnelError::Provider`] when listing fails.
    pub async fn status(&self) -> Result<Instance, TunnelError> {
        self.guard().ensure_present().await
    }

    /// Lists every instance on the account.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] when listing fails.
    pub async fn list_instances(&self) -> Result<Vec<Instance>, TunnelError> {
        Ok(self.plane.list_instances().await?)
    }

    /// Lists instance plans.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] when listing fails.
    pub async fn list_plans(&self) -> Result<Vec<Plan>, TunnelError> {
        Ok(self.plane.list_plans().await?)
    }

    /// Lists regions.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] when listing fails.
    pub async fn list_regions(&self) -> Result<Vec<Region>, TunnelError> {
        Ok(self.plane.list_regions().await?)
    }

    /// Lists deployable images.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] when listing fails.
    pub async fn list_images(&self) -> Result<Vec<Image>, TunnelError> {
        Ok(self.plane.list_images().await?)
    }

    /// Lists the account's provisioning scripts.
    ///
    /// # Errors
    ///
    /// Returns [`TunnelError::Provider`] when listing fails.
    pub async fn list_scripts(&self) -> Result<Vec<StackScript>, TunnelError> {
        Ok(self.plane.list_scripts().await?)
    }

    /// Runs the verb named by `request` and wraps the result in the
    /// matching reply variant.
    pub async fn dispatch(&self, request: &TunnelRequest) -> TunnelResponse {
        let operation = request.operation();
        match request {
            TunnelRequest::Create(args) => TunnelResponse::Create(
                self.settle(
                    operation,
                    self.create(&args.plan, &args.region, &args.tunnel).await,
                ),
            ),
            TunnelRequest::Rebuild(args) => TunnelResponse::Rebuild(
                self.settle(operation, self.rebuild(&args.tunnel).await),
            ),
            TunnelRequest::Destroy(_) => {
                TunnelResponse::Destroy(self.settle(operation, self.destroy().await))
            }
            TunnelRequest::Status(_) => {
                TunnelResponse::Status(self.settle(operation, self.status().await))
            }
            TunnelRequest::ListInstances(_) => TunnelResponse::ListInstances(
                self.settle(operation, self.list_instances().await),
            ),
            TunnelRequest::ListPlans(_) => {
                TunnelResponse::ListPlans(self.settle(operation, self.list_plans().await))
            }
            TunnelRequest::ListRegions(_) => {
                TunnelResponse::ListRegions(self.settle(operation, self.list_regions().await))
            }
            TunnelRequest::ListImages(_) => {
                TunnelResponse::ListImages(self.settle(operation, self.list_images().await))
            }
            TunnelRequest::ListScripts(_) => {
                TunnelResponse::ListScripts(self.settle(operation, self.list_scripts().await))
            }
        }
    }

    fn settle<T>(&self, operation: Operation, result: Result<T, TunnelError>) -> Outcome<T> {
        if let Err(TunnelError::Provider(err)) = &result {
            self.sink.emit(TunnelEvent::ProviderFailure {
                operation,
                message: err.to_string(),
            });
        }
        Outcome::from(result)
    }

    async fn converge(&self, operation: Operation, submitted: Instance) -> Instance {
        self.sink.emit(TunnelEvent::Submitted {
            operation,
            instance: (&submitted).into(),
        });
        match self.poller().await_running(submitted.id).await {
            Ok(running) => running,
            Err(TunnelError::Provider(err)) => {
                self.sink.emit(TunnelEvent::ProviderFailure {
                    operation,
                    message: err.to_string(),
                });
                submitted
            }
            Err(_) => submitted,
        }
    }

    fn new_label(&self) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(LABEL_SUFFIX_LEN)
            .collect();
        format!("{}-{suffix}", self.defaults.label_prefix)
    }
}

#[cfg(test)]
mod tests;
