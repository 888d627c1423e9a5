//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::future::ready;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::backend::{ControlPlane, InstanceSpec, PlaneFuture, RebuildSpec};
use crate::events::{EventSink, TunnelEvent};
use crate::linode::{
    Image, Instance, InstanceId, InstanceSpecs, InstanceStatus, LinodeError, Plan, Region,
    StackScript,
};

const FIRST_SCRIPTED_ID: u64 = 100;

/// Builds an instance record with plausible networking.
#[must_use]
pub fn instance(id: u64, label: &str, status: InstanceStatus) -> Instance {
    Instance {
        id: InstanceId::new(id),
        label: label.to_owned(),
        group: String::new(),
        region: String::from("eu-central"),
        plan: String::from("g6-nanode-1"),
        image: Some(String::from("linode/debian12")),
        status,
        ipv4: vec![String::from("192.0.2.10")],
        ipv6: Some(String::from("2001:db8::1/128")),
        created_at: String::from("2026-01-01T00:00:00"),
        updated_at: String::from("2026-01-01T00:00:00"),
        hypervisor: String::from("kvm"),
        specs: InstanceSpecs {
            disk: 25_600,
            memory: 1024,
            vcpus: 1,
            transfer: 1000,
        },
    }
}

/// Builds a provisioning script record.
#[must_use]
pub fn script(id: u64, label: &str) -> StackScript {
    StackScript {
        id,
        label: label.to_owned(),
        description: String::new(),
        images: vec![String::from("linode/debian12")],
        is_public: false,
    }
}

/// Control-plane calls a [`ScriptedPlane`] can be told to fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaneCall {
    /// `list_instances`.
    ListInstances,
    /// `create_instance`.
    CreateInstance,
    /// `rebuild_instance`.
    RebuildInstance,
    /// `delete_instance`.
    DeleteInstance,
    /// `list_scripts`.
    ListScripts,
    /// `list_plans`.
    ListPlans,
    /// `list_regions`.
    ListRegions,
    /// `list_images`.
    ListImages,
}

/// Number of times each control-plane operation was invoked.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlaneCalls {
    /// `list_instances` calls.
    pub list_instances: u32,
    /// `get_instance` calls.
    pub get_instance: u32,
    /// `create_instance` calls.
    pub create_instance: u32,
    /// `rebuild_instance` calls.
    pub rebuild_instance: u32,
    /// `delete_instance` calls.
    pub delete_instance: u32,
    /// `list_scripts` calls.
    pub list_scripts: u32,
    /// `list_plans` calls.
    pub list_plans: u32,
    /// `list_regions` calls.
    pub list_regions: u32,
    /// `list_images` calls.
    pub list_images: u32,
}

impl PlaneCalls {
    /// Sum of every counter.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.list_instances
            + self.get_instance
            + self.create_instance
            + self.rebuild_instance
            + self.delete_instance
            + self.list_scripts
            + self.list_plans
            + self.list_regions
            + self.list_images
    }
}

#[derive(Debug, Default)]
struct PlaneState {
    instances: Vec<Instance>,
    scripts: Vec<StackScript>,
    plans: Vec<Plan>,
    regions: Vec<Region>,
    images: Vec<Image>,
    polls: VecDeque<Result<InstanceStatus, LinodeError>>,
    failures: Vec<(PlaneCall, LinodeError)>,
    next_id: u64,
    calls: PlaneCalls,
    created: Vec<InstanceSpec>,
    rebuilt: Vec<RebuildSpec>,
    deleted: Vec<InstanceId>,
}

impl PlaneState {
    fn failure(&self, call: PlaneCall) -> Option<LinodeError> {
        self.failures
            .iter()
            .find(|(failing, _)| *failing == call)
            .map(|(_, err)| err.clone())
    }

    fn listing<T: Clone>(&self, call: PlaneCall, items: &[T]) -> Result<Vec<T>, LinodeError> {
        self.failure(call).map_or_else(|| Ok(items.to_vec()), Err)
    }

    fn not_found(endpoint: String) -> LinodeError {
        LinodeError::Api {
            method: String::from("GET"),
            endpoint,
            status: 404,
            details: String::from("Not found"),
        }
    }
}

/// In-memory control plane with scripted status sequences and failures.
///
/// Created instances join the listing, status polls consume the scripted
/// statuses in FIFO order and repeat the last one once the queue is empty.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPlane {
    state: Arc<Mutex<PlaneState>>,
}

impl ScriptedPlane {
    /// Creates an empty control plane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut PlaneState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Adds an existing instance to the account.
    pub fn add_instance(&self, instance: Instance) {
        self.with_state(|state| state.instances.push(instance));
    }

    /// Adds a provisioning script to the account.
    pub fn add_script(&self, script: StackScript) {
        self.with_state(|state| state.scripts.push(script));
    }

    /// Seeds the public catalog.
    pub fn set_catalog(&self, plans: Vec<Plan>, regions: Vec<Region>, images: Vec<Image>) {
        self.with_state(|state| {
            state.plans = plans;
            state.regions = regions;
            state.images = images;
        });
    }

    /// Queues statuses reported by successive `get_instance` calls.
    pub fn push_statuses(&self, statuses: &[InstanceStatus]) {
        self.with_state(|state| state.polls.extend(statuses.iter().copied().map(Ok)));
    }

    /// Queues a failing `get_instance` call after the statuses queued so
    /// far.
    pub fn fail_get_instance(&self, err: LinodeError) {
        self.with_state(|state| state.polls.push_back(Err(err)));
    }

    /// Makes every future invocation of `call` fail with `err`.
    pub fn fail(&self, call: PlaneCall, err: LinodeError) {
        self.with_state(|state| state.failures.push((call, err)));
    }

    /// Invocation counters.
    #[must_use]
    pub fn calls(&self) -> PlaneCalls {
        self.with_state(|state| state.calls)
    }

    /// Specs submitted through `create_instance`.
    #[must_use]
    pub fn created(&self) -> Vec<InstanceSpec> {
        self.with_state(|state| state.created.clone())
    }

    /// Specs submitted through `rebuild_instance`.
    #[must_use]
    pub fn rebuilt(&self) -> Vec<RebuildSpec> {
        self.with_state(|state| state.rebuilt.clone())
    }

    /// Identifiers passed to `delete_instance`.
    #[must_use]
    pub fn deleted(&self) -> Vec<InstanceId> {
        self.with_state(|state| state.deleted.clone())
    }

    /// Instances currently on the account.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        self.with_state(|state| state.instances.clone())
    }

    fn poll(&self, id: InstanceId) -> Result<Instance, LinodeError> {
        self.with_state(|state| {
            state.calls.get_instance += 1;
            let scripted = state.polls.pop_front();
            let current = state
                .instances
                .iter_mut()
                .find(|instance| instance.id == id)
                .ok_or_else(|| PlaneState::not_found(format!("/linode/instances/{id}")))?;
            match scripted {
                Some(Ok(status)) => current.status = status,
                Some(Err(err)) => return Err(err),
                None => {}
            }
            Ok(current.clone())
        })
    }

    fn create(&self, spec: &InstanceSpec) -> Result<Instance, LinodeError> {
        self.with_state(|state| {
            state.calls.create_instance += 1;
            if let Some(err) = state.failure(PlaneCall::CreateInstance) {
                return Err(err);
            }
            state.created.push(spec.clone());
            let id = FIRST_SCRIPTED_ID + state.next_id;
            state.next_id += 1;
            let mut created = instance(
                id,
                spec.label().unwrap_or_default(),
                InstanceStatus::Provisioning,
            );
            spec.region().clone_into(&mut created.region);
            spec.plan().clone_into(&mut created.plan);
            created.image = spec.image().map(str::to_owned);
            state.instances.push(created.clone());
            Ok(created)
        })
    }

    fn rebuild(&self, spec: &RebuildSpec) -> Result<Instance, LinodeError> {
        self.with_state(|state| {
            state.calls.rebuild_instance += 1;
            if let Some(err) = state.failure(PlaneCall::RebuildInstance) {
                return Err(err);
            }
            state.rebuilt.push(spec.clone());
            let current = state
                .instances
                .iter_mut()
                .find(|instance| instance.id == spec.id())
                .ok_or_else(|| {
                    PlaneState::not_found(format!("/linode/instances/{}/rebuild", spec.id()))
                })?;
            current.status = InstanceStatus::Rebuilding;
            current.image = Some(spec.image().to_owned());
            Ok(current.clone())
        })
    }

    fn delete(&self, id: InstanceId) -> Result<(), LinodeError> {
        self.with_state(|state| {
            state.calls.delete_instance += 1;
            if let Some(err) = state.failure(PlaneCall::DeleteInstance) {
                return Err(err);
            }
            state.deleted.push(id);
            state.instances.retain(|instance| instance.id != id);
            Ok(())
        })
    }
}

impl ControlPlane for ScriptedPlane {
    fn list_instances(&self) -> PlaneFuture<'_, Vec<Instance>> {
        let result = self.with_state(|state| {
            state.calls.list_instances += 1;
            state.listing(PlaneCall::ListInstances, &state.instances)
        });
        Box::pin(ready(result))
    }

    fn get_instance(&self, id: InstanceId) -> PlaneFuture<'_, Instance> {
        Box::pin(ready(self.poll(id)))
    }

    fn create_instance<'a>(&'a self, spec: &'a InstanceSpec) -> PlaneFuture<'a, Instance> {
        Box::pin(ready(self.create(spec)))
    }

    fn rebuild_instance<'a>(&'a self, spec: &'a RebuildSpec) -> PlaneFuture<'a, Instance> {
        Box::pin(ready(self.rebuild(spec)))
    }

    fn delete_instance(&self, id: InstanceId) -> PlaneFuture<'_, ()> {
        Box::pin(ready(self.delete(id)))
    }

    fn list_scripts(&self) -> PlaneFuture<'_, Vec<StackScript>> {
        let result = self.with_state(|state| {
            state.calls.list_scripts += 1;
            state.listing(PlaneCall::ListScripts, &state.scripts)
        });
        Box::pin(ready(result))
    }

    fn list_plans(&self) -> PlaneFuture<'_, Vec<Plan>> {
        let result = self.with_state(|state| {
            state.calls.list_plans += 1;
            state.listing(PlaneCall::ListPlans, &state.plans)
        });
        Box::pin(ready(result))
    }

    fn list_regions(&self) -> PlaneFuture<'_, Vec<Region>> {
        let result = self.with_state(|state| {
            state.calls.list_regions += 1;
            state.listing(PlaneCall::ListRegions, &state.regions)
        });
        Box::pin(ready(result))
    }

    fn list_images(&self) -> PlaneFuture<'_, Vec<Image>> {
        let result = self.with_state(|state| {
            state.calls.list_images += 1;
            state.listing(PlaneCall::ListImages, &state.images)
        });
        Box::pin(ready(result))
    }
}

/// Event sink that keeps every event in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TunnelEvent>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<TunnelEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: TunnelEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and clears environment variables while holding a global mutex.
    ///
    /// A `None` value removes the variable for the lifetime of the guard.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
