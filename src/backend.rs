//! Control-plane abstraction and the immutable instance specifications
//! submitted through it.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use thiserror::Error;

use crate::linode::{
    Image, Instance, InstanceId, LinodeError, Plan, Region, StackScript,
};

/// Parameters passed opaquely to a provisioning script.
///
/// Keys are the script's user-defined field names; values are strings or
/// integers.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScriptData(BTreeMap<String, serde_json::Value>);

impl ScriptData {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Returns true when the parameter is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Errors raised while building a specification.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpecError {
    /// Raised when a required field is missing or blank.
    #[error("{0} is empty or missing")]
    MissingField(&'static str),
}

/// Validated, immutable description of an instance to create.
///
/// Submitting the same spec twice creates two instances; uniqueness is the
/// tunnel guard's job.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstanceSpec {
    region: String,
    #[serde(rename = "type")]
    plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(rename = "root_pass", skip_serializing_if = "Option::is_none")]
    root_password: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authorized_keys: Vec<String>,
    #[serde(rename = "stackscript_id", skip_serializing_if = "Option::is_none")]
    script_id: Option<u64>,
    #[serde(rename = "stackscript_data", skip_serializing_if = "Option::is_none")]
    script_data: Option<ScriptData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    backups_enabled: bool,
    booted: bool,
}

impl InstanceSpec {
    /// Starts a builder for an [`InstanceSpec`].
    #[must_use]
    pub fn builder() -> InstanceSpecBuilder {
        InstanceSpecBuilder::default()
    }

    /// Target region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Plan (instance type).
    #[must_use]
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Instance label, when set.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Source image, when set.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Provisioning script identifier, when set.
    #[must_use]
    pub const fn script_id(&self) -> Option<u64> {
        self.script_id
    }

    /// Provisioning script parameters, when set.
    #[must_use]
    pub const fn script_data(&self) -> Option<&ScriptData> {
        self.script_data.as_ref()
    }

    /// Whether the instance boots right after creation.
    #[must_use]
    pub const fn booted(&self) -> bool {
        self.booted
    }
}

/// Accumulates creation parameters; setters never validate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceSpecBuilder {
    region: String,
    plan: String,
    label: Option<String>,
    group: Option<String>,
    root_password: Option<String>,
    authorized_keys: Vec<String>,
    script_id: Option<u64>,
    script_data: Option<ScriptData>,
    backup_id: Option<u64>,
    image: Option<String>,
    backups_enabled: bool,
    booted: bool,
}

impl InstanceSpecBuilder {
    /// Sets the region.
    #[must_use]
    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = value.into();
        self
    }

    /// Sets the plan.
    #[must_use]
    pub fn plan(mut self, value: impl Into<String>) -> Self {
        self.plan = value.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, value: impl Into<String>) -> Self {
        self.label = Some(value.into());
        self
    }

    /// Sets the display group.
    #[must_use]
    pub fn group(mut self, value: impl Into<String>) -> Self {
        self.group = Some(value.into());
        self
    }

    /// Sets the root password. The provider requires one when an image is
    /// set.
    #[must_use]
    pub fn root_password(mut self, value: impl Into<String>) -> Self {
        self.root_password = Some(value.into());
        self
    }

    /// Sets the SSH public keys authorized for root.
    #[must_use]
    pub fn authorized_keys(mut self, keys: Vec<String>) -> Self {
        self.authorized_keys = keys;
        self
    }

    /// Sets the provisioning script and its parameters.
    #[must_use]
    pub fn script(mut self, id: u64, data: ScriptData) -> Self {
        self.script_id = Some(id);
        self.script_data = Some(data);
        self
    }

    /// Uses an existing backup as the source.
    #[must_use]
    pub const fn backup_id(mut self, id: u64) -> Self {
        self.backup_id = Some(id);
        self
    }

    /// Uses a prebuilt image as the source.
    #[must_use]
    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = Some(value.into());
        self
    }

    /// Enables the provider's backup service.
    #[must_use]
    pub const fn backups_enabled(mut self, enabled: bool) -> Self {
        self.backups_enabled = enabled;
        self
    }

    /// Boots the instance right after creation.
    #[must_use]
    pub const fn booted(mut self, booted: bool) -> Self {
        self.booted = booted;
        self
    }

    /// Checks the required fields without freezing the spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::MissingField`] when the plan or region is blank.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.plan.trim().is_empty() {
            return Err(SpecError::MissingField("plan"));
        }
        if self.region.trim().is_empty() {
            return Err(SpecError::MissingField("region"));
        }
        Ok(())
    }

    /// Trims inputs, checks the required fields and freezes the spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::MissingField`] when the plan or region is blank.
    pub fn build(self) -> Result<InstanceSpec, SpecError> {
        self.validate()?;
        Ok(InstanceSpec {
            region: self.region.trim().to_owned(),
            plan: self.plan.trim().to_owned(),
            label: self.label.map(|value| value.trim().to_owned()),
            group: self.group,
            root_password: self.root_password,
            authorized_keys: self.authorized_keys,
            script_id: self.script_id,
            script_data: self.script_data,
            backup_id: self.backup_id,
            image: self.image.map(|value| value.trim().to_owned()),
            backups_enabled: self.backups_enabled,
            booted: self.booted,
        })
    }
}

/// Validated, immutable description of a rebuild of an existing instance.
///
/// Rebuilds keep the instance identity, so there is no label, group or
/// backup setting.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RebuildSpec {
    #[serde(skip)]
    id: InstanceId,
    image: String,
    #[serde(rename = "root_pass", skip_serializing_if = "Option::is_none")]
    root_password: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authorized_keys: Vec<String>,
    #[serde(rename = "stackscript_id", skip_serializing_if = "Option::is_none")]
    script_id: Option<u64>,
    #[serde(rename = "stackscript_data", skip_serializing_if = "Option::is_none")]
    script_data: Option<ScriptData>,
    booted: bool,
}

impl RebuildSpec {
    /// Starts a builder scoped to an existing instance.
    #[must_use]
    pub fn builder(id: InstanceId) -> RebuildSpecBuilder {
        RebuildSpecBuilder {
            id,
            image: String::new(),
            root_password: None,
            authorized_keys: Vec::new(),
            script_id: None,
            script_data: None,
            booted: false,
        }
    }

    /// Instance being rebuilt.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Image the instance is rebuilt from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Provisioning script identifier, when set.
    #[must_use]
    pub const fn script_id(&self) -> Option<u64> {
        self.script_id
    }

    /// Provisioning script parameters, when set.
    #[must_use]
    pub const fn script_data(&self) -> Option<&ScriptData> {
        self.script_data.as_ref()
    }
}

/// Accumulates rebuild parameters; setters never validate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebuildSpecBuilder {
    id: InstanceId,
    image: String,
    root_password: Option<String>,
    authorized_keys: Vec<String>,
    script_id: Option<u64>,
    script_data: Option<ScriptData>,
    booted: bool,
}

impl RebuildSpecBuilder {
    /// Sets the image.
    #[must_use]
    pub fn image(mut self, value: impl Into<String>) -> Self {
        self.image = value.into();
        self
    }

    /// Sets the root password.
    #[must_use]
    pub fn root_password(mut self, value: impl Into<String>) -> Self {
        self.root_password = Some(value.into());
        self
    }

    /// Sets the SSH public keys authorized for root.
    #[must_use]
    pub fn authorized_keys(mut self, keys: Vec<String>) -> Self {
        self.authorized_keys = keys;
        self
    }

    /// Sets the provisioning script and its parameters.
    #[must_use]
    pub fn script(mut self, id: u64, data: ScriptData) -> Self {
        self.script_id = Some(id);
        self.script_data = Some(data);
        self
    }

    /// Boots the instance once rebuilt.
    #[must_use]
    pub const fn booted(mut self, booted: bool) -> Self {
        self.booted = booted;
        self
    }

    /// Freezes the spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::MissingField`] when no image is set.
    pub fn build(self) -> Result<RebuildSpec, SpecError> {
        let image = self.image.trim().to_owned();
        if image.is_empty() {
            return Err(SpecError::MissingField("image"));
        }
        Ok(RebuildSpec {
            id: self.id,
            image,
            root_password: self.root_password,
            authorized_keys: self.authorized_keys,
            script_id: self.script_id,
            script_data: self.script_data,
            booted: self.booted,
        })
    }
}

/// Future returned by control-plane operations.
pub type PlaneFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LinodeError>> + Send + 'a>>;

/// Operations the tunnel engine needs from the provider.
///
/// Every call maps to exactly one remote operation (list calls page to
/// exhaustion). Nothing is retried.
pub trait ControlPlane: Send + Sync {
    /// Lists every instance on the account.
    fn list_instances(&self) -> PlaneFuture<'_, Vec<Instance>>;

    /// Fetches the current state of one instance.
    fn get_instance(&self, id: InstanceId) -> PlaneFuture<'_, Instance>;

    /// Submits a creation request.
    fn create_instance<'a>(&'a self, spec: &'a InstanceSpec) -> PlaneFuture<'a, Instance>;

    /// Submits a rebuild request.
    fn rebuild_instance<'a>(&'a self, spec: &'a RebuildSpec) -> PlaneFuture<'a, Instance>;

    /// Irreversibly deletes an instance.
    fn delete_instance(&self, id: InstanceId) -> PlaneFuture<'_, ()>;

    /// Lists the account's own provisioning scripts.
    fn list_scripts(&self) -> PlaneFuture<'_, Vec<StackScript>>;

    /// Lists instance plans (public catalog).
    fn list_plans(&self) -> PlaneFuture<'_, Vec<Plan>>;

    /// Lists regions (public catalog).
    fn list_regions(&self) -> PlaneFuture<'_, Vec<Region>>;

    /// Lists deployable images.
    fn list_images(&self) -> PlaneFuture<'_, Vec<Image>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "eu-central", "plan")]
    #[case("  ", "eu-central", "plan")]
    #[case("g6-nanode-1", "", "region")]
    fn build_rejects_missing_required_fields(
        #[case] plan: &str,
        #[case] region: &str,
        #[case] field: &'static str,
    ) {
        let err = InstanceSpec::builder()
            .plan(plan)
            .region(region)
            .build()
            .expect_err("spec should be rejected");
        assert_eq!(err, SpecError::MissingField(field));
    }

    #[test]
    fn spec_serialises_provider_field_names() {
        let mut data = ScriptData::new();
        data.insert("udf_enable_wireguard", 0);
        let spec = InstanceSpec::builder()
            .region(" eu-central ")
            .plan("g6-nanode-1")
            .label("tunnel-1")
            .image("linode/debian12")
            .root_password("hunter2hunter2")
            .script(42, data)
            .booted(true)
            .build()
            .expect("spec should build");

        let json = serde_json::to_value(&spec).expect("spec serialises");
        assert_eq!(json["region"], "eu-central");
        assert_eq!(json["type"], "g6-nanode-1");
        assert_eq!(json["root_pass"], "hunter2hunter2");
        assert_eq!(json["stackscript_id"], 42);
        assert_eq!(json["stackscript_data"]["udf_enable_wireguard"], 0);
        assert_eq!(json["booted"], true);
        assert!(json.get("group").is_none());
        assert!(json.get("authorized_keys").is_none());
        assert!(json.get("backup_id").is_none());
    }

    #[test]
    fn rebuild_spec_requires_image_and_omits_id_from_body() {
        let err = RebuildSpec::builder(InstanceId::new(7))
            .build()
            .expect_err("image is required");
        assert_eq!(err, SpecError::MissingField("image"));

        let spec = RebuildSpec::builder(InstanceId::new(7))
            .image("linode/debian12")
            .authorized_keys(vec![String::from("ssh-ed25519 AAAA")])
            .build()
            .expect("spec should build");
        let json = serde_json::to_value(&spec).expect("spec serialises");
        assert!(json.get("id").is_none());
        assert_eq!(json["authorized_keys"][0], "ssh-ed25519 AAAA");
        assert_eq!(spec.id(), InstanceId::new(7));
    }
}
