//! Linode v4 control-plane client.
//!
//! [`LinodeApi`] owns the HTTP client, base URL and optional bearer token.
//! Every call goes through the single-shot transport executor; list
//! endpoints are walked with [`PageCursor`].

mod error;
mod pagination;
mod transport;
mod types;

use std::time::Duration;

use reqwest::Method;
use serde::de::IgnoredAny;

use crate::backend::{ControlPlane, InstanceSpec, PlaneFuture, RebuildSpec};

pub use error::{FieldError, LinodeError, ProviderError};
pub use pagination::PageCursor;
pub use transport::{Access, RequestParts};
pub use types::{
    Image, Instance, InstanceId, InstanceSpecs, InstanceStatus, Page, Paginated, Plan, PlanPrice,
    Region, StackScript,
};

/// Production API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.linode.com/v4";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_USER_AGENT: &str = "burrow";
const OWN_SCRIPTS_FILTER: &str = r#"{"mine": true}"#;

/// Connection settings shared by every client built for a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiSettings {
    /// Base URL every endpoint is appended to.
    pub base_url: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Client for the Linode v4 REST API.
///
/// The `User-Agent` and timeout are fixed when the client is built.
#[derive(Clone, Debug)]
pub struct LinodeApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl LinodeApi {
    /// Builds a client that authenticates with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError::Client`] when the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings, token: impl Into<String>) -> Result<Self, LinodeError> {
        let bearer: String = token.into();
        Self::build(settings, Some(bearer).filter(|value| !value.trim().is_empty()))
    }

    /// Builds a client limited to public endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError::Client`] when the HTTP client cannot be built.
    pub fn unauthenticated(settings: &ApiSettings) -> Result<Self, LinodeError> {
        Self::build(settings, None)
    }

    fn build(settings: &ApiSettings, token: Option<String>) -> Result<Self, LinodeError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|err| LinodeError::Client {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// Returns true when the client carries a bearer token.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Starts a cursor over a paged list endpoint.
    #[must_use]
    pub fn paginate<T>(&self, endpoint: &str, parts: RequestParts) -> PageCursor<'_, T>
    where
        T: serde::de::DeserializeOwned,
    {
        PageCursor::new(self, endpoint, parts)
    }

    /// Fetches one instance.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError`] from the transport executor.
    pub async fn query_instance(&self, id: InstanceId) -> Result<Instance, LinodeError> {
        let endpoint = format!("/linode/instances/{id}");
        self.execute(Method::GET, &endpoint, RequestParts::authenticated())
            .await
    }

    /// Creates an instance from a validated spec.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError`] from the transport executor.
    pub async fn create(&self, spec: &InstanceSpec) -> Result<Instance, LinodeError> {
        let endpoint = "/linode/instances";
        let body = encode_body(endpoint, spec)?;
        self.execute(Method::POST, endpoint, RequestParts::authenticated().body(body))
            .await
    }

    /// Rebuilds an existing instance from a validated spec.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError`] from the transport executor.
    pub async fn rebuild(&self, spec: &RebuildSpec) -> Result<Instance, LinodeError> {
        let endpoint = format!("/linode/instances/{}/rebuild", spec.id());
        let body = encode_body(&endpoint, spec)?;
        self.execute(
            Method::POST,
            &endpoint,
            RequestParts::authenticated().body(body),
        )
        .await
    }

    /// Irreversibly deletes an instance.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError`] from the transport executor.
    pub async fn delete(&self, id: InstanceId) -> Result<(), LinodeError> {
        let endpoint = format!("/linode/instances/{id}");
        self.execute::<IgnoredAny>(Method::DELETE, &endpoint, RequestParts::authenticated())
            .await
            .map(|_| ())
    }
}

fn encode_body<T: serde::Serialize>(
    endpoint: &str,
    value: &T,
) -> Result<serde_json::Value, LinodeError> {
    serde_json::to_value(value).map_err(|err| LinodeError::Encode {
        endpoint: endpoint.to_owned(),
        message: err.to_string(),
    })
}

impl ControlPlane for LinodeApi {
    fn list_instances(&self) -> PlaneFuture<'_, Vec<Instance>> {
        Box::pin(
            self.paginate("/linode/instances", RequestParts::authenticated())
                .collect_all(),
        )
    }

    fn get_instance(&self, id: InstanceId) -> PlaneFuture<'_, Instance> {
        Box::pin(self.query_instance(id))
    }

    fn create_instance<'a>(&'a self, spec: &'a InstanceSpec) -> PlaneFuture<'a, Instance> {
        Box::pin(self.create(spec))
    }

    fn rebuild_instance<'a>(&'a self, spec: &'a RebuildSpec) -> PlaneFuture<'a, Instance> {
        Box::pin(self.rebuild(spec))
    }

    fn delete_instance(&self, id: InstanceId) -> PlaneFuture<'_, ()> {
        Box::pin(self.delete(id))
    }

    fn list_scripts(&self) -> PlaneFuture<'_, Vec<StackScript>> {
        Box::pin(
            self.paginate(
                "/linode/stackscripts",
                RequestParts::authenticated().header("X-Filter", OWN_SCRIPTS_FILTER),
            )
            .collect_all(),
        )
    }

    fn list_plans(&self) -> PlaneFuture<'_, Vec<Plan>> {
        Box::pin(
            self.paginate("/linode/types", RequestParts::public())
                .collect_all(),
        )
    }

    fn list_regions(&self) -> PlaneFuture<'_, Vec<Region>> {
        Box::pin(self.paginate("/regions", RequestParts::public()).collect_all())
    }

    fn list_images(&self) -> PlaneFuture<'_, Vec<Image>> {
        Box::pin(
            self.paginate("/images", RequestParts::authenticated())
                .collect_all(),
        )
    }
}
