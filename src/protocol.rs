//! Typed request and response unions exchanged with the transport layer.
//!
//! The encrypted codec that wraps these messages lives outside this crate.
//! It hands over decrypted request bytes and takes back the encoded reply;
//! both sides use JSON here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::linode::{FieldError, Image, Instance, LinodeError, Plan, Region, StackScript};
use crate::tunnel::{TunnelError, TunnelSettings};

/// Lifecycle verbs understood by the engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Create the tunnel instance.
    Create,
    /// Rebuild the tunnel instance in place.
    Rebuild,
    /// Delete the tunnel instance.
    Destroy,
    /// Report the tunnel instance.
    Status,
    /// List every instance on the account.
    ListInstances,
    /// List instance plans.
    ListPlans,
    /// List regions.
    ListRegions,
    /// List deployable images.
    ListImages,
    /// List the account's provisioning scripts.
    ListScripts,
}

impl Operation {
    /// Wire name of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Rebuild => "rebuild",
            Self::Destroy => "destroy",
            Self::Status => "status",
            Self::ListInstances => "list_instances",
            Self::ListPlans => "list_plans",
            Self::ListRegions => "list_regions",
            Self::ListImages => "list_images",
            Self::ListScripts => "list_scripts",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication carried by every request.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Credentials {
    /// Provider personal access token.
    #[serde(default)]
    pub access_token: String,
}

impl Credentials {
    /// Wraps an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// Arguments of a create request.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct CreateTunnel {
    /// Authentication.
    #[serde(default)]
    pub auth: Credentials,
    /// Plan identifier.
    #[serde(default)]
    pub plan: String,
    /// Region identifier.
    #[serde(default)]
    pub region: String,
    /// Node configuration.
    #[serde(default)]
    pub tunnel: TunnelSettings,
}

/// Arguments of a rebuild request.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RebuildTunnel {
    /// Authentication.
    #[serde(default)]
    pub auth: Credentials,
    /// Node configuration.
    #[serde(default)]
    pub tunnel: TunnelSettings,
}

/// Arguments of requests that only need credentials.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Authenticated {
    /// Authentication.
    #[serde(default)]
    pub auth: Credentials,
}

/// Inbound request, one variant per verb.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum TunnelRequest {
    /// Create the tunnel instance.
    Create(CreateTunnel),
    /// Rebuild the tunnel instance.
    Rebuild(RebuildTunnel),
    /// Delete the tunnel instance.
    Destroy(Authenticated),
    /// Report the tunnel instance.
    Status(Authenticated),
    /// List every instance.
    ListInstances(Authenticated),
    /// List plans.
    ListPlans(Authenticated),
    /// List regions.
    ListRegions(Authenticated),
    /// List images.
    ListImages(Authenticated),
    /// List provisioning scripts.
    ListScripts(Authenticated),
}

impl TunnelRequest {
    /// Decodes a plaintext request payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] when the payload is not a known
    /// request.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(payload).map_err(|err| ProtocolError::Decode(err.to_string()))
    }

    /// Verb of this request.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Rebuild(_) => Operation::Rebuild,
            Self::Destroy(_) => Operation::Destroy,
            Self::Status(_) => Operation::Status,
            Self::ListInstances(_) => Operation::ListInstances,
            Self::ListPlans(_) => Operation::ListPlans,
            Self::ListRegions(_) => Operation::ListRegions,
            Self::ListImages(_) => Operation::ListImages,
            Self::ListScripts(_) => Operation::ListScripts,
        }
    }

    /// Credentials carried by the request.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        match self {
            Self::Create(create) => &create.auth,
            Self::Rebuild(rebuild) => &rebuild.auth,
            Self::Destroy(args)
            | Self::Status(args)
            | Self::ListInstances(args)
            | Self::ListPlans(args)
            | Self::ListRegions(args)
            | Self::ListImages(args)
            | Self::ListScripts(args) => &args.auth,
        }
    }
}

/// Reply status class of a failed operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Authentication failed.
    Unauthorized,
    /// Authenticated but not permitted.
    Forbidden,
    /// Any other failure.
    Unprocessable,
}

impl ErrorClass {
    /// HTTP-style status code for the class.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::Unprocessable => 422,
        }
    }
}

/// Error body: structured provider entries or a single message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPayload {
    /// Field-level provider errors, in provider order.
    Details(Vec<FieldError>),
    /// Free-text error.
    Message(String),
}

/// A failed operation as reported to the caller.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Status class.
    pub class: ErrorClass,
    /// Error body.
    pub error: ErrorPayload,
}

impl From<&TunnelError> for ErrorReport {
    fn from(err: &TunnelError) -> Self {
        let error = match err {
            TunnelError::Provider(LinodeError::Provider(provider)) => {
                ErrorPayload::Details(provider.errors.clone())
            }
            other => ErrorPayload::Message(other.to_string()),
        };
        Self {
            class: err.class(),
            error,
        }
    }
}

/// Success payload or error, never both.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The operation succeeded.
    Ok(T),
    /// The operation failed.
    Err(ErrorReport),
}

impl<T> Outcome<T> {
    /// Returns true for [`Outcome::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Error report, when the operation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Ok(_) => None,
            Self::Err(report) => Some(report),
        }
    }
}

impl<T> From<Result<T, TunnelError>> for Outcome<T> {
    fn from(result: Result<T, TunnelError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Err(ErrorReport::from(&err)),
        }
    }
}

/// Outbound reply, one variant per verb.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "verb", content = "outcome", rename_all = "snake_case")]
pub enum TunnelResponse {
    /// Reply to [`TunnelRequest::Create`].
    Create(Outcome<Instance>),
    /// Reply to [`TunnelRequest::Rebuild`].
    Rebuild(Outcome<Instance>),
    /// Reply to [`TunnelRequest::Destroy`].
    Destroy(Outcome<()>),
    /// Reply to [`TunnelRequest::Status`].
    Status(Outcome<Instance>),
    /// Reply to [`TunnelRequest::ListInstances`].
    ListInstances(Outcome<Vec<Instance>>),
    /// Reply to [`TunnelRequest::ListPlans`].
    ListPlans(Outcome<Vec<Plan>>),
    /// Reply to [`TunnelRequest::ListRegions`].
    ListRegions(Outcome<Vec<Region>>),
    /// Reply to [`TunnelRequest::ListImages`].
    ListImages(Outcome<Vec<Image>>),
    /// Reply to [`TunnelRequest::ListScripts`].
    ListScripts(Outcome<Vec<StackScript>>),
}

impl TunnelResponse {
    /// Builds the failed reply to `operation`.
    #[must_use]
    pub fn failed(operation: Operation, err: &TunnelError) -> Self {
        let report = ErrorReport::from(err);
        match operation {
            Operation::Create => Self::Create(Outcome::Err(report)),
            Operation::Rebuild => Self::Rebuild(Outcome::Err(report)),
            Operation::Destroy => Self::Destroy(Outcome::Err(report)),
            Operation::Status => Self::Status(Outcome::Err(report)),
            Operation::ListInstances => Self::ListInstances(Outcome::Err(report)),
            Operation::ListPlans => Self::ListPlans(Outcome::Err(report)),
            Operation::ListRegions => Self::ListRegions(Outcome::Err(report)),
            Operation::ListImages => Self::ListImages(Outcome::Err(report)),
            Operation::ListScripts => Self::ListScripts(Outcome::Err(report)),
        }
    }

    /// Verb this reply answers.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Rebuild(_) => Operation::Rebuild,
            Self::Destroy(_) => Operation::Destroy,
            Self::Status(_) => Operation::Status,
            Self::ListInstances(_) => Operation::ListInstances,
            Self::ListPlans(_) => Operation::ListPlans,
            Self::ListRegions(_) => Operation::ListRegions,
            Self::ListImages(_) => Operation::ListImages,
            Self::ListScripts(_) => Operation::ListScripts,
        }
    }

    /// Error report, when the operation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Create(outcome) | Self::Rebuild(outcome) | Self::Status(outcome) => {
                outcome.error()
            }
            Self::Destroy(outcome) => outcome.error(),
            Self::ListInstances(outcome) => outcome.error(),
            Self::ListPlans(outcome) => outcome.error(),
            Self::ListRegions(outcome) => outcome.error(),
            Self::ListImages(outcome) => outcome.error(),
            Self::ListScripts(outcome) => outcome.error(),
        }
    }

    /// Returns true when the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error().is_none()
    }

    /// Reply status: 200 on success, otherwise the error class status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self.error() {
            None => 200,
            Some(report) => report.class.status(),
        }
    }

    /// Encodes the reply for the transport layer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] when serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(|err| ProtocolError::Encode(err.to_string()))
    }
}

/// Errors raised at the codec boundary.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// The request payload could not be decoded.
    #[error("malformed request: {0}")]
    Decode(String),
    /// The reply could not be encoded.
    #[error("failed to encode reply: {0}")]
    Encode(String),
}
