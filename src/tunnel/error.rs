//! Error types for tunnel orchestration.

use thiserror::Error;

use crate::backend::SpecError;
use crate::linode::{InstanceId, LinodeError};
use crate::protocol::ErrorClass;

/// Errors raised while orchestrating the tunnel lifecycle.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TunnelError {
    /// A required request field is blank.
    #[error("invalid request: {0}")]
    Validation(#[from] SpecError),
    /// Create was requested while an instance carries the role prefix.
    #[error("tunnel already exists (label prefix '{prefix}')")]
    AlreadyExists {
        /// Role label prefix.
        prefix: String,
    },
    /// An operation needed the tunnel instance but none carries the prefix.
    #[error("tunnel does not exist (label prefix '{prefix}')")]
    DoesNotExist {
        /// Role label prefix.
        prefix: String,
    },
    /// No provisioning script with the configured label is owned by the
    /// account.
    #[error("provisioning script is missing: {label}")]
    ScriptMissing {
        /// Script label that was looked up.
        label: String,
    },
    /// The instance did not reach `running` within the poll budget.
    #[error("instance {id} took too long to come online ({attempts} status checks)")]
    ConvergenceTimeout {
        /// Instance that was polled.
        id: InstanceId,
        /// Number of status checks performed.
        attempts: u32,
    },
    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] LinodeError),
}

impl TunnelError {
    /// Classifies the error for reply status mapping.
    ///
    /// Structured 401 and 403 provider errors keep their meaning, as does a
    /// missing access token; everything else is unprocessable.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Provider(LinodeError::MissingCredentials) => ErrorClass::Unauthorized,
            Self::Provider(LinodeError::Provider(provider)) if provider.is_auth_error() => {
                ErrorClass::Unauthorized
            }
            Self::Provider(LinodeError::Provider(provider)) if provider.is_permissions_error() => {
                ErrorClass::Forbidden
            }
            _ => ErrorClass::Unprocessable,
        }
    }
}
