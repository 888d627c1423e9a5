//! Error types for the Linode control-plane client.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One `{field, reason}` entry from a provider error body.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldError {
    /// Request field the error refers to; empty for request-wide errors.
    #[serde(default)]
    pub field: String,
    /// Provider explanation.
    #[serde(default)]
    pub reason: String,
}

/// Structured error decoded from a non-2xx provider response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderError {
    /// Entries in the order the provider reported them.
    pub errors: Vec<FieldError>,
    /// HTTP status of the response the error was decoded from.
    pub status: u16,
}

impl ProviderError {
    /// Returns true when the provider rejected the credentials (HTTP 401).
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        self.status == 401
    }

    /// Returns true when the credentials lack a required scope (HTTP 403).
    #[must_use]
    pub const fn is_permissions_error(&self) -> bool {
        self.status == 403
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            if entry.field.is_empty() {
                f.write_str(&entry.reason)?;
            } else {
                write!(f, "{} (field '{}')", entry.reason, entry.field)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

/// Body shape of a provider error response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) errors: Vec<FieldError>,
}

/// Errors raised by the Linode client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LinodeError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("{method} request ('{endpoint}') failed: {message}")]
    Transport {
        /// HTTP method of the failed call.
        method: String,
        /// Endpoint relative to the API base URL.
        endpoint: String,
        /// Underlying client error.
        message: String,
    },
    /// The provider answered with a structured error body.
    #[error("{0}")]
    Provider(ProviderError),
    /// The provider answered with a non-2xx status and no usable error body.
    #[error("API error ({method} '{endpoint}'): status {status}: {details}")]
    Api {
        /// HTTP method of the failed call.
        method: String,
        /// Endpoint relative to the API base URL.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Raw body or a placeholder when the body was empty.
        details: String,
    },
    /// A successful response could not be decoded.
    #[error("unable to decode response from {endpoint}: {message}")]
    Decode {
        /// Endpoint relative to the API base URL.
        endpoint: String,
        /// Decoder error message.
        message: String,
    },
    /// A request body could not be encoded.
    #[error("unable to encode request body for {endpoint}: {message}")]
    Encode {
        /// Endpoint relative to the API base URL.
        endpoint: String,
        /// Encoder error message.
        message: String,
    },
    /// The HTTP client could not be constructed from the settings.
    #[error("unable to build HTTP client: {message}")]
    Client {
        /// Builder error message.
        message: String,
    },
    /// An authenticated endpoint was called on a client without a token.
    #[error("an access token is required for this request")]
    MissingCredentials,
}

impl LinodeError {
    /// Returns the structured provider error, when there is one.
    #[must_use]
    pub const fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}
