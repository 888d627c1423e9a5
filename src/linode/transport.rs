//! Single-call transport executor.
//!
//! Each call is performed exactly once; retry policy belongs to callers.

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::LinodeApi;
use super::error::{ErrorBody, LinodeError, ProviderError};

/// Whether a call carries the bearer credential.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Access {
    /// Sent without credentials (public catalog endpoints).
    Public,
    /// Sent with `Authorization: Bearer <token>`.
    #[default]
    Authenticated,
}

/// Query parameters, headers and body attached to a call before execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestParts {
    access: Access,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl RequestParts {
    /// Starts an authenticated request.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Starts a request sent without credentials.
    #[must_use]
    pub fn public() -> Self {
        Self {
            access: Access::Public,
            ..Self::default()
        }
    }

    /// Returns how the request authenticates.
    #[must_use]
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Sets or replaces a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_query(name, value);
        self
    }

    /// Sets or replaces a query parameter in place.
    pub fn set_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let key = name.into();
        let val = value.into();
        if let Some(existing) = self.query.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = val;
        } else {
            self.query.push((key, val));
        }
    }

    /// Returns the value of a query parameter, if set.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl LinodeApi {
    /// Performs one HTTP call against the API base URL and decodes the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`LinodeError::MissingCredentials`] before any I/O when an
    /// authenticated call is made without a token,
    /// [`LinodeError::Transport`] when no response arrives,
    /// [`LinodeError::Provider`] or [`LinodeError::Api`] for statuses above
    /// 299, and [`LinodeError::Decode`] when a successful body cannot be
    /// decoded into `T`.
    pub async fn execute<T>(
        &self,
        method: Method,
        endpoint: &str,
        parts: RequestParts,
    ) -> Result<T, LinodeError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        let mut request = self.client.request(method.clone(), &url);

        if parts.access == Access::Authenticated {
            let token = self
                .token
                .as_deref()
                .ok_or(LinodeError::MissingCredentials)?;
            request = request.bearer_auth(token);
        }
        if !parts.query.is_empty() {
            request = request.query(&parts.query);
        }
        for (name, value) in &parts.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &parts.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| transport_error(&method, endpoint, &err))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(&method, endpoint, &err))?;

        if status > 299 {
            return Err(classify_failure(&method, endpoint, status, &body));
        }
        decode_body(endpoint, &body)
    }
}

fn transport_error(method: &Method, endpoint: &str, err: &reqwest::Error) -> LinodeError {
    LinodeError::Transport {
        method: method.as_str().to_owned(),
        endpoint: endpoint.to_owned(),
        message: err.to_string(),
    }
}

/// Turns a non-2xx response into the matching error variant.
pub(crate) fn classify_failure(
    method: &Method,
    endpoint: &str,
    status: u16,
    body: &[u8],
) -> LinodeError {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body)
        && !parsed.errors.is_empty()
    {
        return LinodeError::Provider(ProviderError {
            errors: parsed.errors,
            status,
        });
    }

    let details = if body.is_empty() {
        String::from("no error object, details missing")
    } else {
        String::from_utf8_lossy(body).into_owned()
    };
    LinodeError::Api {
        method: method.as_str().to_owned(),
        endpoint: endpoint.to_owned(),
        status,
        details,
    }
}

fn decode_body<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, LinodeError> {
    let payload: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(payload).map_err(|err| LinodeError::Decode {
        endpoint: endpoint.to_owned(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, true, false)]
    #[case(403, false, true)]
    #[case(400, false, false)]
    fn structured_errors_carry_status_flags(
        #[case] status: u16,
        #[case] auth: bool,
        #[case] permissions: bool,
    ) {
        let body = br#"{"errors":[{"field":"region","reason":"region is not valid"}]}"#;
        let err = classify_failure(&Method::POST, "/linode/instances", status, body);
        let provider = err
            .as_provider()
            .unwrap_or_else(|| panic!("expected provider error, got {err:?}"));
        assert_eq!(provider.is_auth_error(), auth);
        assert_eq!(provider.is_permissions_error(), permissions);
        assert_eq!(err.to_string(), "region is not valid (field 'region')");
    }

    #[test]
    fn missing_error_body_names_method_and_endpoint() {
        let err = classify_failure(&Method::GET, "/regions", 500, b"");
        assert_eq!(
            err,
            LinodeError::Api {
                method: String::from("GET"),
                endpoint: String::from("/regions"),
                status: 500,
                details: String::from("no error object, details missing"),
            }
        );
    }

    #[test]
    fn empty_error_list_is_not_structured() {
        let err = classify_failure(&Method::GET, "/images", 502, br#"{"errors":[]}"#);
        assert!(matches!(err, LinodeError::Api { status: 502, .. }));
    }

    #[test]
    fn request_wide_errors_render_without_field() {
        let err = ProviderError {
            errors: vec![
                crate::linode::FieldError {
                    field: String::new(),
                    reason: String::from("Invalid Token"),
                },
                crate::linode::FieldError {
                    field: String::from("type"),
                    reason: String::from("type is required"),
                },
            ],
            status: 401,
        };
        assert_eq!(
            err.to_string(),
            "Invalid Token;type is required (field 'type')"
        );
    }

    #[test]
    fn empty_success_body_decodes_as_unit() {
        let decoded: Result<serde::de::IgnoredAny, _> = decode_body("/linode/instances/1", b"");
        assert!(decoded.is_ok());
    }

    #[test]
    fn query_parameters_are_replaced_not_duplicated() {
        let parts = RequestParts::authenticated()
            .query("page", "2")
            .query("page", "3");
        assert_eq!(parts.query_value("page"), Some("3"));
        assert_eq!(parts.query.len(), 1);
    }
}
