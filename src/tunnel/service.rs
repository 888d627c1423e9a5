//! Per-request entry point used by the transport layer and the CLI.

use crate::config::BurrowConfig;
use crate::events::{EventSink, TunnelEvent};
use crate::linode::{LinodeApi, LinodeError};
use crate::protocol::{ProtocolError, TunnelRequest, TunnelResponse};

use super::{TunnelError, TunnelOrchestrator};

/// Builds a provider client for `request` and runs it.
///
/// The request's access token wins over the configured fallback. A request
/// with neither fails its authenticated calls before any network I/O. A
/// client that cannot be built fails the request without dispatching it.
pub async fn handle_request<E>(
    config: &BurrowConfig,
    sink: E,
    request: &TunnelRequest,
) -> TunnelResponse
where
    E: EventSink,
{
    let operation = request.operation();
    sink.emit(TunnelEvent::RequestReceived { operation });

    let api = match client_for(config, &request.credentials().access_token) {
        Ok(api) => api,
        Err(err) => {
            sink.emit(TunnelEvent::ProviderFailure {
                operation,
                message: err.to_string(),
            });
            return TunnelResponse::failed(operation, &TunnelError::Provider(err));
        }
    };
    TunnelOrchestrator::new(api, sink)
        .with_defaults(config.tunnel_defaults())
        .with_policy(config.policy())
        .dispatch(request)
        .await
}

/// Decodes a plaintext request, runs it and encodes the reply.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the payload cannot be decoded or the reply
/// cannot be encoded. Operation failures are part of the encoded reply.
pub async fn handle_payload<E>(
    config: &BurrowConfig,
    sink: E,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError>
where
    E: EventSink,
{
    let request = TunnelRequest::decode(payload)?;
    handle_request(config, sink, &request).await.encode()
}

fn client_for(config: &BurrowConfig, request_token: &str) -> Result<LinodeApi, LinodeError> {
    let settings = config.api_settings();
    let token = Some(request_token)
        .filter(|token| !token.trim().is_empty())
        .or(config.access_token.as_deref());
    match token {
        Some(bearer) => LinodeApi::new(&settings, bearer),
        None => LinodeApi::unauthenticated(&settings),
    }
}
