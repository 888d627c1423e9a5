//! End-to-end tests driving requests through the Linode client against a
//! mock provider.

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use burrow::test_support::RecordingSink;
use burrow::{
    Authenticated, BurrowConfig, CreateTunnel, Credentials, Operation, TunnelEvent, TunnelRequest,
    TunnelSettings, handle_payload, handle_request,
};

const TOKEN: &str = "request-token";

fn config_for(server: &MockServer) -> BurrowConfig {
    BurrowConfig {
        api_base_url: server.uri(),
        poll_interval_secs: 0,
        max_poll_attempts: 3,
        http_timeout_secs: 5,
        ..BurrowConfig::builtin()
    }
}

fn instance_json(id: u64, label: &str, status: &str) -> Value {
    json!({
        "id": id,
        "label": label,
        "group": "",
        "region": "eu-central",
        "type": "g6-nanode-1",
        "image": "linode/debian12",
        "status": status,
        "ipv4": ["192.0.2.44"],
        "ipv6": "2001:db8::44/128",
        "created": "2026-03-01T10:00:00",
        "updated": "2026-03-01T10:00:00",
        "hypervisor": "kvm",
        "specs": { "disk": 25600, "memory": 1024, "vcpus": 1, "transfer": 1000 }
    })
}

fn single_page(items: Vec<Value>) -> Value {
    let results = items.len();
    json!({ "data": items, "page": 1, "pages": 1, "results": results })
}

async fn mount_listing(server: &MockServer, endpoint: &str, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(single_page(items)))
        .mount(server)
        .await;
}

fn create_request(region: &str) -> TunnelRequest {
    TunnelRequest::Create(CreateTunnel {
        auth: Credentials::new(TOKEN),
        plan: String::from("g6-nanode-1"),
        region: region.to_owned(),
        tunnel: TunnelSettings::default(),
    })
}

#[tokio::test]
async fn create_provisions_and_waits_for_running() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/linode/instances",
        vec![instance_json(7, "web-frontend", "running")],
    )
    .await;
    mount_listing(
        &server,
        "/linode/stackscripts",
        vec![json!({ "id": 42, "label": "burrow_node", "images": ["linode/debian12"] })],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/linode/instances"))
        .and(header("Authorization", "Bearer request-token"))
        .and(body_partial_json(json!({
            "type": "g6-nanode-1",
            "region": "eu-central",
            "image": "linode/debian12",
            "stackscript_id": 42,
            "stackscript_data": { "udf_enable_wireguard": 0, "udf_enable_obfs4": 0 },
            "booted": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(instance_json(123, "burrow_tunnel-0a1b2c3d", "provisioning")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/linode/instances/123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(instance_json(123, "burrow_tunnel-0a1b2c3d", "booting")),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/linode/instances/123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(instance_json(123, "burrow_tunnel-0a1b2c3d", "running")),
        )
        .with_priority(5)
        .mount(&server)
        .await;

    let sink = RecordingSink::new();
    let response = handle_request(
        &config_for(&server),
        sink.clone(),
        &create_request("eu-central"),
    )
    .await;

    assert_eq!(response.status(), 200, "unexpected reply: {response:?}");
    let encoded = response
        .encode()
        .unwrap_or_else(|err| panic!("reply should encode: {err}"));
    let reply: Value =
        serde_json::from_slice(&encoded).unwrap_or_else(|err| panic!("reply is JSON: {err}"));
    assert_eq!(reply["verb"], "create");
    assert_eq!(reply["outcome"]["ok"]["status"], "running");
    assert_eq!(reply["outcome"]["ok"]["ipv4"][0], "192.0.2.44");

    let requests = server.received_requests().await.unwrap_or_default();
    let polls = requests
        .iter()
        .filter(|req| req.url.path() == "/linode/instances/123")
        .count();
    assert_eq!(polls, 2);

    let events = sink.events();
    assert!(matches!(
        events.first(),
        Some(TunnelEvent::RequestReceived {
            operation: Operation::Create
        })
    ));
    assert!(matches!(
        events.last(),
        Some(TunnelEvent::InstanceReady { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn create_with_blank_region_fails_without_network() {
    let server = MockServer::start().await;

    let response = handle_request(
        &config_for(&server),
        RecordingSink::new(),
        &create_request(""),
    )
    .await;

    assert_eq!(response.status(), 422);
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty(), "no provider call expected: {requests:?}");
}

#[tokio::test]
async fn rejected_token_is_reported_as_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/linode/instances"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "reason": "Invalid Token" }]
        })))
        .mount(&server)
        .await;

    let payload = br#"{"verb": "status", "auth": {"access_token": "stale"}}"#;
    let encoded = handle_payload(&config_for(&server), RecordingSink::new(), payload)
        .await
        .unwrap_or_else(|err| panic!("payload should round-trip: {err}"));
    let reply: Value =
        serde_json::from_slice(&encoded).unwrap_or_else(|err| panic!("reply is JSON: {err}"));

    assert_eq!(reply["verb"], "status");
    assert_eq!(reply["outcome"]["err"]["class"], "unauthorized");
    assert_eq!(
        reply["outcome"]["err"]["error"]["details"][0]["reason"],
        "Invalid Token"
    );
}

#[tokio::test]
async fn destroy_deletes_only_the_tunnel() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/linode/instances",
        vec![
            instance_json(7, "web-frontend", "running"),
            instance_json(9, "burrow_tunnel-feedface", "running"),
        ],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/linode/instances/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let response = handle_request(
        &config_for(&server),
        RecordingSink::new(),
        &TunnelRequest::Destroy(Authenticated {
            auth: Credentials::new(TOKEN),
        }),
    )
    .await;

    assert!(response.is_success(), "unexpected reply: {response:?}");
}

#[tokio::test]
async fn configured_token_backs_requests_without_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/linode/stackscripts"))
        .and(header("Authorization", "Bearer configured-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(single_page(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let config = BurrowConfig {
        access_token: Some(String::from("configured-token")),
        ..config_for(&server)
    };
    let response = handle_request(
        &config,
        RecordingSink::new(),
        &TunnelRequest::ListScripts(Authenticated::default()),
    )
    .await;

    assert!(response.is_success(), "unexpected reply: {response:?}");
}

#[tokio::test]
async fn malformed_payload_is_a_protocol_error() {
    let server = MockServer::start().await;
    let result = handle_payload(&config_for(&server), RecordingSink::new(), b"{\"verb\": 7}").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unbuildable_client_fails_the_request_before_dispatch() {
    let server = MockServer::start().await;
    let config = BurrowConfig {
        user_agent: String::from("burrow\nbroken"),
        ..config_for(&server)
    };

    let sink = RecordingSink::new();
    let response = handle_request(
        &config,
        sink.clone(),
        &TunnelRequest::ListRegions(Authenticated::default()),
    )
    .await;

    assert_eq!(response.operation(), Operation::ListRegions);
    assert_eq!(response.status(), 422);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(matches!(
        sink.events().last(),
        Some(TunnelEvent::ProviderFailure {
            operation: Operation::ListRegions,
            ..
        })
    ));
}
