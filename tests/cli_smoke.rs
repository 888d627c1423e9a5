//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("burrow");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_lifecycle_subcommands() {
    let mut cmd = cargo_bin_cmd!("burrow");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("list-regions"));
}

#[test]
fn create_requires_plan() {
    let mut cmd = cargo_bin_cmd!("burrow");
    cmd.args(["create", "--region", "eu-central"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--plan"));
}

#[tokio::test]
async fn list_regions_prints_encoded_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "eu-central", "country": "de" }],
            "page": 1,
            "pages": 1,
            "results": 1
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("burrow")
            .arg("list-regions")
            .env("BURROW_API_BASE_URL", uri)
            .env_remove("BURROW_ACCESS_TOKEN")
            .output()
    })
    .await
    .unwrap_or_else(|err| panic!("join: {err}"))
    .unwrap_or_else(|err| panic!("spawn burrow: {err}"));

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let reply: Value = serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|err| panic!("stdout should be JSON: {err}"));
    assert_eq!(reply["verb"], "list_regions");
    assert_eq!(reply["outcome"]["ok"][0]["id"], "eu-central");
}
