// Copyright 2025 Pubdex (https://github.com/pubdex)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end pipeline scenarios against the in-process registry fixture.

mod common;

use common::{detail, manifest, FakeRegistry};
use pubdex_core::RegistryError;
use pubdex_registry::MemoCache;
use pubdex_server::rpc::RpcPipeline;
use pubdex_server::tools::{ToolContext, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn pipeline_with(fake: FakeRegistry) -> (RpcPipeline, Arc<FakeRegistry>) {
    let registry = Arc::new(fake);
    let api: Arc<dyn pubdex_registry::RegistryApi> = registry.clone() as Arc<dyn pubdex_registry::RegistryApi>;
    let ctx = Arc::new(ToolContext {
        registry: api,
        cache: Arc::new(MemoCache::default()),
    });
    (
        RpcPipeline::new(Arc::new(ToolRegistry::new()), ctx),
        registry,
    )
}

async fn call(pipeline: &RpcPipeline, payload: &str) -> Option<Value> {
    let cancel = CancellationToken::new();
    pipeline.handle_payload(payload.as_bytes(), &cancel).await
}

fn http_history() -> Vec<pubdex_core::model::VersionDetail> {
    vec![
        detail("1.3.0-beta.1", 0, ">=3.13.0 <4.0.0"),
        detail("1.2.1", 10, ">=3.13.0 <4.0.0"),
        detail("1.1.0", 200, ">=3.0.0 <4.0.0"),
    ]
}

#[tokio::test]
async fn test_unknown_method_is_32601() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"nope","params":{}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32601);
    assert!(response["error"]["message"].as_str().unwrap().contains("nope"));
    assert_eq!(response["id"], 1);
}

#[tokio::test]
async fn test_parse_error_is_32700_with_null_id() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(&pipeline, r#"{ "method": "search_packages" "#).await.unwrap();

    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn test_invalid_envelope_is_32600() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"1.0","id":7,"method":"latest_version"}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 7);
}

#[tokio::test]
async fn test_notification_produces_no_response() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","method":"latest_version","params":{"package":"http"}}"#,
    )
    .await;

    assert!(response.is_none());
}

#[tokio::test]
async fn test_failing_notification_is_silent() {
    let fake = FakeRegistry::default().failing(RegistryError::UpstreamUnavailable("503".into()));
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","method":"latest_version","params":{"package":"http"}}"#,
    )
    .await;

    assert!(response.is_none());
}

#[tokio::test]
async fn test_explicit_null_id_is_answered() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":null,"method":"latest_version","params":{"package":"http"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["id"], Value::Null);
    assert!(response["result"].is_object());
}

#[tokio::test]
async fn test_batch_preserves_request_order() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let payload = json!([
        {"jsonrpc": "2.0", "id": "first", "method": "latest_version", "params": {"package": "http"}},
        {"jsonrpc": "2.0", "method": "ping"},
        {"jsonrpc": "2.0", "id": "second", "method": "ping"},
        {"jsonrpc": "2.0", "id": "third", "method": "tools/list"},
    ])
    .to_string();
    let response = call(&pipeline, &payload).await.unwrap();

    let responses = response.as_array().unwrap();
    // The notification contributes nothing; order matches the requests.
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], "first");
    assert_eq!(responses[1]["id"], "second");
    assert_eq!(responses[2]["id"], "third");
}

#[tokio::test]
async fn test_all_notification_batch_has_no_body() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let payload = json!([
        {"jsonrpc": "2.0", "method": "ping"},
        {"jsonrpc": "2.0", "method": "ping"},
    ])
    .to_string();

    assert!(call(&pipeline, &payload).await.is_none());
}

#[tokio::test]
async fn test_empty_batch_is_32600() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(&pipeline, "[]").await.unwrap();
    assert_eq!(response["error"]["code"], -32600);
}

#[tokio::test]
async fn test_invalid_params_carry_field_errors() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":3,"method":"search_packages","params":{}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["id"], 3);
    let errors = response["error"]["data"]["errors"].as_array().unwrap();
    assert_eq!(errors[0]["field"], "query");
}

#[tokio::test]
async fn test_latest_version_skips_prerelease() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"latest_version","params":{"package":"http"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["result"]["version"], "1.2.1");
    assert_eq!(response["result"]["isPrerelease"], false);
}

#[tokio::test]
async fn test_compatibility_success() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"check_compatibility","params":{"package":"http","flutterSdk":"3.24.0"}}"#,
    )
    .await
    .unwrap();

    let result = &response["result"];
    assert_eq!(result["satisfies"], true);
    assert_eq!(result["recommendedVersion"]["version"], "1.2.1");
    assert!(result["explanation"].as_str().unwrap().contains("3.24.0"));
}

#[tokio::test]
async fn test_compatibility_failure() {
    let fake = FakeRegistry::default().with_history("http", http_history());
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"check_compatibility","params":{"package":"http","flutterSdk":"2.0.0"}}"#,
    )
    .await
    .unwrap();

    let result = &response["result"];
    assert_eq!(result["satisfies"], false);
    assert!(result.get("recommendedVersion").is_none());
    assert!(!result["evaluatedVersions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dependency_cycle_becomes_issue() {
    let fake = FakeRegistry::default()
        .with_manifest(manifest("a", "1.0.0", &[("b", "^2.0.0")]))
        .with_manifest(manifest("b", "2.0.0", &[("a", "^1.0.0")]));
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"dependency_inspector","params":{"package":"a"}}"#,
    )
    .await
    .unwrap();

    let result = &response["result"];
    let issues = result["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|issue| issue == "Detected circular dependency at a@1.0.0"));

    // One node per package: a at the root, b its only child, no third level.
    let root = &result["nodes"][0];
    assert_eq!(root["package"], "a");
    let children = root["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["package"], "b");
    assert!(children[0]["children"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_maps_to_32002() {
    let fake = FakeRegistry::default().failing(RegistryError::UpstreamUnavailable(
        "503 Service Unavailable".into(),
    ));
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":9,"method":"latest_version","params":{"package":"http"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32002);
    assert_eq!(response["id"], 9);
    assert!(response["error"]["data"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_cancellation_maps_to_32001() {
    let fake = FakeRegistry::default().failing(RegistryError::Cancelled);
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":4,"method":"latest_version","params":{"package":"http"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32001);
    assert_eq!(response["id"], 4);
}

#[tokio::test]
async fn test_cancellation_during_graph_traversal_maps_to_32001() {
    // The root resolution succeeds; cancellation surfaces on a nested
    // child lookup. The tool must fail, not hand back a graph with a
    // cancellation issue string.
    let fake = FakeRegistry::default()
        .with_manifest(manifest("app", "1.0.0", &[("ok_dep", "any"), ("slow_dep", "^2.0.0")]))
        .with_manifest(manifest("ok_dep", "1.4.0", &[]))
        .with_manifest(manifest("slow_dep", "2.0.0", &[]))
        .with_cancel_on("slow_dep");
    let (pipeline, _) = pipeline_with(fake);
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":11,"method":"dependency_inspector","params":{"package":"app"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32001);
    assert_eq!(response["id"], 11);
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_not_found_maps_to_internal_with_message() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());
    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":2,"method":"latest_version","params":{"package":"nosuch"}}"#,
    )
    .await
    .unwrap();

    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["data"].as_str().unwrap().contains("nosuch"));
}

#[tokio::test]
async fn test_initialize_and_tools_list() {
    let (pipeline, _) = pipeline_with(FakeRegistry::default());

    let init = call(&pipeline, r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
        .await
        .unwrap();
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "pubdex");

    let listing = call(&pipeline, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .await
        .unwrap();
    let tools = listing["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 8);
}

#[tokio::test]
async fn test_score_insights_memoized() {
    let fake = FakeRegistry::default();
    let (pipeline, registry) = pipeline_with(fake);

    for id in 1..=2 {
        let response = call(
            &pipeline,
            &format!(
                r#"{{"jsonrpc":"2.0","id":{id},"method":"score_insights","params":{{"package":"http"}}}}"#
            ),
        )
        .await
        .unwrap();
        assert_eq!(response["result"]["package"], "http");
        assert_eq!(response["result"]["popularity"], 0.98);
    }

    // Second call is served from the memo cache.
    assert_eq!(
        registry.score_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_dependency_dev_deps_only_at_root() {
    let mut app = manifest("app", "1.0.0", &[("http", "^1.0.0")]);
    app.dev_dependencies = vec![("lints".to_string(), "^3.0.0".to_string())];
    let fake = FakeRegistry::default()
        .with_manifest(app)
        .with_manifest(manifest("http", "1.2.1", &[]))
        .with_manifest(manifest("lints", "3.0.0", &[]));
    let (pipeline, _) = pipeline_with(fake);

    let response = call(
        &pipeline,
        r#"{"jsonrpc":"2.0","id":1,"method":"dependency_inspector","params":{"package":"app","includeDevDependencies":true}}"#,
    )
    .await
    .unwrap();

    let children = response["result"]["nodes"][0]["children"].as_array().unwrap();
    let names: Vec<_> = children.iter().map(|c| c["package"].as_str().unwrap()).collect();
    // Runtime deps first, dev deps appended.
    assert_eq!(names, vec!["http", "lints"]);
}
