mod common;

use std::sync::Arc;

use arkimage::server::jsonrpc::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use arkimage::{default_registry, DownloadPolicy, ToolServer};
use common::{pipeline, FakeFetcher, FakeProvider};
use serde_json::{json, Value};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-png-body";

fn server_with(provider: FakeProvider, fetcher: FakeFetcher) -> ToolServer {
    let pipeline = pipeline(
        Arc::new(provider),
        Arc::new(fetcher),
        DownloadPolicy::BestEffort,
    );
    ToolServer::new(default_registry(Arc::new(pipeline)).unwrap())
}

fn idle_server() -> ToolServer {
    server_with(FakeProvider::returning(&[]), FakeFetcher::new())
}

fn request(id: u64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

#[tokio::test]
async fn initialize_echoes_protocol_version() {
    let server = idle_server();
    let response = server
        .handle_message(&request(
            1,
            "initialize",
            json!({"protocolVersion": "2025-03-26"}),
        ))
        .await
        .unwrap();

    let result = response.result.unwrap();
    assert_eq!(response.id, json!(1));
    assert_eq!(result["protocolVersion"], "2025-03-26");
    assert_eq!(result["serverInfo"]["name"], "arkimage");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_contains_both_tools_sorted() {
    let server = idle_server();
    let response = server
        .handle_message(&request(2, "tools/list", json!({})))
        .await
        .unwrap();

    let tools = response.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["compress_images", "generate_images"]);
    assert_eq!(tools[1]["inputSchema"]["required"], json!(["prompt"]));
    assert_eq!(
        tools[1]["inputSchema"]["properties"]["num_images"]["maximum"],
        3
    );
}

#[tokio::test]
async fn tools_call_returns_summary_and_structured_result() {
    let dir = tempfile::tempdir().unwrap();
    let server = server_with(
        FakeProvider::returning(&["https://cdn.example/1"]),
        FakeFetcher::new().serve("https://cdn.example/1", Some("image/png"), PNG),
    );

    let response = server
        .handle_message(&request(
            3,
            "tools/call",
            json!({
                "name": "generate_images",
                "arguments": {"prompt": "a lighthouse", "output_dir": dir.path().to_string_lossy()}
            }),
        ))
        .await
        .unwrap();

    let result = response.result.unwrap();
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["count"], 1);
    let local_path = result["structuredContent"]["images"][0]["local_path"]
        .as_str()
        .unwrap();
    assert!(local_path.ends_with("image_001.png"));
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Generated 1 images:"));
    assert!(text.contains("Download summary: 1/1 images saved successfully"));
}

#[tokio::test]
async fn tool_validation_failure_is_a_tool_error_not_an_rpc_error() {
    let server = idle_server();
    let response = server
        .handle_message(&request(
            4,
            "tools/call",
            json!({"name": "generate_images", "arguments": {"prompt": "p", "num_images": 4}}),
        ))
        .await
        .unwrap();

    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let detail = &result["structuredContent"]["error"];
    assert_eq!(detail["kind"], "validation_error");
    assert_eq!(detail["field"], "num_images");
}

#[tokio::test]
async fn provider_failure_is_reported_with_its_kind() {
    let server = server_with(
        FakeProvider::failing("AuthenticationError", "bad key"),
        FakeFetcher::new(),
    );
    let dir = tempfile::tempdir().unwrap();
    let response = server
        .handle_message(&request(
            5,
            "tools/call",
            json!({
                "name": "generate_images",
                "arguments": {"prompt": "p", "output_dir": dir.path().to_string_lossy()}
            }),
        ))
        .await
        .unwrap();

    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["kind"], "provider_error");
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("AuthenticationError"));
    assert!(text.contains("bad key"));
}

#[tokio::test]
async fn protocol_errors_use_jsonrpc_codes() {
    let server = idle_server();

    let unknown_tool = server
        .handle_message(&request(6, "tools/call", json!({"name": "paint"})))
        .await
        .unwrap();
    assert_eq!(unknown_tool.error.unwrap().code, INVALID_PARAMS);

    let missing_name = server
        .handle_message(&request(7, "tools/call", json!({})))
        .await
        .unwrap();
    assert_eq!(missing_name.error.unwrap().code, INVALID_PARAMS);

    let unknown_method = server
        .handle_message(&request(8, "resources/list", json!({})))
        .await
        .unwrap();
    assert_eq!(unknown_method.error.unwrap().code, METHOD_NOT_FOUND);

    let bad_version = server
        .handle_message(r#"{"jsonrpc":"1.0","id":9,"method":"ping"}"#)
        .await
        .unwrap();
    assert_eq!(bad_version.error.unwrap().code, INVALID_REQUEST);

    let garbage = server.handle_message("{not json").await.unwrap();
    assert_eq!(garbage.id, Value::Null);
    assert_eq!(garbage.error.unwrap().code, PARSE_ERROR);
}

#[tokio::test]
async fn notifications_get_no_response() {
    let server = idle_server();
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn serve_answers_each_request_line() {
    let server = idle_server();
    let input = [
        request(1, "ping", json!({})),
        String::new(),
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string(),
        request(2, "tools/list", json!({})),
    ]
    .join("\n");

    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[0]["result"], json!({}));
    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[1]["result"]["tools"].as_array().unwrap().len(), 2);
}
