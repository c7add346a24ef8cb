//! Integration tests for SchemaRegistry and registry-mode building.
//!
//! Uses wiremock for HTTP mocking. Tests cover index/schema caching (fetch
//! counts via `.expect`), unknown kinds, status mapping and violation reports.

use serde_json::{json, Value};
use wachai_mandates::{
    BuildMode, MandateBuilder, MandateError, MandateRequest, RegistryConfig, SchemaRegistry,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
const CLIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

fn index_body() -> Value {
    json!({
        "specVersion": "0.1",
        "primitives": [
            {
                "kind": "swap@1",
                "name": "Swap",
                "version": 1,
                "schemaPath": "primitives/swap/swap@1.schema.json",
                "description": "Token swap"
            },
            {
                "kind": "bridge@1",
                "name": "Bridge",
                "version": 1,
                "schemaPath": "primitives/bridge/bridge@1.schema.json"
            }
        ]
    })
}

fn swap_schema_body() -> Value {
    json!({
        "kind": "swap@1",
        "version": 1,
        "payloadSchema": {
            "type": "object",
            "required": ["chainId", "tokenIn", "tokenOut", "amountIn", "minOut", "recipient", "deadline"],
            "properties": {
                "chainId": {"type": "integer"},
                "tokenIn": {"type": "string", "pattern": "^0x[0-9a-fA-F]{40}$"},
                "tokenOut": {"type": "string", "pattern": "^0x[0-9a-fA-F]{40}$"},
                "amountIn": {"type": "string"},
                "minOut": {"type": "string"},
                "recipient": {"type": "string"},
                "deadline": {"type": "string", "format": "date-time"}
            },
            "additionalProperties": false
        }
    })
}

fn swap_payload() -> Value {
    json!({
        "chainId": 1,
        "tokenIn": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        "tokenOut": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
        "amountIn": "100000000",
        "minOut": "41000000000000000",
        "recipient": CLIENT,
        "deadline": "2099-01-01T00:00:00.000Z"
    })
}

async fn mount_index(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/primitives/registry.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_swap_schema(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/primitives/swap/swap@1.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(swap_schema_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn create_registry(server: &MockServer) -> SchemaRegistry {
    let config = RegistryConfig::default().with_url(server.uri());
    SchemaRegistry::new(config).expect("failed to create registry")
}

#[tokio::test]
async fn test_fetch_index_once_per_base_url() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;

    let registry = create_registry(&mock_server);
    let first = registry.fetch_index(&mock_server.uri()).await.unwrap();
    let second = registry.fetch_index(&mock_server.uri()).await.unwrap();

    assert_eq!(first.spec_version, "0.1");
    assert_eq!(first.kinds(), second.kinds());
}

#[tokio::test]
async fn test_trailing_slash_base_url() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;

    let registry = create_registry(&mock_server);
    let base = format!("{}/", mock_server.uri());
    let primitive = registry.resolve_kind("swap@1", &base).await.unwrap();
    assert_eq!(primitive.schema_path, "primitives/swap/swap@1.schema.json");
}

#[tokio::test]
async fn test_fetch_schema_served_from_cache() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 1).await;

    let registry = create_registry(&mock_server);
    let first = registry
        .fetch_schema("swap@1", &mock_server.uri())
        .await
        .unwrap();
    let second = registry
        .fetch_schema("swap@1", &mock_server.uri())
        .await
        .unwrap();

    assert_eq!(first.kind, "swap@1");
    assert_eq!(first.payload_schema, second.payload_schema);
}

#[tokio::test]
async fn test_unknown_kind_lists_available_sorted() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 0).await;

    let registry = create_registry(&mock_server);
    let err = registry
        .fetch_schema("lend@1", &mock_server.uri())
        .await
        .unwrap_err();

    match &err {
        MandateError::UnknownKind { kind, available } => {
            assert_eq!(kind, "lend@1");
            assert_eq!(available, &vec!["bridge@1".to_string(), "swap@1".to_string()]);
        }
        other => panic!("expected UnknownKind, got {:?}", other),
    }
    assert!(err.to_string().contains("Available: bridge@1, swap@1"));
}

#[tokio::test]
async fn test_index_status_errors_are_unreachable() {
    for status in [404u16, 500, 503] {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/primitives/registry.json"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;

        let registry = create_registry(&mock_server);
        let err = registry
            .fetch_index(&mock_server.uri())
            .await
            .unwrap_err();
        match err {
            MandateError::RegistryUnreachable { url, message } => {
                assert!(url.ends_with("/primitives/registry.json"));
                assert_eq!(message, format!("HTTP {}", status));
            }
            other => panic!("expected RegistryUnreachable, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/primitives/registry.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_index(&mock_server, 1).await;

    let registry = create_registry(&mock_server);
    assert!(registry.fetch_index(&mock_server.uri()).await.is_err());
    assert!(registry.fetch_index(&mock_server.uri()).await.is_ok());
}

#[tokio::test]
async fn test_malformed_schema_body_is_unreachable() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    Mock::given(method("GET"))
        .and(path("/primitives/swap/swap@1.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let registry = create_registry(&mock_server);
    let err = registry
        .fetch_schema("swap@1", &mock_server.uri())
        .await
        .unwrap_err();
    assert!(matches!(err, MandateError::RegistryUnreachable { .. }));
}

#[tokio::test]
async fn test_unreachable_host() {
    let registry = SchemaRegistry::new(RegistryConfig::default().with_timeout_secs(2)).unwrap();
    let err = registry
        .fetch_index("http://127.0.0.1:9")
        .await
        .unwrap_err();
    assert!(matches!(err, MandateError::RegistryUnreachable { .. }));
}

#[tokio::test]
async fn test_swap_payload_builds_core() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 1).await;

    let builder = MandateBuilder::new(create_registry(&mock_server));
    let mode = BuildMode::Registry {
        base_url: mock_server.uri(),
    };
    let core = builder
        .build_core("swap@1", swap_payload(), &mode)
        .await
        .unwrap();

    assert_eq!(core.kind, "swap@1");
    assert_eq!(Value::Object(core.payload), swap_payload());
}

#[tokio::test]
async fn test_missing_min_out_is_named() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 1).await;

    let builder = MandateBuilder::new(create_registry(&mock_server));
    let mode = BuildMode::Registry {
        base_url: mock_server.uri(),
    };
    let mut payload = swap_payload();
    payload.as_object_mut().unwrap().remove("minOut");

    let err = builder
        .build_core("swap@1", payload, &mode)
        .await
        .unwrap_err();
    assert!(matches!(err, MandateError::Validation { .. }));
    let msg = err.to_string();
    assert!(msg.starts_with("payload does not match schema for swap@1:"));
    assert!(msg.lines().skip(1).any(|line| line.contains("minOut")));
}

#[tokio::test]
async fn test_all_violations_reported() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 1).await;

    let registry = create_registry(&mock_server);
    let mut payload = swap_payload();
    let obj = payload.as_object_mut().unwrap();
    obj.remove("minOut");
    obj.remove("amountIn");
    obj.insert("slippage".to_string(), json!("0.5"));

    let err = registry
        .validate("swap@1", &payload, &mock_server.uri())
        .await
        .unwrap_err();
    let MandateError::Validation { kind, violations } = err else {
        panic!("expected Validation");
    };
    assert_eq!(kind, "swap@1");
    assert!(violations.iter().any(|v| v.contains("minOut")));
    assert!(violations.iter().any(|v| v.contains("amountIn")));
    assert!(violations
        .iter()
        .any(|v| v == "<root>: unexpected property slippage"));
}

#[tokio::test]
async fn test_build_autofills_before_validating() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    mount_swap_schema(&mock_server, 1).await;

    let builder = MandateBuilder::new(create_registry(&mock_server));
    let mode = BuildMode::Registry {
        base_url: mock_server.uri(),
    };
    let mut payload = swap_payload();
    let obj = payload.as_object_mut().unwrap();
    obj.remove("recipient");
    obj.remove("deadline");
    obj.remove("chainId");

    let request = MandateRequest::new("swap@1", payload, 8453, SERVER, CLIENT).unwrap();
    let built = builder.build(request, &mode).await.unwrap();

    assert_eq!(built.autofilled.len(), 3);
    let record = built.record;
    assert_eq!(record.core.payload["recipient"], json!(CLIENT));
    assert_eq!(record.core.payload["chainId"], json!(8453));
    assert_eq!(record.core.payload["deadline"], json!(record.deadline));
    assert_eq!(
        record.intent,
        "Swap 100000000 of 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 for at least 41000000000000000 of 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
    );
}

#[tokio::test]
async fn test_uncompilable_schema_is_a_registry_error() {
    let mock_server = MockServer::start().await;
    mount_index(&mock_server, 1).await;
    Mock::given(method("GET"))
        .and(path("/primitives/swap/swap@1.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "swap@1",
            "version": 1,
            "payloadSchema": {"type": 12}
        })))
        .mount(&mock_server)
        .await;

    let registry = create_registry(&mock_server);
    let err = registry
        .validate("swap@1", &swap_payload(), &mock_server.uri())
        .await
        .unwrap_err();
    match err {
        MandateError::RegistryUnreachable { url, message } => {
            assert!(url.ends_with("/primitives/swap/swap@1.schema.json"));
            assert!(message.contains("invalid payload schema for swap@1"));
        }
        other => panic!("expected RegistryUnreachable, got {:?}", other),
    }
}
