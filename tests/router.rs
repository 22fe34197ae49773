//! Router integration tests over static discovery and mock adapters.

mod common;

use std::sync::Arc;

use serde_json::json;
use svcdispatch::adapters::AdapterError;
use svcdispatch::discovery::instance::TYPE_ATTR;
use svcdispatch::discovery::{Discovery, DiscoveryError, InstanceSet, StaticDiscovery};
use svcdispatch::{
    Backends, DiscoveredInstance, DispatchRequest, Operation, PublishReceipt, Router,
    RouterError, SendOptions,
};

use common::router;

#[tokio::test]
async fn test_request_resolves_handler_to_function() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "test-service", DiscoveredInstance::function("my-func", "arn:my-func"))
        .with_instance("default", "test-service", DiscoveredInstance::function("other", "arn:other"));
    let (router, mocks) = router(discovery);
    mocks.functions.set_response(json!({"result": "ok"})).await;

    let result = router
        .request("test-service->my-func", json!({"input": 1}))
        .await
        .unwrap();

    assert_eq!(result, json!({"result": "ok"}));
    assert_eq!(
        mocks.functions.calls().await,
        vec![("arn:my-func".to_string(), json!({"input": 1}))]
    );
}

#[tokio::test]
async fn test_publish_to_namespaced_topic() {
    let discovery = StaticDiscovery::new().with_instance(
        "test-namespace",
        "test-topic",
        DiscoveredInstance::sns("test-topic", "test-topic"),
    );
    let (router, mocks) = router(discovery);
    mocks.topics.set_message_id("abc123").await;
    let event = json!({"type": "OrderPlaced", "id": 9});

    let receipt = router
        .publish("test-namespace.test-topic", event.clone())
        .await
        .unwrap();

    assert_eq!(receipt, PublishReceipt::new("abc123"));
    assert_eq!(
        serde_json::to_value(&receipt).unwrap(),
        json!({"MessageId": "abc123"})
    );
    let published = mocks.topics.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "test-topic");
    assert_eq!(published[0].1, event);
}

#[tokio::test]
async fn test_empty_instance_set_is_not_found_for_every_operation() {
    let (router, mocks) = router(StaticDiscovery::new());

    let call = router.call(DispatchRequest::new("missing", json!({}))).await;
    let publish = router.publish("missing", json!({})).await;
    let queue = router.queue("missing", json!({}), None).await;
    let listen = router.listen("missing").await;

    assert!(call.unwrap_err().is_not_found());
    assert!(publish.unwrap_err().is_not_found());
    assert!(queue.unwrap_err().is_not_found());
    assert!(listen.unwrap_err().is_not_found());
    assert!(mocks.functions.calls().await.is_empty());
    assert!(mocks.topics.published().await.is_empty());
    assert!(mocks.queues.sent().await.is_empty());
}

#[tokio::test]
async fn test_default_namespace_applies_without_separator() {
    let discovery = StaticDiscovery::new()
        .with_instance("billing", "invoices", DiscoveredInstance::function("render", "arn:render"));
    let (router, _mocks) = router(discovery);

    assert!(router.request("invoices", json!({})).await.unwrap_err().is_not_found());

    let router = router.with_default_namespace("billing");
    assert!(router.request("invoices", json!({})).await.is_ok());
    assert!(router.request("billing.invoices->render", json!({})).await.is_ok());
}

#[tokio::test]
async fn test_service_keeps_later_separators() {
    let discovery = StaticDiscovery::new()
        .with_instance("ops", "jobs.eu", DiscoveredInstance::queue("jobs", "https://q/jobs-eu"));
    let (router, mocks) = router(discovery);

    router.queue("ops.jobs.eu", json!("run"), None).await.unwrap();

    assert_eq!(mocks.queues.sent().await[0].0, "https://q/jobs-eu");
}

#[tokio::test]
async fn test_malformed_address_is_parse_error() {
    let (router, _mocks) = router(StaticDiscovery::new());

    for address in ["", "ns.", "->h", "svc->"] {
        let result = router.request(address, json!({})).await;
        assert!(
            matches!(result, Err(RouterError::Parse(_))),
            "expected parse error for {:?}",
            address
        );
    }
}

#[tokio::test]
async fn test_several_instances_without_handler_is_ambiguous() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "svc", DiscoveredInstance::function("a", "arn:a"))
        .with_instance("default", "svc", DiscoveredInstance::function("b", "arn:b"));
    let (router, mocks) = router(discovery);

    let result = router.request("svc", json!({})).await;

    assert!(matches!(
        result,
        Err(RouterError::AmbiguousTarget { candidates: 2, .. })
    ));
    assert!(mocks.functions.calls().await.is_empty());
}

#[tokio::test]
async fn test_unknown_handler_is_not_found() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "svc", DiscoveredInstance::function("a", "arn:a"));
    let (router, _mocks) = router(discovery);

    let result = router.request("svc->zzz", json!({})).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_duplicate_handler_ids_use_first_match() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "svc", DiscoveredInstance::function("dup", "arn:first"))
        .with_instance("default", "svc", DiscoveredInstance::function("dup", "arn:second"));
    let (router, mocks) = router(discovery);

    router.request("svc->dup", json!({})).await.unwrap();

    assert_eq!(mocks.functions.calls().await[0].0, "arn:first");
}

#[tokio::test]
async fn test_state_machine_and_automation_targets() {
    let discovery = StaticDiscovery::new()
        .with_instance("ops", "workflows", DiscoveredInstance::state_machine("checkout", "arn:sfn"))
        .with_instance("ops", "workflows", DiscoveredInstance::automation("restart", "RestartService"));
    let (router, mocks) = router(discovery);
    mocks
        .state_machines
        .set_response(json!({"executionArn": "arn:exec:1"}))
        .await;

    let started = router
        .call(DispatchRequest::new("ops.workflows", json!({"cart": 3})).with_handler("checkout"))
        .await
        .unwrap();
    router
        .request("ops.workflows->restart", json!({"InstanceId": ["i-1"]}))
        .await
        .unwrap();

    assert_eq!(started["executionArn"], "arn:exec:1");
    assert_eq!(
        mocks.automation.calls().await,
        vec![("RestartService".to_string(), json!({"InstanceId": ["i-1"]}))]
    );
}

#[tokio::test]
async fn test_request_on_queue_instance_is_unsupported() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "jobs", DiscoveredInstance::queue("jobs", "https://q"));
    let (router, mocks) = router(discovery);

    let result = router.request("jobs", json!({})).await;

    assert!(matches!(
        result,
        Err(RouterError::UnsupportedBackend { operation: Operation::Call, .. })
    ));
    assert!(mocks.queues.sent().await.is_empty());
}

#[tokio::test]
async fn test_unknown_type_is_unsupported() {
    let discovery = StaticDiscovery::new().with_instance(
        "default",
        "stream",
        DiscoveredInstance::new("stream").with_attribute(TYPE_ATTR, "kinesis"),
    );
    let (router, _mocks) = router(discovery);

    let result = router.request("stream", json!({})).await;
    assert!(matches!(result, Err(RouterError::UnsupportedBackend { .. })));
}

#[tokio::test]
async fn test_publish_filters_mixed_kind_set() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "orders", DiscoveredInstance::function("handler", "arn:f"))
        .with_instance("default", "orders", DiscoveredInstance::sns("events", "arn:topic"))
        .with_instance("default", "orders", DiscoveredInstance::queue("work", "https://q"));
    let (router, mocks) = router(discovery);

    router.publish("orders", json!({"e": 1})).await.unwrap();
    router.queue("orders", json!({"w": 1}), None).await.unwrap();

    assert_eq!(mocks.topics.published().await[0].0, "arn:topic");
    assert_eq!(mocks.queues.sent().await[0].0, "https://q");
}

#[tokio::test]
async fn test_publish_without_topic_instance_is_not_found() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "orders", DiscoveredInstance::function("handler", "arn:f"));
    let (router, _mocks) = router(discovery);

    let result = router.publish("orders", json!({})).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_options_forwarded_verbatim() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "orders.fifo", DiscoveredInstance::sns("t", "arn:t.fifo"))
        .with_instance("default", "jobs.fifo", DiscoveredInstance::queue("q", "https://q.fifo"));
    let (router, mocks) = router(discovery);
    let options = SendOptions::fifo("customer-1", "order-1").with_attribute("source", "web");

    router
        .publish_with("default.orders.fifo", json!({}), options.clone())
        .await
        .unwrap();
    router
        .queue("default.jobs.fifo", json!({}), Some(options.clone()))
        .await
        .unwrap();

    assert_eq!(mocks.topics.published().await[0].2, options);
    assert_eq!(mocks.queues.sent().await[0].2, options);
}

#[tokio::test]
async fn test_adapter_error_surfaces_unchanged() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "svc", DiscoveredInstance::function("f", "arn:f"));
    let (router, mocks) = router(discovery);
    let err = AdapterError::FunctionError {
        kind: "Unhandled".to_string(),
        payload: r#"{"errorMessage":"boom"}"#.to_string(),
    };
    mocks.functions.set_failure(Some(err.clone())).await;

    let result = router.request("svc", json!({})).await;

    assert!(matches!(result, Err(RouterError::Adapter(e)) if e == err));
}

struct FailingDiscovery;

#[async_trait::async_trait]
impl Discovery for FailingDiscovery {
    async fn discover(&self, namespace: &str, service: &str) -> svcdispatch::discovery::Result<InstanceSet> {
        Err(DiscoveryError::Lookup {
            namespace: namespace.to_string(),
            service: service.to_string(),
            message: "registry unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_discovery_error_surfaces_unchanged() {
    let router = Router::new(Arc::new(FailingDiscovery), Backends::new());

    let result = router.publish("ops.events", json!({})).await;

    assert!(matches!(
        result,
        Err(RouterError::Discovery(DiscoveryError::Lookup { namespace, .. })) if namespace == "ops"
    ));
}

#[tokio::test]
async fn test_every_call_rediscovers() {
    let discovery = Arc::new(StaticDiscovery::new());
    let mocks = common::Mocks::new();
    let router = Router::new(discovery.clone(), mocks.backends());

    assert!(router.request("svc", json!({})).await.unwrap_err().is_not_found());

    discovery
        .register("default", "svc", DiscoveredInstance::function("f", "arn:f"))
        .await;
    assert!(router.request("svc", json!({})).await.is_ok());

    discovery.deregister("default", "svc", "f").await;
    assert!(router.request("svc", json!({})).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_missing_adapter_is_unsupported() {
    let discovery = StaticDiscovery::new()
        .with_instance("default", "svc", DiscoveredInstance::function("f", "arn:f"));
    let router = Router::new(Arc::new(discovery), Backends::new());

    let result = router.request("svc", json!({})).await;
    assert!(matches!(result, Err(RouterError::UnsupportedBackend { .. })));
}
