use lgr_core::{codes, ResponseStatus, ServiceError, ServiceOperation};
use lgr_test_utils::{empty_service, handler, service_with, tags, EventBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

fn titles(response: &lgr_core::HandlerResponse) -> Vec<&str> {
    response.logs.iter().map(|log| log.title.as_str()).collect()
}

#[tokio::test]
async fn creates_missing_log_group() {
    let handler = handler(empty_service());
    let event = EventBuilder::upsert(json!({"name": "/aws/app", "tags": {"env": "prod"}})).build();

    let response = handler.handle(&event).await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.progress, 100);
    assert_eq!(
        response.props,
        json!({
            "kms_key_id": null,
            "name": "/aws/app",
            "arn": "arn:aws:logs:us-east-1:123456789012:log-group//aws/app",
            "star_arn": "arn:aws:logs:us-east-1:123456789012:log-group:/aws/app:*"
        })
        .as_object()
        .cloned()
        .unwrap()
    );
    assert_eq!(
        response.links["Log Group"],
        json!("https://us-east-1.console.aws.amazon.com/cloudwatch/home?region=us-east-1#logsV2:log-groups/log-group/$252Faws$252Fapp")
    );
    assert_eq!(
        handler.service().get("/aws/app").map(|group| group.tags),
        Some(tags(&[("env", "prod")]))
    );
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let handler = handler(empty_service());
    let definition = json!({"name": "app-logs", "tags": {"env": "prod"}});

    let first = handler
        .handle(&EventBuilder::upsert(definition.clone()).build())
        .await;
    let second = handler
        .handle(&EventBuilder::upsert(definition).prev_from(&first).build())
        .await;

    assert!(second.is_success());
    assert!(second.has_log("Log Group Exists: Exiting"));
    assert_eq!(second.props, first.props);
    assert_eq!(second.links, first.links);
    assert_eq!(handler.service().call_count(ServiceOperation::Create), 1);
    assert_eq!(handler.service().call_count(ServiceOperation::TagAdd), 0);
}

#[tokio::test]
async fn rename_replaces_log_group() {
    let handler = handler(service_with("old-logs", None, tags(&[])));
    let event = EventBuilder::upsert(json!({"name": "new-logs"}))
        .prev_props(json!({"name": "old-logs"}))
        .build();

    let response = handler.handle(&event).await;

    assert!(response.is_success(), "{response:?}");
    assert_eq!(response.props["name"], json!("new-logs"));
    assert!(handler.service().get("new-logs").is_some());
    assert!(handler.service().get("old-logs").is_none());

    let titles = titles(&response);
    let created = titles.iter().position(|t| *t == "Created Log Group");
    let deleted = titles.iter().position(|t| *t == "Deleted Log Group");
    assert!(created.is_some() && deleted.is_some());
    assert!(created < deleted, "delete runs last: {titles:?}");
}

#[tokio::test]
async fn kms_key_change_is_rejected_without_service_calls() {
    let handler = handler(service_with("app-logs", Some("abc"), tags(&[])));
    let event = EventBuilder::upsert(json!({"name": "app-logs", "kms_key_id": "xyz"}))
        .prev_props(json!({"name": "app-logs", "kms_key_id": "abc"}))
        .build();

    let response = handler.handle(&event).await;

    assert_eq!(response.status, ResponseStatus::PermanentError);
    assert_eq!(response.error.as_deref(), Some("KMS Key ID Cannot Change"));
    assert!(handler.service().calls().is_empty());
    assert_eq!(
        handler.service().get("app-logs").and_then(|g| g.kms_key_id),
        Some("abc".to_string())
    );
}

#[tokio::test]
async fn retags_in_place() {
    let handler = handler(service_with("app-logs", None, tags(&[("a", "1"), ("b", "2")])));
    let event = EventBuilder::upsert(json!({"name": "app-logs", "tags": {"a": "1", "c": "3"}}))
        .prev_props(json!({"name": "app-logs"}))
        .build();

    let response = handler.handle(&event).await;

    assert!(response.is_success(), "{response:?}");
    assert!(response.has_log("Tags Added"));
    assert!(response.has_log("Tags Removed"));
    assert_eq!(
        handler.service().get("app-logs").map(|group| group.tags),
        Some(tags(&[("a", "1"), ("c", "3")]))
    );
    assert_eq!(handler.service().call_count(ServiceOperation::Create), 0);
    assert_eq!(response.props["name"], json!("app-logs"));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let handler = handler(service_with("app-logs", None, tags(&[])));
    let event = EventBuilder::delete(json!({"name": "app-logs"})).build();

    let first = handler.handle(&event).await;
    let second = handler.handle(&event).await;

    assert!(first.is_success());
    assert!(first.has_log("Deleted Log Group"));
    assert!(second.is_success());
    assert!(second.has_log("Log Group Does Not Exist"));
    assert!(handler.service().get("app-logs").is_none());
}

#[tokio::test]
async fn full_trust_unchanged_definition_short_circuits() {
    let handler = handler(empty_service());
    let definition = json!({"name": "app-logs", "trust_level": "full", "tags": {"env": "prod"}});

    let first = handler
        .handle(&EventBuilder::upsert(definition.clone()).build())
        .await;
    assert!(first.has_log("Definitions Don't Match, Deploying"));
    assert!(first.props.contains_key("def_hash"));
    let calls = handler.service().calls().len();

    // key order and trust level do not affect the digest
    let reordered = json!({"tags": {"env": "prod"}, "name": "app-logs", "trust_level": "full"});
    let second = handler
        .handle(&EventBuilder::upsert(reordered).prev_from(&first).build())
        .await;

    assert!(second.is_success());
    assert!(second.has_log("Full Trust, No Change: Exiting"));
    assert_eq!(second.props, first.props);
    assert_eq!(second.links, first.links);
    assert_eq!(handler.service().calls().len(), calls);
}

#[tokio::test]
async fn retryable_failure_resumes_from_pass_back() {
    let handler = handler(empty_service());
    handler.service().fail_next(
        ServiceOperation::Create,
        ServiceError::new(codes::THROTTLING, "Rate exceeded"),
    );
    let definition = json!({"name": "app-logs"});

    let first = handler
        .handle(&EventBuilder::upsert(definition.clone()).build())
        .await;
    assert_eq!(first.status, ResponseStatus::RetryableError);
    assert_eq!(first.progress, 20);
    assert_eq!(first.callback_sec, Some(60));
    assert_eq!(
        first.pass_back_data,
        Some(json!({"ops": [{"kind": "create"}], "props": {}, "links": {}}))
    );

    let second = handler
        .handle(&EventBuilder::upsert(definition).pass_back_from(&first).build())
        .await;

    assert!(second.is_success(), "{second:?}");
    assert!(second.has_log("Created Log Group"));
    assert_eq!(handler.service().call_count(ServiceOperation::Describe), 1);
    assert!(handler.service().get("app-logs").is_some());
}

#[tokio::test]
async fn resumed_rename_keeps_recorded_identity() {
    let handler = handler(service_with("old-logs", None, tags(&[])));
    handler.service().fail_next(
        ServiceOperation::Delete,
        ServiceError::new(codes::THROTTLING, "Rate exceeded"),
    );
    let definition = json!({"name": "new-logs"});

    let first = handler
        .handle(
            &EventBuilder::upsert(definition.clone())
                .prev_props(json!({"name": "old-logs"}))
                .build(),
        )
        .await;
    assert_eq!(first.status, ResponseStatus::RetryableError);
    assert_eq!(first.progress, 90);
    assert_eq!(first.props["name"], json!("new-logs"));

    let second = handler
        .handle(
            &EventBuilder::upsert(definition)
                .prev_props(json!({"name": "old-logs"}))
                .pass_back_from(&first)
                .build(),
        )
        .await;

    assert!(second.is_success(), "{second:?}");
    assert!(second.has_log("Deleted Log Group"));
    assert_eq!(second.props, first.props);
    assert_eq!(second.links, first.links);
    assert!(handler.service().get("old-logs").is_none());

    // the recorded state still guards the key id
    let third = handler
        .handle(
            &EventBuilder::upsert(json!({"name": "new-logs", "kms_key_id": "xyz"}))
                .prev_from(&second)
                .build(),
        )
        .await;
    assert_eq!(third.status, ResponseStatus::PermanentError);
    assert_eq!(third.error.as_deref(), Some("KMS Key ID Cannot Change"));
}

#[tokio::test]
async fn resumed_full_trust_run_keeps_definition_hash() {
    let handler = handler(empty_service());
    handler.service().fail_next(
        ServiceOperation::Create,
        ServiceError::new(codes::SERVICE_UNAVAILABLE, "down"),
    );
    let definition = json!({"name": "app-logs", "trust_level": "full"});

    let first = handler
        .handle(&EventBuilder::upsert(definition.clone()).build())
        .await;
    assert_eq!(first.status, ResponseStatus::RetryableError);
    let recorded_hash = first.props["def_hash"].clone();

    let second = handler
        .handle(&EventBuilder::upsert(definition).pass_back_from(&first).build())
        .await;

    assert!(second.is_success(), "{second:?}");
    assert_eq!(second.props["def_hash"], recorded_hash);
    assert_eq!(second.props["name"], json!("app-logs"));
    assert_eq!(
        second.props["arn"],
        json!("arn:aws:logs:us-east-1:123456789012:log-group/app-logs")
    );
    assert!(second.links.contains_key("Log Group"));
}

#[tokio::test]
async fn permanent_create_failure_has_no_pass_back() {
    let handler = handler(empty_service());
    handler.service().fail_next(
        ServiceOperation::Create,
        ServiceError::new(codes::ACCESS_DENIED_EXCEPTION, "denied"),
    );

    let response = handler
        .handle(&EventBuilder::upsert(json!({"name": "app-logs"})).build())
        .await;

    assert_eq!(response.status, ResponseStatus::PermanentError);
    assert_eq!(response.pass_back_data, None);
    assert_eq!(response.callback_sec, None);
}

#[tokio::test]
async fn malformed_definition_is_permanent() {
    let handler = handler(empty_service());
    let event = EventBuilder::upsert(json!({"name": "app-logs", "tags": ["not", "a", "map"]})).build();

    let response = handler.handle(&event).await;

    assert_eq!(response.status, ResponseStatus::PermanentError);
    assert_eq!(response.progress, 0);
    assert!(response.has_log("Unexpected Error"));
    assert!(handler.service().calls().is_empty());
}

#[tokio::test]
async fn default_name_from_naming_coordinates() {
    let handler = handler(empty_service());
    let event = EventBuilder::upsert(json!({}))
        .naming("proj", "repo", "api logs")
        .build();

    let response = handler.handle(&event).await;

    assert!(response.is_success());
    assert_eq!(response.props["name"], json!("proj-repo-api-logs"));
}

#[tokio::test]
async fn normal_trust_first_upsert_creates() {
    let handler = handler(empty_service());
    let event = EventBuilder::upsert(json!({"name": "app-logs", "trust_level": "normal"})).build();

    let response = handler.handle(&event).await;

    assert!(response.is_success());
    assert!(!response.props.contains_key("def_hash"));
    assert_eq!(
        response.props["arn"],
        json!("arn:aws:logs:us-east-1:123456789012:log-group/app-logs")
    );
    assert_eq!(
        handler.service().calls(),
        vec![ServiceOperation::Describe, ServiceOperation::Create]
    );
}
