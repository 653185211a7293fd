//! Testing utilities for LGR workspace
//!
//! Event builders, fixtures and a seeded in-memory service.

#![allow(missing_docs)]

use lgr_core::{DeploymentContext, HandlerResponse, Tags};
use lgr_handler::{HandlerConfig, InMemoryLogService, LogGroupHandler, StoredLogGroup};
use serde_json::{json, Map, Value};

pub const REGION: &str = "us-east-1";
pub const ACCOUNT: &str = "123456789012";

pub fn deployment() -> DeploymentContext {
    DeploymentContext::new(REGION, ACCOUNT)
}

pub fn config() -> HandlerConfig {
    HandlerConfig::default()
        .with_region(REGION)
        .with_account_number(ACCOUNT)
}

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn empty_service() -> InMemoryLogService {
    InMemoryLogService::new(deployment())
}

/// Service holding one log group
pub fn service_with(name: &str, kms_key_id: Option<&str>, tags: Tags) -> InMemoryLogService {
    let service = empty_service();
    service.insert(
        name,
        StoredLogGroup {
            kms_key_id: kms_key_id.map(ToString::to_string),
            tags,
        },
    );
    service
}

pub fn handler(service: InMemoryLogService) -> LogGroupHandler<InMemoryLogService> {
    LogGroupHandler::new(config(), service)
}

/// Builder for raw invocation events
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Map<String, Value>,
}

impl EventBuilder {
    fn with_op(op: &str, definition: Value) -> Self {
        let mut event = Map::new();
        event.insert("op".to_string(), json!(op));
        event.insert("component_def".to_string(), definition);
        event.insert("project_code".to_string(), json!("proj"));
        event.insert("repo_id".to_string(), json!("repo"));
        event.insert("component_name".to_string(), json!("logs"));
        Self { event }
    }

    pub fn upsert(definition: Value) -> Self {
        Self::with_op("upsert", definition)
    }

    pub fn delete(definition: Value) -> Self {
        Self::with_op("delete", definition)
    }

    pub fn prev_props(mut self, props: Value) -> Self {
        self.event
            .insert("prev_state".to_string(), json!({"props": props, "links": {}}));
        self
    }

    /// Previous state recorded from an earlier response
    pub fn prev_from(mut self, response: &HandlerResponse) -> Self {
        self.event.insert(
            "prev_state".to_string(),
            json!({"props": response.props, "links": response.links}),
        );
        self
    }

    /// Continue from an earlier retryable response
    pub fn pass_back_from(mut self, response: &HandlerResponse) -> Self {
        let data = response.pass_back_data.clone().unwrap_or(Value::Null);
        self.event.insert("pass_back_data".to_string(), data);
        self
    }

    pub fn naming(mut self, project_code: &str, repo_id: &str, component_name: &str) -> Self {
        self.event.insert("project_code".to_string(), json!(project_code));
        self.event.insert("repo_id".to_string(), json!(repo_id));
        self.event
            .insert("component_name".to_string(), json!(component_name));
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.event)
    }
}
