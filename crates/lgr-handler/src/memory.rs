//! In-memory log service
//!
//! A [`LogService`] backed by a map, used by the CLI for dry runs against a
//! recorded snapshot and by tests. Supports one-shot fault injection per
//! operation and records every call.

use crate::service::{CreateLogGroupRequest, LogGroupDescription, LogService};
use async_trait::async_trait;
use lgr_core::{codes, DeploymentContext, ServiceError, ServiceOperation, Tags};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Describe returns at most this many entries
const DESCRIBE_PAGE_SIZE: usize = 50;

/// Tag key length limit
const MAX_TAG_KEY_CHARS: usize = 128;

/// Tag value length limit
const MAX_TAG_VALUE_CHARS: usize = 256;

/// Stored log group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLogGroup {
    /// Encryption key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: Tags,
}

/// Serializable contents of the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Log groups by name
    #[serde(default)]
    pub log_groups: BTreeMap<String, StoredLogGroup>,
}

/// Map-backed log service
#[derive(Debug)]
pub struct InMemoryLogService {
    deployment: DeploymentContext,
    groups: Mutex<BTreeMap<String, StoredLogGroup>>,
    faults: Mutex<HashMap<ServiceOperation, ServiceError>>,
    calls: Mutex<Vec<ServiceOperation>>,
}

impl InMemoryLogService {
    /// Create empty service
    #[must_use]
    pub fn new(deployment: DeploymentContext) -> Self {
        Self::from_snapshot(deployment, ServiceSnapshot::default())
    }

    /// Create service seeded from a snapshot
    #[must_use]
    pub fn from_snapshot(deployment: DeploymentContext, snapshot: ServiceSnapshot) -> Self {
        Self {
            deployment,
            groups: Mutex::new(snapshot.log_groups),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Current contents
    #[must_use]
    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            log_groups: self.groups.lock().clone(),
        }
    }

    /// Insert a log group directly, bypassing validation
    pub fn insert(&self, name: impl Into<String>, group: StoredLogGroup) {
        self.groups.lock().insert(name.into(), group);
    }

    /// Stored log group by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StoredLogGroup> {
        self.groups.lock().get(name).cloned()
    }

    /// Fail the next call of `operation` with `error`
    pub fn fail_next(&self, operation: ServiceOperation, error: ServiceError) {
        self.faults.lock().insert(operation, error);
    }

    /// Operations called so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceOperation> {
        self.calls.lock().clone()
    }

    /// Number of calls of `operation`
    #[must_use]
    pub fn call_count(&self, operation: ServiceOperation) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    /// Record a call and consume an injected fault
    fn enter(&self, operation: ServiceOperation) -> Result<(), ServiceError> {
        self.calls.lock().push(operation);
        match self.faults.lock().remove(&operation) {
            Some(error) => {
                tracing::debug!(%operation, code = %error.code, "injected fault");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn validate_tags(tags: &Tags) -> Result<(), ServiceError> {
    for (key, value) in tags {
        if key.is_empty() || key.chars().count() > MAX_TAG_KEY_CHARS {
            return Err(ServiceError::new(
                codes::INVALID_PARAMETER_VALUE,
                format!("invalid tag key: '{key}'"),
            ));
        }
        if value.chars().count() > MAX_TAG_VALUE_CHARS {
            return Err(ServiceError::new(
                codes::INVALID_PARAMETER_VALUE,
                format!("tag value too long for key '{key}'"),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl LogService for InMemoryLogService {
    async fn describe_log_groups(
        &self,
        name_prefix: &str,
    ) -> Result<Vec<LogGroupDescription>, ServiceError> {
        self.enter(ServiceOperation::Describe)?;
        if name_prefix.is_empty() {
            return Err(ServiceError::param_validation(
                "logGroupNamePrefix must not be empty",
            ));
        }

        let groups = self.groups.lock();
        Ok(groups
            .range(name_prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(name_prefix))
            .take(DESCRIBE_PAGE_SIZE)
            .map(|(name, group)| LogGroupDescription {
                name: name.clone(),
                arn: Some(self.deployment.star_arn(name)),
                kms_key_id: group.kms_key_id.clone(),
                retention_in_days: None,
            })
            .collect())
    }

    async fn create_log_group(&self, request: CreateLogGroupRequest) -> Result<(), ServiceError> {
        self.enter(ServiceOperation::Create)?;
        if request.name.is_empty() {
            return Err(ServiceError::new(
                codes::INVALID_PARAMETER,
                "log group name must not be empty",
            ));
        }
        if matches!(&request.tags, Some(tags) if tags.is_empty()) {
            return Err(ServiceError::new(
                codes::INVALID_PARAMETER,
                "tags must contain at least one entry",
            ));
        }
        let tags = request.tags.unwrap_or_default();
        validate_tags(&tags).map_err(|e| ServiceError::new(codes::INVALID_PARAMETER, e.message))?;

        let mut groups = self.groups.lock();
        if groups.contains_key(&request.name) {
            return Err(ServiceError::new(
                codes::RESOURCE_ALREADY_EXISTS,
                format!("The specified log group already exists: {}", request.name),
            ));
        }
        groups.insert(
            request.name,
            StoredLogGroup {
                kms_key_id: request.kms_key_id,
                tags,
            },
        );
        Ok(())
    }

    async fn delete_log_group(&self, name: &str) -> Result<(), ServiceError> {
        self.enter(ServiceOperation::Delete)?;
        self.groups
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found(name))
    }

    async fn list_tags(&self, name: &str) -> Result<Tags, ServiceError> {
        self.enter(ServiceOperation::ListTags)?;
        self.groups
            .lock()
            .get(name)
            .map(|group| group.tags.clone())
            .ok_or_else(|| ServiceError::not_found(name))
    }

    async fn tag_log_group(&self, name: &str, tags: &Tags) -> Result<(), ServiceError> {
        self.enter(ServiceOperation::TagAdd)?;
        validate_tags(tags)?;
        let mut groups = self.groups.lock();
        let group = groups
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        group
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn untag_log_group(&self, name: &str, keys: &[String]) -> Result<(), ServiceError> {
        self.enter(ServiceOperation::TagRemove)?;
        let mut groups = self.groups.lock();
        let group = groups
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(name))?;
        for key in keys {
            group.tags.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> InMemoryLogService {
        InMemoryLogService::new(DeploymentContext::new("us-east-1", "123456789012"))
    }

    #[tokio::test]
    async fn describe_matches_prefix_in_order() {
        let svc = service();
        svc.insert("app-logs-b", StoredLogGroup::default());
        svc.insert("app-logs", StoredLogGroup::default());
        svc.insert("other", StoredLogGroup::default());

        let found = svc.describe_log_groups("app-logs").await.unwrap();
        let names: Vec<&str> = found.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["app-logs", "app-logs-b"]);
    }

    #[tokio::test]
    async fn create_rejects_empty_tag_map() {
        let svc = service();
        let request = CreateLogGroupRequest {
            name: "app-logs".to_string(),
            kms_key_id: None,
            tags: Some(Tags::new()),
        };
        let err = svc.create_log_group(request).await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let svc = service();
        let request = CreateLogGroupRequest::new("app-logs", None, &Tags::new());
        svc.create_log_group(request.clone()).await.unwrap();
        let err = svc.create_log_group(request).await.unwrap_err();
        assert_eq!(err.code, codes::RESOURCE_ALREADY_EXISTS);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let svc = service();
        let err = svc.delete_log_group("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn tag_overwrites_and_untag_removes() {
        let svc = service();
        let mut tags = Tags::new();
        tags.insert("env".to_string(), "dev".to_string());
        svc.insert("app-logs", StoredLogGroup { kms_key_id: None, tags });

        let mut update = Tags::new();
        update.insert("env".to_string(), "prod".to_string());
        update.insert("team".to_string(), "core".to_string());
        svc.tag_log_group("app-logs", &update).await.unwrap();
        svc.untag_log_group("app-logs", &["team".to_string()]).await.unwrap();

        let tags = svc.list_tags("app-logs").await.unwrap();
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert!(!tags.contains_key("team"));
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let svc = service();
        svc.fail_next(
            ServiceOperation::Describe,
            ServiceError::new(codes::THROTTLING, "slow down"),
        );
        assert!(svc.describe_log_groups("a").await.is_err());
        assert!(svc.describe_log_groups("a").await.is_ok());
        assert_eq!(svc.call_count(ServiceOperation::Describe), 2);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let svc = service();
        svc.insert("app-logs", StoredLogGroup::default());
        let text = serde_json::to_string(&svc.snapshot()).unwrap();
        let snapshot: ServiceSnapshot = serde_json::from_str(&text).unwrap();
        assert!(snapshot.log_groups.contains_key("app-logs"));
    }
}
