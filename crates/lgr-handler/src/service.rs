//! Log service adapter
//!
//! The reconciler talks to the external log-management service only through
//! [`LogService`]. Every call is a single request/response; failures come
//! back as structured [`ServiceError`]s for the engine to classify.

use async_trait::async_trait;
use lgr_core::{ServiceError, Tags};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Log group as reported by describe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupDescription {
    /// Log group name
    pub name: String,
    /// Service-assigned ARN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Encryption key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    /// Retention period, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<u32>,
}

impl LogGroupDescription {
    /// Create description with only a name
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: None,
            kms_key_id: None,
            retention_in_days: None,
        }
    }
}

/// Create request; absent attributes are not sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLogGroupRequest {
    /// Log group name
    pub name: String,
    /// Encryption key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    /// Initial tags; never an empty map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl CreateLogGroupRequest {
    /// Build a request, dropping an empty tag map
    pub fn new(name: impl Into<String>, kms_key_id: Option<String>, tags: &Tags) -> Self {
        Self {
            name: name.into(),
            kms_key_id,
            tags: (!tags.is_empty()).then(|| tags.clone()),
        }
    }
}

/// Log-management service operations consumed by the reconciler
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogService: Send + Sync {
    /// Log groups whose names start with `name_prefix`, sorted by name
    async fn describe_log_groups(
        &self,
        name_prefix: &str,
    ) -> Result<Vec<LogGroupDescription>, ServiceError>;

    /// Create a log group
    async fn create_log_group(&self, request: CreateLogGroupRequest) -> Result<(), ServiceError>;

    /// Delete a log group
    async fn delete_log_group(&self, name: &str) -> Result<(), ServiceError>;

    /// Current tags of a log group
    async fn list_tags(&self, name: &str) -> Result<Tags, ServiceError>;

    /// Add or overwrite tags
    async fn tag_log_group(&self, name: &str, tags: &Tags) -> Result<(), ServiceError>;

    /// Remove tags by key
    async fn untag_log_group(&self, name: &str, keys: &[String]) -> Result<(), ServiceError>;
}

#[async_trait]
impl<T: LogService + ?Sized> LogService for Arc<T> {
    async fn describe_log_groups(
        &self,
        name_prefix: &str,
    ) -> Result<Vec<LogGroupDescription>, ServiceError> {
        (**self).describe_log_groups(name_prefix).await
    }

    async fn create_log_group(&self, request: CreateLogGroupRequest) -> Result<(), ServiceError> {
        (**self).create_log_group(request).await
    }

    async fn delete_log_group(&self, name: &str) -> Result<(), ServiceError> {
        (**self).delete_log_group(name).await
    }

    async fn list_tags(&self, name: &str) -> Result<Tags, ServiceError> {
        (**self).list_tags(name).await
    }

    async fn tag_log_group(&self, name: &str, tags: &Tags) -> Result<(), ServiceError> {
        (**self).tag_log_group(name, tags).await
    }

    async fn untag_log_group(&self, name: &str, keys: &[String]) -> Result<(), ServiceError> {
        (**self).untag_log_group(name, keys).await
    }
}
