//! Result accumulator
//!
//! Collects operator logs, output props, links and the terminal status over
//! one invocation, then renders the response exactly once.

use crate::error::{ErrorClass, HandlerError};
use crate::queue::OperationQueue;
use crate::types::AttributeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress reported on success
pub const PROGRESS_COMPLETE: u8 = 100;

/// Key under which recorded props travel in pass-back data
pub const PASS_BACK_PROPS_KEY: &str = "props";

/// Key under which recorded links travel in pass-back data
pub const PASS_BACK_LINKS_KEY: &str = "links";

/// One operator-facing log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Short description of what happened
    pub title: String,
    /// Structured detail
    pub details: Value,
    /// Whether this entry records a failure
    pub is_error: bool,
}

/// Declared failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredError {
    /// Permanent or retryable
    pub class: ErrorClass,
    /// Human-readable message
    pub message: String,
    /// Call-site progress marker
    pub progress: u8,
}

/// Terminal status of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Converged (or nothing to do)
    Success,
    /// Do not retry
    PermanentError,
    /// Re-invoke, optionally with the pass-back data
    RetryableError,
}

/// Rendered result of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResponse {
    /// Terminal status
    pub status: ResponseStatus,
    /// Progress marker (100 on success)
    pub progress: u8,
    /// Error message for non-success statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final attributes
    pub props: AttributeMap,
    /// Named links
    pub links: AttributeMap,
    /// Ordered operator log
    pub logs: Vec<LogEntry>,
    /// Continuation data for a retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_back_data: Option<Value>,
    /// Suggested delay before the retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_sec: Option<u64>,
}

impl HandlerResponse {
    /// Whether the invocation succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Whether any log entry has the given title
    #[must_use]
    pub fn has_log(&self, title: &str) -> bool {
        self.logs.iter().any(|entry| entry.title == title)
    }
}

/// Accumulates the result of one invocation
#[derive(Debug, Clone, Default)]
pub struct ResultAccumulator {
    props: AttributeMap,
    links: AttributeMap,
    logs: Vec<LogEntry>,
    error: Option<DeclaredError>,
}

impl ResultAccumulator {
    /// Create empty accumulator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operator log entry
    pub fn add_log(&mut self, title: impl Into<String>, details: Value, is_error: bool) {
        let title = title.into();
        if is_error {
            tracing::warn!(title = %title, details = %details, "reconcile error");
        } else {
            tracing::info!(title = %title, "reconcile step");
        }
        self.logs.push(LogEntry {
            title,
            details,
            is_error,
        });
    }

    /// Set one output prop
    pub fn add_prop(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.props.insert(key.into(), value.into());
    }

    /// Merge output props, overwriting existing keys
    pub fn add_props(&mut self, props: impl IntoIterator<Item = (String, Value)>) {
        self.props.extend(props);
    }

    /// Set one link
    pub fn add_link(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.links.insert(name.into(), Value::String(url.into()));
    }

    /// Merge links, overwriting existing names
    pub fn add_links(&mut self, links: impl IntoIterator<Item = (String, Value)>) {
        self.links.extend(links);
    }

    /// Declare a permanent failure
    pub fn perm_error(&mut self, message: impl Into<String>, progress: u8) {
        self.declare(ErrorClass::Permanent, message.into(), progress);
    }

    /// Declare a retryable failure
    pub fn retry_error(&mut self, message: impl Into<String>, progress: u8) {
        self.declare(ErrorClass::Retryable, message.into(), progress);
    }

    /// Declare a failure of the given class
    pub fn declare(&mut self, class: ErrorClass, message: String, progress: u8) {
        if let Some(existing) = &self.error {
            tracing::debug!(
                existing = %existing.message,
                ignored = %message,
                "error already declared"
            );
            return;
        }
        self.error = Some(DeclaredError {
            class,
            message,
            progress,
        });
    }

    /// Whether a failure has been declared
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Declared failure, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&DeclaredError> {
        self.error.as_ref()
    }

    /// Output props so far
    #[inline]
    #[must_use]
    pub fn props(&self) -> &AttributeMap {
        &self.props
    }

    /// Links so far
    #[inline]
    #[must_use]
    pub fn links(&self) -> &AttributeMap {
        &self.links
    }

    /// Logs so far
    #[inline]
    #[must_use]
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Resume from pass-back data, restoring the props and links recorded
    /// before the retryable failure; missing entries read as empty
    ///
    /// # Errors
    /// Returns `HandlerError::InvalidPassBack` if props or links are not objects
    pub fn resume(data: &Value) -> Result<Self, HandlerError> {
        Ok(Self {
            props: attribute_entry(data, PASS_BACK_PROPS_KEY)?,
            links: attribute_entry(data, PASS_BACK_LINKS_KEY)?,
            ..Self::default()
        })
    }

    /// Render the response
    ///
    /// A retryable failure carries the remaining queue and the props and
    /// links recorded so far as pass-back data.
    ///
    /// # Errors
    /// Returns error if the remaining queue cannot be encoded
    pub fn finish(
        self,
        remaining: &OperationQueue,
        callback_sec: u64,
    ) -> Result<HandlerResponse, HandlerError> {
        let (status, progress, error, pass_back_data, callback_sec) = match self.error {
            None => (ResponseStatus::Success, PROGRESS_COMPLETE, None, None, None),
            Some(DeclaredError {
                class: ErrorClass::Permanent,
                message,
                progress,
            }) => (ResponseStatus::PermanentError, progress, Some(message), None, None),
            Some(DeclaredError {
                class: ErrorClass::Retryable,
                message,
                progress,
            }) => (
                ResponseStatus::RetryableError,
                progress,
                Some(message),
                Some(encode_pass_back(remaining, &self.props, &self.links)?),
                Some(callback_sec),
            ),
        };

        Ok(HandlerResponse {
            status,
            progress,
            error,
            props: self.props,
            links: self.links,
            logs: self.logs,
            pass_back_data,
            callback_sec,
        })
    }
}

fn encode_pass_back(
    remaining: &OperationQueue,
    props: &AttributeMap,
    links: &AttributeMap,
) -> Result<Value, HandlerError> {
    let mut data = remaining.to_pass_back()?;
    if let Value::Object(map) = &mut data {
        map.insert(PASS_BACK_PROPS_KEY.to_string(), Value::Object(props.clone()));
        map.insert(PASS_BACK_LINKS_KEY.to_string(), Value::Object(links.clone()));
    }
    Ok(data)
}

fn attribute_entry(data: &Value, key: &str) -> Result<AttributeMap, HandlerError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(AttributeMap::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(HandlerError::InvalidPassBack(format!(
            "{key} must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PendingOp;
    use serde_json::json;

    #[test]
    fn success_renders_complete() {
        let mut acc = ResultAccumulator::new();
        acc.add_prop("name", "app-logs");
        acc.add_link("Log Group", "https://example");
        acc.add_log("Created Log Group", json!({}), false);

        let response = acc.finish(&OperationQueue::new(), 60).unwrap();
        assert!(response.is_success());
        assert_eq!(response.progress, PROGRESS_COMPLETE);
        assert_eq!(response.props["name"], json!("app-logs"));
        assert_eq!(response.links["Log Group"], json!("https://example"));
        assert!(response.has_log("Created Log Group"));
        assert!(response.pass_back_data.is_none());
    }

    #[test]
    fn first_error_wins() {
        let mut acc = ResultAccumulator::new();
        acc.perm_error("first", 10);
        acc.retry_error("second", 20);

        let error = acc.error().unwrap();
        assert_eq!(error.message, "first");
        assert_eq!(error.class, ErrorClass::Permanent);
    }

    #[test]
    fn retryable_carries_queue() {
        let mut acc = ResultAccumulator::new();
        acc.retry_error("throttled", 20);
        let mut queue = OperationQueue::new();
        queue.add(PendingOp::Create);

        let response = acc.finish(&queue, 30).unwrap();
        assert_eq!(response.status, ResponseStatus::RetryableError);
        assert_eq!(response.progress, 20);
        assert_eq!(response.callback_sec, Some(30));
        assert_eq!(
            response.pass_back_data,
            Some(json!({"ops": [{"kind": "create"}], "props": {}, "links": {}}))
        );
    }

    #[test]
    fn retryable_pass_back_keeps_recorded_attributes() {
        let mut acc = ResultAccumulator::new();
        acc.add_prop("name", "new-logs");
        acc.add_prop("def_hash", "abc123");
        acc.add_link("Log Group", "https://console/new-logs");
        acc.add_log("Created Log Group", json!({}), false);
        acc.retry_error("throttled", 90);

        let response = acc.finish(&OperationQueue::new(), 60).unwrap();
        let data = response.pass_back_data.unwrap();
        let resumed = ResultAccumulator::resume(&data).unwrap();

        assert_eq!(resumed.props(), &response.props);
        assert_eq!(resumed.links(), &response.links);
        assert!(resumed.logs().is_empty());
        assert!(!resumed.has_error());
    }

    #[test]
    fn resume_without_attributes_is_empty() {
        let resumed = ResultAccumulator::resume(&json!({"ops": []})).unwrap();
        assert!(resumed.props().is_empty());
        assert!(resumed.links().is_empty());
    }

    #[test]
    fn resume_rejects_non_object_props() {
        let err = ResultAccumulator::resume(&json!({"props": ["name"]})).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPassBack(_)));
    }

    #[test]
    fn permanent_has_no_pass_back() {
        let mut acc = ResultAccumulator::new();
        acc.perm_error("KMS Key ID Cannot Change", 0);
        let response = acc.finish(&OperationQueue::new(), 60).unwrap();
        assert_eq!(response.status, ResponseStatus::PermanentError);
        assert_eq!(response.error.as_deref(), Some("KMS Key ID Cannot Change"));
        assert!(response.pass_back_data.is_none());
    }

    #[test]
    fn add_props_overwrites() {
        let mut acc = ResultAccumulator::new();
        acc.add_prop("def_hash", "new");
        let mut previous = AttributeMap::new();
        previous.insert("def_hash".to_string(), json!("old"));
        acc.add_props(previous);
        assert_eq!(acc.props()["def_hash"], json!("old"));
    }
}
