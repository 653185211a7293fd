//! Operation queue
//!
//! An ordered, deduplicated set of pending operations. Decision steps
//! populate it; later steps consume it. Each kind appears at most once, and
//! the ordering of [`OpKind`] is the pipeline order.

use crate::error::HandlerError;
use crate::types::Tags;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key under which the queue travels in pass-back data
pub const PASS_BACK_OPS_KEY: &str = "ops";

/// Kind of pending operation, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Full-trust definition comparison
    CompareDefinitions,
    /// Read live state and diff against desired
    FetchAndDiff,
    /// Create the log group
    Create,
    /// Apply added or changed tags
    AddTags,
    /// Remove tags absent from desired
    RemoveTags,
    /// Delete a log group
    Delete,
}

impl OpKind {
    /// All kinds in pipeline order
    pub const PIPELINE: [OpKind; 6] = [
        OpKind::CompareDefinitions,
        OpKind::FetchAndDiff,
        OpKind::Create,
        OpKind::AddTags,
        OpKind::RemoveTags,
        OpKind::Delete,
    ];
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CompareDefinitions => "compare_definitions",
            Self::FetchAndDiff => "fetch_and_diff",
            Self::Create => "create",
            Self::AddTags => "add_tags",
            Self::RemoveTags => "remove_tags",
            Self::Delete => "delete",
        };
        f.write_str(label)
    }
}

/// Target of a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Log group to delete
    pub name: String,
    /// Deleting an old name so a renamed group can be created
    pub create_and_remove: bool,
}

/// A pending operation with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum PendingOp {
    /// Full-trust definition comparison
    CompareDefinitions,
    /// Read live state and diff against desired
    FetchAndDiff,
    /// Create the log group
    Create,
    /// Tags to apply
    AddTags(Tags),
    /// Tag keys to remove
    RemoveTags(Vec<String>),
    /// Log group to delete
    Delete(DeleteRequest),
}

impl PendingOp {
    /// Kind of this operation
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::CompareDefinitions => OpKind::CompareDefinitions,
            Self::FetchAndDiff => OpKind::FetchAndDiff,
            Self::Create => OpKind::Create,
            Self::AddTags(_) => OpKind::AddTags,
            Self::RemoveTags(_) => OpKind::RemoveTags,
            Self::Delete(_) => OpKind::Delete,
        }
    }
}

/// Ordered, deduplicated set of pending operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PendingOp>", into = "Vec<PendingOp>")]
pub struct OperationQueue {
    ops: BTreeMap<OpKind, PendingOp>,
}

impl OperationQueue {
    /// Create empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation, replacing any pending operation of the same kind
    ///
    /// Returns the replaced operation, if any.
    pub fn add(&mut self, op: PendingOp) -> Option<PendingOp> {
        let kind = op.kind();
        let replaced = self.ops.insert(kind, op);
        if replaced.is_some() {
            tracing::debug!(op = %kind, "replaced pending operation");
        }
        replaced
    }

    /// Whether an operation of `kind` is pending
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: OpKind) -> bool {
        self.ops.contains_key(&kind)
    }

    /// Pending operation of `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: OpKind) -> Option<&PendingOp> {
        self.ops.get(&kind)
    }

    /// Pending tags to add
    #[must_use]
    pub fn add_tags(&self) -> Option<&Tags> {
        match self.ops.get(&OpKind::AddTags) {
            Some(PendingOp::AddTags(tags)) => Some(tags),
            _ => None,
        }
    }

    /// Pending tag keys to remove
    #[must_use]
    pub fn remove_tags(&self) -> Option<&[String]> {
        match self.ops.get(&OpKind::RemoveTags) {
            Some(PendingOp::RemoveTags(keys)) => Some(keys),
            _ => None,
        }
    }

    /// Pending delete
    #[must_use]
    pub fn delete_request(&self) -> Option<&DeleteRequest> {
        match self.ops.get(&OpKind::Delete) {
            Some(PendingOp::Delete(request)) => Some(request),
            _ => None,
        }
    }

    /// Mark `kind` as done, removing it from the queue
    pub fn complete(&mut self, kind: OpKind) -> Option<PendingOp> {
        self.ops.remove(&kind)
    }

    /// Pending kinds in pipeline order
    pub fn kinds(&self) -> impl Iterator<Item = OpKind> + '_ {
        self.ops.keys().copied()
    }

    /// Number of pending operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Encode as pass-back data for a later invocation
    ///
    /// # Errors
    /// Returns error if the queue cannot be encoded
    pub fn to_pass_back(&self) -> Result<Value, HandlerError> {
        let mut data = serde_json::Map::new();
        data.insert(PASS_BACK_OPS_KEY.to_string(), serde_json::to_value(self)?);
        Ok(Value::Object(data))
    }

    /// Restore from pass-back data; missing ops read as an empty queue
    ///
    /// # Errors
    /// Returns `HandlerError::InvalidPassBack` if the ops entry is unreadable
    pub fn from_pass_back(data: &Value) -> Result<Self, HandlerError> {
        match data.get(PASS_BACK_OPS_KEY) {
            None | Some(Value::Null) => Ok(Self::new()),
            Some(ops) => Self::deserialize(ops).map_err(|e| HandlerError::InvalidPassBack(e.to_string())),
        }
    }
}

impl From<Vec<PendingOp>> for OperationQueue {
    fn from(ops: Vec<PendingOp>) -> Self {
        let mut queue = Self::new();
        for op in ops {
            queue.add(op);
        }
        queue
    }
}

impl From<OperationQueue> for Vec<PendingOp> {
    fn from(queue: OperationQueue) -> Self {
        queue.ops.into_values().collect()
    }
}
