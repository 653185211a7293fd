//! Reconciliation engine
//!
//! Runs the decision/action steps in a fixed order:
//!
//! 1. compare definitions (full-trust short-circuit)
//! 2. fetch and diff
//! 3. create
//! 4. add tags, remove tags
//! 5. delete
//!
//! Every step is skipped unless its operation is queued and no failure has
//! been declared yet. A step that finishes without declaring a failure
//! completes its operation, so it runs at most once per invocation. The
//! order is load-bearing: tagging must follow creation.

use crate::service::{CreateLogGroupRequest, LogService};
use lgr_core::{
    classify, DefinitionHash, DeleteRequest, DeploymentContext, DesiredLogGroup, ErrorClass,
    HandlerError, HandlerResponse, OpKind, OperationQueue, PendingOp, PreviousState,
    ResultAccumulator, ServiceError, ServiceOperation, TagDelta,
};
use serde_json::{json, Value};

/// Progress markers reported with failures, one per call site
pub mod progress {
    /// Explicit permanent failures outside a service call
    pub const NONE: u8 = 0;
    /// Fetch and diff
    pub const FETCH: u8 = 10;
    /// Standalone delete
    pub const DELETE: u8 = 15;
    /// Create
    pub const CREATE: u8 = 20;
    /// Add tags
    pub const TAG_ADD: u8 = 70;
    /// Remove tags
    pub const TAG_REMOVE: u8 = 80;
    /// Delete of an old name before recreation
    pub const DELETE_FOR_RECREATE: u8 = 90;
}

/// Link name of the console link
pub const CONSOLE_LINK_NAME: &str = "Log Group";

/// Message of the immutable-key failure
pub const KMS_KEY_CHANGE_MESSAGE: &str = "KMS Key ID Cannot Change";

/// Immutable inputs of one invocation
#[derive(Debug, Clone)]
pub struct ReconcileInput {
    /// Resolved desired state
    pub desired: DesiredLogGroup,
    /// Raw definition, for hashing
    pub raw_definition: Value,
    /// Whether full trust was declared
    pub full_trust: bool,
    /// Previous state, if any
    pub previous: Option<PreviousState>,
    /// Region and account
    pub deployment: DeploymentContext,
}

/// Mutable state of one invocation: pending operations and the result
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    queue: OperationQueue,
    result: ResultAccumulator,
}

impl Reconciliation {
    /// Start from a seeded queue
    #[inline]
    #[must_use]
    pub fn new(queue: OperationQueue) -> Self {
        Self {
            queue,
            result: ResultAccumulator::new(),
        }
    }

    /// Continue an interrupted invocation from its remaining queue and the
    /// result it had recorded
    #[inline]
    #[must_use]
    pub fn resume(queue: OperationQueue, result: ResultAccumulator) -> Self {
        Self { queue, result }
    }

    /// Pending operations
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    /// Result so far
    #[inline]
    #[must_use]
    pub fn result(&self) -> &ResultAccumulator {
        &self.result
    }

    /// Write access to the result
    #[inline]
    pub fn result_mut(&mut self) -> &mut ResultAccumulator {
        &mut self.result
    }

    /// Queue an operation
    #[inline]
    pub fn queue_op(&mut self, op: PendingOp) {
        self.queue.add(op);
    }

    /// Whether the step for `kind` should run
    #[inline]
    #[must_use]
    pub fn is_due(&self, kind: OpKind) -> bool {
        self.queue.contains(kind) && !self.result.has_error()
    }

    /// Complete `kind` unless the step declared a failure
    fn settle(&mut self, kind: OpKind) {
        if !self.result.has_error() {
            self.queue.complete(kind);
        }
    }

    /// Render the response
    ///
    /// # Errors
    /// Returns error if the remaining queue cannot be encoded
    pub fn finish(self, callback_sec: u64) -> Result<HandlerResponse, HandlerError> {
        self.result.finish(&self.queue, callback_sec)
    }

    /// Log a failed service call and declare its classified failure
    fn fail(
        &mut self,
        operation: ServiceOperation,
        title: &str,
        error: &ServiceError,
        progress: u8,
    ) {
        let class = classify(operation, &error.code);
        tracing::warn!(%operation, code = %error.code, ?class, "service call failed");
        self.result.add_log(
            title,
            json!({"error": error.to_string(), "code": error.code}),
            true,
        );
        self.result.declare(class, error.to_string(), progress);
    }

    /// Record the converged attributes of `desired`
    fn record_converged(&mut self, desired: &DesiredLogGroup, deployment: &DeploymentContext) {
        self.result
            .add_link(CONSOLE_LINK_NAME, deployment.console_link(&desired.name));
        self.result.add_props([
            ("kms_key_id".to_string(), json!(desired.kms_key_id)),
            ("name".to_string(), json!(desired.name)),
            ("arn".to_string(), json!(deployment.arn(&desired.name))),
            ("star_arn".to_string(), json!(deployment.star_arn(&desired.name))),
        ]);
    }
}

/// Full-trust definition comparison
///
/// Always records the new digest. An unchanged definition copies the
/// previous props and links forward and queues nothing; a changed one
/// queues fetch-and-diff.
///
/// # Errors
/// Returns error if the definition cannot be canonicalized
pub fn compare_definitions(
    input: &ReconcileInput,
    state: &mut Reconciliation,
) -> Result<(), HandlerError> {
    let digest = DefinitionHash::compute(&input.raw_definition)?;
    let recorded = input.previous.as_ref().and_then(PreviousState::def_hash);
    state.result.add_prop("def_hash", digest.as_str());

    if input.full_trust && digest.matches(recorded) {
        if let Some(previous) = &input.previous {
            state.result.add_links(previous.links.clone());
            state.result.add_props(previous.props.clone());
        }
        state.result.add_log(
            "Full Trust, No Change: Exiting",
            json!({"old_hash": recorded, "new_hash": digest.as_str()}),
            false,
        );
    } else {
        state.result.add_log(
            "Definitions Don't Match, Deploying",
            json!({"old": recorded, "new": digest.as_str()}),
            false,
        );
        state.queue_op(PendingOp::FetchAndDiff);
    }
    Ok(())
}

/// Drives one log group toward its desired state
#[derive(Debug)]
pub struct ReconciliationEngine<S> {
    service: S,
}

impl<S: LogService> ReconciliationEngine<S> {
    /// Create engine over a service
    #[inline]
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Underlying service
    #[inline]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Run every step in pipeline order
    ///
    /// # Errors
    /// Returns error only for internal failures; service failures are
    /// declared on the result instead.
    #[tracing::instrument(skip_all, fields(name = %input.desired.name))]
    pub async fn run(
        &self,
        input: &ReconcileInput,
        state: &mut Reconciliation,
    ) -> Result<(), HandlerError> {
        for kind in OpKind::PIPELINE {
            if !state.is_due(kind) {
                continue;
            }
            tracing::debug!(op = %kind, "running step");

            match kind {
                OpKind::CompareDefinitions => compare_definitions(input, state)?,
                OpKind::FetchAndDiff => self.fetch_and_diff(input, state).await,
                OpKind::Create => self.create(input, state).await,
                OpKind::AddTags => self.add_tags(input, state).await,
                OpKind::RemoveTags => self.remove_tags(input, state).await,
                OpKind::Delete => self.delete(state).await,
            }
            state.settle(kind);
        }

        tracing::info!(
            pending = state.queue.len(),
            failed = state.result.has_error(),
            "pipeline finished"
        );
        Ok(())
    }

    /// Read live state and decide create, retag, or done
    pub async fn fetch_and_diff(&self, input: &ReconcileInput, state: &mut Reconciliation) {
        let desired = &input.desired;

        if let Some(previous) = &input.previous {
            if let Some(previous_name) = previous.name() {
                if previous_name != desired.name {
                    state.result.add_log(
                        "Log Group Renamed: Replacing",
                        json!({"old": previous_name, "new": desired.name}),
                        false,
                    );
                    state.queue_op(PendingOp::Delete(DeleteRequest {
                        name: previous_name.to_string(),
                        create_and_remove: true,
                    }));
                } else if previous.kms_key_id() != desired.kms_key_id.as_deref() {
                    state.result.add_log(
                        KMS_KEY_CHANGE_MESSAGE,
                        json!({"old": previous.kms_key_id(), "new": desired.kms_key_id}),
                        true,
                    );
                    state.result.perm_error(KMS_KEY_CHANGE_MESSAGE, progress::NONE);
                    return;
                }
            }
        }

        let described = match self.service.describe_log_groups(&desired.name).await {
            Ok(described) => described,
            Err(e) if e.is_param_validation() => {
                state
                    .result
                    .add_log("Invalid Parameter", json!({"error": e.to_string()}), true);
                state.result.perm_error("Invalid Parameter", progress::NONE);
                return;
            }
            Err(e) => {
                state.fail(ServiceOperation::Describe, "Get Log Group Failed", &e, progress::FETCH);
                return;
            }
        };

        let Some(found) = described.iter().find(|group| group.name == desired.name) else {
            tracing::debug!(name = %desired.name, matches = described.len(), "no exact match");
            state.queue_op(PendingOp::Create);
            return;
        };
        state.result.add_log(
            "Found Log Group",
            json!({"name": found.name, "arn": found.arn, "kms_key_id": found.kms_key_id}),
            false,
        );

        let live = match self.service.list_tags(&desired.name).await {
            Ok(tags) => tags,
            Err(e) => {
                state.fail(ServiceOperation::ListTags, "Get Log Group Failed", &e, progress::FETCH);
                return;
            }
        };

        // the group exists under the desired name and key, so its
        // identifiers are final even when tags still need work
        state.record_converged(desired, &input.deployment);

        let delta = TagDelta::between(&live, &desired.tags);
        if delta.is_empty() {
            state.result.add_log(
                "Log Group Exists: Exiting",
                json!({"name": desired.name}),
                false,
            );
            return;
        }

        tracing::debug!(add = delta.add.len(), remove = delta.remove.len(), "tags differ");
        state.result.add_log(
            "Tags Differ",
            json!({"add": delta.add, "remove": delta.remove}),
            false,
        );
        if !delta.remove.is_empty() {
            state.queue_op(PendingOp::RemoveTags(delta.remove));
        }
        if !delta.add.is_empty() {
            state.queue_op(PendingOp::AddTags(delta.add));
        }
    }

    /// Create the log group and record its attributes
    pub async fn create(&self, input: &ReconcileInput, state: &mut Reconciliation) {
        let desired = &input.desired;
        let request = CreateLogGroupRequest::new(
            desired.name.clone(),
            desired.kms_key_id.clone(),
            &desired.tags,
        );

        match self.service.create_log_group(request).await {
            Ok(()) => {
                state.result.add_log(
                    "Created Log Group",
                    json!({"name": desired.name, "kms_key_id": desired.kms_key_id}),
                    false,
                );
                state.record_converged(desired, &input.deployment);
            }
            Err(e) => {
                state.fail(ServiceOperation::Create, "Create Log Group Failed", &e, progress::CREATE);
            }
        }
    }

    /// Apply the queued tag additions
    pub async fn add_tags(&self, input: &ReconcileInput, state: &mut Reconciliation) {
        let Some(tags) = state.queue.add_tags().cloned() else {
            return;
        };

        match self.service.tag_log_group(&input.desired.name, &tags).await {
            Ok(()) => state.result.add_log("Tags Added", json!({"tags": tags}), false),
            Err(e) => state.fail(ServiceOperation::TagAdd, "Add Tags Failed", &e, progress::TAG_ADD),
        }
    }

    /// Apply the queued tag removals
    pub async fn remove_tags(&self, input: &ReconcileInput, state: &mut Reconciliation) {
        let Some(keys) = state.queue.remove_tags().map(<[String]>::to_vec) else {
            return;
        };

        match self.service.untag_log_group(&input.desired.name, &keys).await {
            Ok(()) => state.result.add_log("Tags Removed", json!({"tags": keys}), false),
            Err(e) => state.fail(
                ServiceOperation::TagRemove,
                "Remove Tags Failed",
                &e,
                progress::TAG_REMOVE,
            ),
        }
    }

    /// Delete the queued log group; a missing group counts as deleted
    pub async fn delete(&self, state: &mut Reconciliation) {
        let Some(request) = state.queue.delete_request().cloned() else {
            return;
        };

        match self.service.delete_log_group(&request.name).await {
            Ok(()) => state
                .result
                .add_log("Deleted Log Group", json!({"name": request.name}), false),
            Err(e) if e.is_not_found() => state.result.add_log(
                "Log Group Does Not Exist",
                json!({"name": request.name}),
                false,
            ),
            Err(e) => {
                let progress = if request.create_and_remove {
                    progress::DELETE_FOR_RECREATE
                } else {
                    progress::DELETE
                };
                state.fail(ServiceOperation::Delete, "Delete Log Group Failed", &e, progress);
            }
        }
    }
}

/// Whether a declared failure is retryable
#[inline]
#[must_use]
pub fn is_retryable(state: &Reconciliation) -> bool {
    state
        .result
        .error()
        .is_some_and(|error| error.class == ErrorClass::Retryable)
}
