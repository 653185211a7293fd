//! Invocation entry point
//!
//! Parses the event, resolves the desired state, seeds (or restores) the
//! operation queue, runs the engine and renders exactly one response. Any
//! internal failure becomes a permanent `"Unexpected Error"` response.

use crate::config::HandlerConfig;
use crate::engine::{progress, ReconcileInput, Reconciliation, ReconciliationEngine};
use crate::service::LogService;
use lgr_core::{
    component_safe_name, ComponentDefinition, DeleteRequest, DesiredLogGroup, HandlerError,
    HandlerResponse, InvocationEvent, Operation, OperationQueue, PendingOp, ResponseStatus,
    ResultAccumulator,
};
use serde_json::{json, Value};

/// Log title of the top-level safety net
pub const UNEXPECTED_ERROR_TITLE: &str = "Unexpected Error";

/// Reconciliation handler for one log group per invocation
#[derive(Debug)]
pub struct LogGroupHandler<S> {
    config: HandlerConfig,
    engine: ReconciliationEngine<S>,
}

impl<S: LogService> LogGroupHandler<S> {
    /// Create handler
    pub fn new(config: HandlerConfig, service: S) -> Self {
        Self {
            config,
            engine: ReconciliationEngine::new(service),
        }
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Underlying service
    #[inline]
    pub fn service(&self) -> &S {
        self.engine.service()
    }

    /// Handle one raw event
    pub async fn handle(&self, event: &Value) -> HandlerResponse {
        let mut state = Reconciliation::default();

        if let Err(e) = self.reconcile(event, &mut state).await {
            tracing::error!(error = %e, "reconciliation aborted");
            unexpected(&mut state, &e);
        }

        match state.finish(self.config.retry_callback_secs) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "failed to render response");
                let mut fallback = Reconciliation::default();
                unexpected(&mut fallback, &e);
                render_permanent(fallback)
            }
        }
    }

    async fn reconcile(
        &self,
        event: &Value,
        state: &mut Reconciliation,
    ) -> Result<(), HandlerError> {
        let event = InvocationEvent::from_value(event)?;
        let definition = ComponentDefinition::from_value(&event.component_def)?;
        let desired = self.resolve_desired(&event, &definition);
        tracing::info!(
            op = ?event.op,
            name = %desired.name,
            continuation = event.continuation().is_some(),
            "handling invocation"
        );

        *state = match event.continuation() {
            Some(data) => Reconciliation::resume(
                OperationQueue::from_pass_back(data)?,
                ResultAccumulator::resume(data)?,
            ),
            None => Reconciliation::new(seed_queue(
                event.op,
                definition.is_full_trust(),
                &desired.name,
            )),
        };
        tracing::debug!(ops = ?state.queue().kinds().collect::<Vec<_>>(), "queue ready");

        let input = ReconcileInput {
            desired,
            raw_definition: event.component_def,
            full_trust: definition.is_full_trust(),
            previous: event.prev_state,
            deployment: self.config.deployment(),
        };
        self.engine.run(&input, state).await
    }

    /// Name from the definition, else derived from naming coordinates
    fn resolve_desired(
        &self,
        event: &InvocationEvent,
        definition: &ComponentDefinition,
    ) -> DesiredLogGroup {
        let name = definition
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                component_safe_name(
                    event.project_code.as_deref().unwrap_or_default(),
                    event.repo_id.as_deref().unwrap_or_default(),
                    event.component_name.as_deref().unwrap_or_default(),
                    self.config.max_name_chars,
                )
            });

        DesiredLogGroup {
            name,
            kms_key_id: definition.kms_key_id.clone(),
            tags: definition.tags.clone(),
        }
    }
}

/// Initial queue for a fresh invocation
#[must_use]
pub fn seed_queue(op: Option<Operation>, full_trust: bool, name: &str) -> OperationQueue {
    let mut queue = OperationQueue::new();
    match op {
        Some(Operation::Upsert) if full_trust => {
            queue.add(PendingOp::CompareDefinitions);
        }
        Some(Operation::Upsert) => {
            queue.add(PendingOp::FetchAndDiff);
        }
        Some(Operation::Delete) => {
            queue.add(PendingOp::Delete(DeleteRequest {
                name: name.to_string(),
                create_and_remove: false,
            }));
        }
        None => {}
    }
    queue
}

fn unexpected(state: &mut Reconciliation, error: &HandlerError) {
    let result = state.result_mut();
    result.add_log(
        UNEXPECTED_ERROR_TITLE,
        json!({"error": error.to_string(), "debug": format!("{error:?}")}),
        true,
    );
    result.perm_error(error.to_string(), progress::NONE);
}

/// Render a permanent failure without touching the queue
fn render_permanent(state: Reconciliation) -> HandlerResponse {
    let result = state.result();
    HandlerResponse {
        status: ResponseStatus::PermanentError,
        progress: progress::NONE,
        error: result.error().map(|error| error.message.clone()),
        props: result.props().clone(),
        links: result.links().clone(),
        logs: result.logs().to_vec(),
        pass_back_data: None,
        callback_sec: None,
    }
}
