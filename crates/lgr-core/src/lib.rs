//! LGR Core - Log Group Reconciliation primitives
//!
//! The pure, I/O-free half of the reconciler:
//! - Invocation inputs (event envelope, definition, previous state)
//! - Definition hashing for full-trust short-circuits
//! - Tag deltas, default naming and identifier formatting
//! - The operation queue and result accumulator shared by every step
//!
//! # Example
//!
//! ```rust
//! use lgr_core::{DeploymentContext, TagDelta, Tags};
//!
//! let ctx = DeploymentContext::new("us-east-1", "123456789012");
//! assert_eq!(
//!     ctx.arn("app-logs"),
//!     "arn:aws:logs:us-east-1:123456789012:log-group/app-logs"
//! );
//!
//! let live = Tags::from([
//!     ("a".to_string(), "1".to_string()),
//!     ("b".to_string(), "2".to_string()),
//! ]);
//! let desired = Tags::from([
//!     ("a".to_string(), "1".to_string()),
//!     ("c".to_string(), "3".to_string()),
//! ]);
//! let delta = TagDelta::between(&live, &desired);
//! assert_eq!(delta.remove, vec!["b".to_string()]);
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod hash;
pub mod identifiers;
pub mod naming;
pub mod queue;
pub mod result;
pub mod tags;
pub mod types;

// Re-exports for convenience
pub use error::{classify, codes, ErrorClass, HandlerError, ServiceError, ServiceOperation};
pub use hash::DefinitionHash;
pub use naming::{component_safe_name, DEFAULT_MAX_NAME_CHARS};
pub use queue::{DeleteRequest, OpKind, OperationQueue, PendingOp};
pub use result::{HandlerResponse, LogEntry, ResponseStatus, ResultAccumulator};
pub use tags::TagDelta;
pub use types::{
    AttributeMap, ComponentDefinition, DeploymentContext, DesiredLogGroup, InvocationEvent,
    Operation, PreviousState, Tags, TrustLevel,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with LGR Core
    pub use crate::{
        ComponentDefinition, DeploymentContext, DesiredLogGroup, HandlerResponse, OpKind,
        OperationQueue, PendingOp, PreviousState, ResponseStatus, ResultAccumulator, Tags,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
