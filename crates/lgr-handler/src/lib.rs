//! LGR Handler - Log group reconciliation against a log service
//!
//! Wires the pure primitives from `lgr_core` to a [`LogService`]:
//! - [`service`]: the adapter trait consumed by the engine
//! - [`engine`]: the ordered reconciliation steps
//! - [`handler`]: event parsing, queue seeding and the safety net
//! - [`memory`]: a map-backed service for dry runs and tests
//! - [`config`]: TOML configuration with environment overrides
//!
//! # Example
//!
//! ```rust
//! use lgr_handler::{HandlerConfig, InMemoryLogService, LogGroupHandler};
//! use serde_json::json;
//!
//! let config = HandlerConfig::default()
//!     .with_region("us-east-1")
//!     .with_account_number("123456789012");
//! let service = InMemoryLogService::new(config.deployment());
//! let handler = LogGroupHandler::new(config, service);
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let response = runtime.block_on(handler.handle(&json!({
//!     "op": "upsert",
//!     "component_def": {"name": "app-logs"}
//! })));
//! assert!(response.is_success());
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod handler;
pub mod memory;
pub mod service;

// Re-exports for convenience
pub use config::{ConfigError, HandlerConfig};
pub use engine::{ReconcileInput, Reconciliation, ReconciliationEngine};
pub use handler::{seed_queue, LogGroupHandler};
pub use memory::{InMemoryLogService, ServiceSnapshot, StoredLogGroup};
pub use service::{CreateLogGroupRequest, LogGroupDescription, LogService};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with LGR Handler
    pub use crate::{
        HandlerConfig, InMemoryLogService, LogGroupHandler, LogService, ReconciliationEngine,
    };
    pub use lgr_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
