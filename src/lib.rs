//! Cloud Eye Service provider
//!
//! This crate manages CES alarm rules as declarative resources: a rule that
//! watches one cloud metric, fires when a threshold condition holds for a
//! number of consecutive periods, and optionally triggers notification or
//! autoscaling actions.
//!
//! # Overview
//!
//! - **Schema types**: the provider and `telefonicaopencloud_ces_alarmrule` schemas
//! - **ProviderService trait**: the host-facing operations (plan, create, read, update, delete, import)
//! - **CesProvider**: the implementation backed by the CES REST API
//! - **Clients**: typed CES alarm-rule calls and autoscaling policy URL helpers
//! - **Retry**: bounded exponential backoff for update and delete
//! - **Error types**: one error enum with contextual wrapping
//! - **Logging**: integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use ces_provider::{CesProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     ces_provider::init_logging();
//!
//!     let provider = CesProvider::new();
//!     provider
//!         .configure(json!({"region": "eu-de", "project_id": "...", "auth_token": "..."}))
//!         .await?;
//!
//!     let config = json!({
//!         "alarm_name": "cpu_high",
//!         "metric": [{
//!             "namespace": "SYS.ECS",
//!             "metric_name": "cpu_util",
//!             "dimensions": [{"name": "instance_id", "value": "..."}]
//!         }],
//!         "condition": [{
//!             "period": 300, "filter": "average", "comparison_operator": ">",
//!             "value": 80, "count": 3
//!         }]
//!     });
//!     let plan = provider
//!         .plan("telefonicaopencloud_ces_alarmrule", None, config.clone(), config)
//!         .await?;
//!     let state = provider
//!         .create("telefonicaopencloud_ces_alarmrule", plan.planned_state)
//!         .await?;
//!     println!("created {}", state["alarm_id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Timeouts
//!
//! Create, update and delete are bounded by per-operation timeouts
//! (10, 10 and 5 minutes unless configured). Update and delete retry
//! transient failures until their timeout; create is never retried.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod validators;

// Re-export main types at crate root
pub use config::{ProviderConfig, ResourceTimeouts};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CesProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
