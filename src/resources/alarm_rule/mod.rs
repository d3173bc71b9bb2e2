//! The Cloud Eye alarm-rule resource.
//!
//! An alarm rule watches one metric and fires actions when a condition holds
//! for a number of consecutive periods. The metric cannot change in place;
//! everything else is updated through the remote update call.

pub mod lifecycle;
pub mod model;
pub mod params;
pub mod refresh;
pub mod schema;

pub use lifecycle::{LifecycleContext, ReadOutcome};
pub use model::AlarmRuleState;
pub use params::{build_create_opts, build_update_opts};
pub use refresh::{refresh_state, state_from_remote};
pub use schema::schema;

/// Resource type name used by the host.
pub const RESOURCE_TYPE: &str = "telefonicaopencloud_ces_alarmrule";

/// Name used in log lines and error messages.
pub const DISPLAY_NAME: &str = "CES-AlarmRule";
