//! Resources managed by this provider.

pub mod alarm_rule;
