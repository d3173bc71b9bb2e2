//! Request payload builders.
//!
//! Builders assume the record already passed schema validation. They only
//! fail on shapes the remote could never accept, which indicates a defect
//! upstream rather than a user error.

use super::model::AlarmRuleState;
use super::schema::{MAX_DIMENSIONS, MAX_NOTIFICATIONS};
use crate::client::alarmrule::{ActionInfo, CreateOpts, UpdateOpts};
use crate::error::ProviderError;

fn check_actions(field: &str, actions: &[ActionInfo]) -> Result<(), ProviderError> {
    for (i, action) in actions.iter().enumerate() {
        if action.notification_list.len() > MAX_NOTIFICATIONS {
            return Err(ProviderError::Build(format!(
                "{}.{}.notification_list holds {} entries, at most {} are accepted",
                field,
                i,
                action.notification_list.len(),
                MAX_NOTIFICATIONS
            )));
        }
    }
    Ok(())
}

fn check_all_actions(state: &AlarmRuleState) -> Result<(), ProviderError> {
    check_actions("alarm_actions", &state.alarm_actions)?;
    check_actions("insufficientdata_actions", &state.insufficientdata_actions)?;
    check_actions("ok_actions", &state.ok_actions)
}

/// Build the create payload from a planned record.
pub fn build_create_opts(state: &AlarmRuleState) -> Result<CreateOpts, ProviderError> {
    let dimensions = state.metric.dimensions.len();
    if dimensions == 0 || dimensions > MAX_DIMENSIONS as usize {
        return Err(ProviderError::Build(format!(
            "metric.dimensions holds {} entries, 1 to {} are accepted",
            dimensions, MAX_DIMENSIONS
        )));
    }
    check_all_actions(state)?;

    Ok(CreateOpts {
        alarm_name: state.alarm_name.clone(),
        alarm_description: state.alarm_description.clone(),
        metric: state.metric.clone(),
        condition: state.condition.clone(),
        alarm_actions: state.alarm_actions.clone(),
        insufficientdata_actions: state.insufficientdata_actions.clone(),
        ok_actions: state.ok_actions.clone(),
        alarm_enabled: state.alarm_enabled,
        alarm_action_enabled: state.alarm_action_enabled,
    })
}

/// Build the update payload: the fields that can change in place.
pub fn build_update_opts(state: &AlarmRuleState) -> Result<UpdateOpts, ProviderError> {
    check_all_actions(state)?;

    Ok(UpdateOpts {
        alarm_name: state.alarm_name.clone(),
        alarm_description: state.alarm_description.clone(),
        condition: state.condition.clone(),
        alarm_actions: state.alarm_actions.clone(),
        insufficientdata_actions: state.insufficientdata_actions.clone(),
        ok_actions: state.ok_actions.clone(),
        alarm_enabled: state.alarm_enabled,
        alarm_action_enabled: state.alarm_action_enabled,
    })
}
