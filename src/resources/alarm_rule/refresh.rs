//! Copy a remote alarm rule into the state record.

use tracing::warn;

use super::model::AlarmRuleState;
use crate::client::alarmrule::AlarmRule;
use crate::error::ProviderError;

/// Write every field the remote reported into `state`.
///
/// Optional fields the remote left out keep their prior value. Required
/// fields the remote left out also keep their prior value and are returned
/// as read inconsistencies; they are logged but never fatal.
pub fn refresh_state(remote: &AlarmRule, state: &mut AlarmRuleState) -> Vec<String> {
    let mut inconsistencies = Vec::new();

    fn required<T: Clone>(
        field: &str,
        remote: &Option<T>,
        target: &mut T,
        inconsistencies: &mut Vec<String>,
    ) {
        match remote {
            Some(value) => *target = value.clone(),
            None => inconsistencies.push(format!("{} missing from remote response", field)),
        }
    }

    fn optional<T: Clone>(remote: &Option<T>, target: &mut T) {
        if let Some(value) = remote {
            *target = value.clone();
        }
    }

    match &remote.alarm_id {
        Some(id) => state.alarm_id = Some(id.clone()),
        None => inconsistencies.push("alarm_id missing from remote response".to_string()),
    }
    required("alarm_name", &remote.alarm_name, &mut state.alarm_name, &mut inconsistencies);
    required("metric", &remote.metric, &mut state.metric, &mut inconsistencies);
    required("condition", &remote.condition, &mut state.condition, &mut inconsistencies);

    if remote.alarm_description.is_some() {
        state.alarm_description = remote.alarm_description.clone();
    }
    optional(&remote.alarm_actions, &mut state.alarm_actions);
    optional(&remote.insufficientdata_actions, &mut state.insufficientdata_actions);
    optional(&remote.ok_actions, &mut state.ok_actions);
    optional(&remote.alarm_enabled, &mut state.alarm_enabled);
    optional(&remote.alarm_action_enabled, &mut state.alarm_action_enabled);
    if remote.update_time.is_some() {
        state.update_time = remote.update_time;
    }
    if remote.alarm_state.is_some() {
        state.alarm_state = remote.alarm_state.clone();
    }

    for inconsistency in &inconsistencies {
        warn!(alarm_id = ?state.alarm_id, %inconsistency, "inconsistent alarm rule read");
    }
    inconsistencies
}

/// Build a fresh record from a remote rule, e.g. on import.
pub fn state_from_remote(remote: &AlarmRule) -> Result<AlarmRuleState, ProviderError> {
    let missing: Vec<&str> = [
        ("alarm_id", remote.alarm_id.is_none()),
        ("alarm_name", remote.alarm_name.is_none()),
        ("metric", remote.metric.is_none()),
        ("condition", remote.condition.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, is_missing)| is_missing.then_some(field))
    .collect();

    match (&remote.alarm_name, &remote.metric, &remote.condition) {
        (Some(alarm_name), Some(metric), Some(condition)) if missing.is_empty() => {
            Ok(AlarmRuleState {
                alarm_id: remote.alarm_id.clone(),
                alarm_name: alarm_name.clone(),
                alarm_description: remote.alarm_description.clone(),
                metric: metric.clone(),
                condition: condition.clone(),
                alarm_actions: remote.alarm_actions.clone().unwrap_or_default(),
                insufficientdata_actions: remote
                    .insufficientdata_actions
                    .clone()
                    .unwrap_or_default(),
                ok_actions: remote.ok_actions.clone().unwrap_or_default(),
                alarm_enabled: remote.alarm_enabled.unwrap_or(true),
                alarm_action_enabled: remote.alarm_action_enabled.unwrap_or(true),
                update_time: remote.update_time,
                alarm_state: remote.alarm_state.clone(),
            })
        },
        _ => Err(ProviderError::Build(format!(
            "remote alarm rule is missing required field(s): {}",
            missing.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::alarmrule::{
        ComparisonOperator, ConditionInfo, DimensionInfo, Filter, MetricInfo,
    };

    fn metric() -> MetricInfo {
        MetricInfo {
            namespace: "SYS.ECS".to_string(),
            metric_name: "cpu_util".to_string(),
            dimensions: vec![DimensionInfo {
                name: "instance_id".to_string(),
                value: "i-1".to_string(),
            }],
        }
    }

    fn condition(value: i64) -> ConditionInfo {
        ConditionInfo {
            period: 300,
            filter: Filter::Average,
            comparison_operator: ComparisonOperator::Greater,
            value,
            unit: None,
            count: 3,
        }
    }

    fn state() -> AlarmRuleState {
        AlarmRuleState {
            alarm_id: Some("al1".to_string()),
            alarm_name: "cpu_high".to_string(),
            alarm_description: Some("prior".to_string()),
            metric: metric(),
            condition: condition(80),
            alarm_actions: vec![],
            insufficientdata_actions: vec![],
            ok_actions: vec![],
            alarm_enabled: true,
            alarm_action_enabled: true,
            update_time: None,
            alarm_state: None,
        }
    }

    fn full_remote() -> AlarmRule {
        AlarmRule {
            alarm_id: Some("al1".to_string()),
            alarm_name: Some("cpu_higher".to_string()),
            alarm_description: None,
            metric: Some(metric()),
            condition: Some(condition(90)),
            alarm_actions: Some(vec![]),
            insufficientdata_actions: None,
            ok_actions: None,
            alarm_enabled: Some(false),
            alarm_action_enabled: None,
            update_time: Some(1_600_000_000_123),
            alarm_state: Some("alarm".to_string()),
        }
    }

    #[test]
    fn test_refresh_copies_server_fields() {
        let mut state = state();
        let inconsistencies = refresh_state(&full_remote(), &mut state);
        assert!(inconsistencies.is_empty());
        assert_eq!(state.alarm_name, "cpu_higher");
        assert_eq!(state.condition.value, 90);
        assert!(!state.alarm_enabled);
        assert_eq!(state.update_time, Some(1_600_000_000_123));
        assert_eq!(state.alarm_state.as_deref(), Some("alarm"));
    }

    #[test]
    fn test_missing_optional_fields_keep_prior_values() {
        let mut state = state();
        refresh_state(&full_remote(), &mut state);
        assert_eq!(state.alarm_description.as_deref(), Some("prior"));
        assert!(state.alarm_action_enabled);
    }

    #[test]
    fn test_missing_required_fields_are_reported_not_fatal() {
        let mut state = state();
        let remote = AlarmRule {
            alarm_state: Some("insufficient_data".to_string()),
            ..Default::default()
        };
        let inconsistencies = refresh_state(&remote, &mut state);
        assert_eq!(inconsistencies.len(), 4);
        assert!(inconsistencies[0].starts_with("alarm_id"));
        assert_eq!(state.alarm_id.as_deref(), Some("al1"));
        assert_eq!(state.metric, metric());
        assert_eq!(state.alarm_state.as_deref(), Some("insufficient_data"));
    }

    #[test]
    fn test_state_from_remote() {
        let state = state_from_remote(&full_remote()).unwrap();
        assert_eq!(state.alarm_id.as_deref(), Some("al1"));
        assert!(state.ok_actions.is_empty());
        assert!(state.alarm_action_enabled);

        let err = state_from_remote(&AlarmRule {
            alarm_id: Some("al1".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Build error: remote alarm rule is missing required field(s): alarm_name, metric, condition"
        );
    }

    #[test]
    fn test_echoed_create_payload_refreshes_to_planned_record() {
        let mut planned = state();
        planned.alarm_id = None;
        let opts = crate::resources::alarm_rule::build_create_opts(&planned).unwrap();

        let echoed = AlarmRule {
            alarm_id: Some("al9".to_string()),
            alarm_name: Some(opts.alarm_name),
            alarm_description: opts.alarm_description,
            metric: Some(opts.metric),
            condition: Some(opts.condition),
            alarm_actions: Some(opts.alarm_actions),
            insufficientdata_actions: Some(opts.insufficientdata_actions),
            ok_actions: Some(opts.ok_actions),
            alarm_enabled: Some(opts.alarm_enabled),
            alarm_action_enabled: Some(opts.alarm_action_enabled),
            update_time: Some(1_600_000_000_009),
            alarm_state: Some("ok".to_string()),
        };

        let mut refreshed = planned.clone();
        assert!(refresh_state(&echoed, &mut refreshed).is_empty());

        let expected = AlarmRuleState {
            alarm_id: Some("al9".to_string()),
            update_time: Some(1_600_000_000_009),
            alarm_state: Some("ok".to_string()),
            ..planned
        };
        assert_eq!(refreshed, expected);
    }
}
