//! Create, read, update and delete of alarm rules against the remote API.
//!
//! An alarm rule moves through `absent -> creating -> present ->
//! (updating -> present)* -> deleting -> absent`. Create is attempted once;
//! update and delete are retried on transient failures until their deadline.
//! Every error leaving this module names the operation and, where known, the
//! rule id.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::model::AlarmRuleState;
use super::params::{build_create_opts, build_update_opts};
use super::refresh::refresh_state;
use super::DISPLAY_NAME;
use crate::client::alarmrule::AlarmRuleApi;
use crate::config::{LifecyclePhase, ResourceTimeouts};
use crate::error::ProviderError;
use crate::retry::{Clock, RetryPolicy};

/// Everything an operation needs besides the record itself.
#[derive(Clone)]
pub struct LifecycleContext {
    /// Remote API.
    pub api: Arc<dyn AlarmRuleApi>,
    /// Time source for retry loops.
    pub clock: Arc<dyn Clock>,
    /// Per-phase deadlines.
    pub timeouts: ResourceTimeouts,
}

/// Result of reading an alarm rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The rule exists; the record carries the remote values.
    Present(AlarmRuleState),
    /// The rule no longer exists and should be dropped from state.
    Gone,
}

fn create_context() -> String {
    format!("Error creating {}", DISPLAY_NAME)
}

fn read_context(id: &str) -> String {
    format!("Error reading {} {}", DISPLAY_NAME, id)
}

fn update_context(id: &str) -> String {
    format!("Error updating {} {}", DISPLAY_NAME, id)
}

fn delete_context(id: &str) -> String {
    format!("Error deleting {} {}", DISPLAY_NAME, id)
}

/// Fetch the rule just written and merge it into `state`.
///
/// Unlike [`read`], a missing rule is an error here.
async fn confirm(
    ctx: &LifecycleContext,
    id: &str,
    mut state: AlarmRuleState,
) -> Result<AlarmRuleState, ProviderError> {
    let remote = ctx
        .api
        .get(id)
        .await
        .map_err(|e| e.with_context(read_context(id)))?;
    debug!(alarm_id = id, ?remote, "retrieved {}", DISPLAY_NAME);
    refresh_state(&remote, &mut state);
    Ok(state)
}

/// Create the rule described by `planned` and return the confirmed record.
pub async fn create(
    ctx: &LifecycleContext,
    planned: &AlarmRuleState,
) -> Result<AlarmRuleState, ProviderError> {
    let opts = build_create_opts(planned).map_err(|e| {
        e.with_context("building parameter failed")
            .with_context(create_context())
    })?;
    debug!(?opts, "create {} options", DISPLAY_NAME);

    let timeout = ctx.timeouts.for_phase(LifecyclePhase::Create);
    let created = match tokio::time::timeout(timeout, ctx.api.create(&opts)).await {
        Ok(result) => result.map_err(|e| {
            error!(error = %e, "create {} failed", DISPLAY_NAME);
            e.with_context(create_context())
        })?,
        Err(_) => {
            return Err(ProviderError::DeadlineExceeded(format!(
                "create did not complete within {:?}",
                timeout
            ))
            .with_context(create_context()))
        },
    };
    info!(alarm_id = %created.alarm_id, "created {}", DISPLAY_NAME);

    let mut state = planned.clone();
    state.alarm_id = Some(created.alarm_id.clone());
    confirm(ctx, &created.alarm_id, state).await
}

/// Read the current remote values of the rule in `state`.
///
/// A rule the remote no longer knows, or a record without an id, is
/// [`ReadOutcome::Gone`].
pub async fn read(
    ctx: &LifecycleContext,
    state: &AlarmRuleState,
) -> Result<ReadOutcome, ProviderError> {
    let Some(id) = state.id() else {
        debug!("{} has no id, treating as gone", DISPLAY_NAME);
        return Ok(ReadOutcome::Gone);
    };

    match ctx.api.get(id).await {
        Ok(remote) => {
            debug!(alarm_id = id, ?remote, "retrieved {}", DISPLAY_NAME);
            let mut refreshed = state.clone();
            refresh_state(&remote, &mut refreshed);
            Ok(ReadOutcome::Present(refreshed))
        },
        Err(e) if e.is_not_found() => {
            warn!(alarm_id = id, "{} no longer exists, removing from state", DISPLAY_NAME);
            Ok(ReadOutcome::Gone)
        },
        Err(e) => Err(e.with_context(read_context(id))),
    }
}

/// Update the rule in place and return the confirmed record.
pub async fn update(
    ctx: &LifecycleContext,
    planned: &AlarmRuleState,
) -> Result<AlarmRuleState, ProviderError> {
    let Some(id) = planned.id() else {
        return Err(ProviderError::Build("alarm_id is not set".to_string())
            .with_context(format!("Error updating {}", DISPLAY_NAME)));
    };

    let opts = build_update_opts(planned).map_err(|e| {
        e.with_context("building parameter failed")
            .with_context(update_context(id))
    })?;
    debug!(alarm_id = id, ?opts, "updating {}", DISPLAY_NAME);

    let policy = RetryPolicy::with_timeout(ctx.timeouts.for_phase(LifecyclePhase::Update));
    let api = ctx.api.as_ref();
    let opts = &opts;
    policy
        .run(ctx.clock.as_ref(), "update", || api.update(id, opts))
        .await
        .map_err(|e| {
            error!(alarm_id = id, error = %e, "update {} failed", DISPLAY_NAME);
            e.with_context(update_context(id))
        })?;
    info!(alarm_id = id, "updated {}", DISPLAY_NAME);

    confirm(ctx, id, planned.clone()).await
}

/// Delete the rule. A rule that is already gone counts as deleted.
pub async fn delete(ctx: &LifecycleContext, state: &AlarmRuleState) -> Result<(), ProviderError> {
    let Some(id) = state.id() else {
        debug!("{} has no id, nothing to delete", DISPLAY_NAME);
        return Ok(());
    };
    debug!(alarm_id = id, "deleting {}", DISPLAY_NAME);

    let policy = RetryPolicy::with_timeout(ctx.timeouts.for_phase(LifecyclePhase::Delete));
    let api = ctx.api.as_ref();
    match policy
        .run(ctx.clock.as_ref(), "delete", || api.delete(id))
        .await
    {
        Ok(()) => {
            info!(alarm_id = id, "deleted {}", DISPLAY_NAME);
            Ok(())
        },
        Err(e) if e.is_not_found() => {
            info!(alarm_id = id, "deleting an unavailable {}", DISPLAY_NAME);
            Ok(())
        },
        Err(e) => {
            error!(alarm_id = id, error = %e, "delete {} failed", DISPLAY_NAME);
            Err(e.with_context(delete_context(id)))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::alarmrule::{
        ComparisonOperator, ConditionInfo, DimensionInfo, Filter, MetricInfo,
    };
    use crate::testing::{FailureMode, InMemoryAlarmRules, ManualClock, Operation};
    use std::time::Duration;

    fn planned() -> AlarmRuleState {
        AlarmRuleState {
            alarm_id: None,
            alarm_name: "cpu_high".to_string(),
            alarm_description: None,
            metric: MetricInfo {
                namespace: "SYS.ECS".to_string(),
                metric_name: "cpu_util".to_string(),
                dimensions: vec![DimensionInfo {
                    name: "instance_id".to_string(),
                    value: "i-1".to_string(),
                }],
            },
            condition: ConditionInfo {
                period: 300,
                filter: Filter::Average,
                comparison_operator: ComparisonOperator::Greater,
                value: 80,
                unit: None,
                count: 3,
            },
            alarm_actions: vec![],
            insufficientdata_actions: vec![],
            ok_actions: vec![],
            alarm_enabled: true,
            alarm_action_enabled: true,
            update_time: None,
            alarm_state: None,
        }
    }

    fn context() -> (LifecycleContext, Arc<InMemoryAlarmRules>, Arc<ManualClock>) {
        let api = Arc::new(InMemoryAlarmRules::new());
        let clock = Arc::new(ManualClock::new());
        let ctx = LifecycleContext {
            api: api.clone(),
            clock: clock.clone(),
            timeouts: ResourceTimeouts::default(),
        };
        (ctx, api, clock)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_confirms() {
        let (ctx, api, _) = context();
        let created = create(&ctx, &planned()).await.unwrap();

        assert!(created.id().is_some());
        assert_eq!(created.alarm_state.as_deref(), Some("ok"));
        assert!(created.update_time.is_some());
        assert_eq!(api.calls(Operation::Create), 1);
        assert_eq!(api.calls(Operation::Get), 1);
    }

    #[tokio::test]
    async fn test_create_is_not_retried() {
        let (ctx, api, _) = context();
        api.fail_next(Operation::Create, FailureMode::Unavailable, 1);

        let err = create(&ctx, &planned()).await.unwrap_err();
        assert!(err.to_string().starts_with("Error creating CES-AlarmRule: "));
        assert_eq!(api.calls(Operation::Create), 1);
        assert!(api.is_empty());
    }

    #[tokio::test]
    async fn test_create_build_failure_makes_no_remote_call() {
        let (ctx, api, _) = context();
        let mut planned = planned();
        planned.metric.dimensions.clear();

        let err = create(&ctx, &planned).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error creating CES-AlarmRule: building parameter failed: Build error"));
        assert_eq!(api.calls(Operation::Create), 0);
    }

    #[tokio::test]
    async fn test_read_of_missing_rule_is_gone() {
        let (ctx, _, _) = context();
        let mut state = planned();
        state.alarm_id = Some("al-missing".to_string());
        assert_eq!(read(&ctx, &state).await.unwrap(), ReadOutcome::Gone);
        assert_eq!(read(&ctx, &planned()).await.unwrap(), ReadOutcome::Gone);
    }

    #[tokio::test]
    async fn test_read_error_carries_context() {
        let (ctx, api, _) = context();
        let created = create(&ctx, &planned()).await.unwrap();
        api.fail_next(Operation::Get, FailureMode::PermissionDenied, 1);

        let err = read(&ctx, &created).await.unwrap_err();
        let id = created.id().unwrap();
        assert_eq!(
            err.to_string(),
            format!("Error reading CES-AlarmRule {}: Permission denied: scripted failure", id)
        );
    }

    #[tokio::test]
    async fn test_update_retries_until_success() {
        let (ctx, api, clock) = context();
        let mut state = create(&ctx, &planned()).await.unwrap();
        api.fail_next(Operation::Update, FailureMode::RateLimited, 2);

        state.condition.value = 95;
        let updated = update(&ctx, &state).await.unwrap();

        assert_eq!(updated.condition.value, 95);
        assert_eq!(api.calls(Operation::Update), 3);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_update_of_externally_removed_rule_fails() {
        let (ctx, api, _) = context();
        let state = create(&ctx, &planned()).await.unwrap();
        let id = state.id().unwrap().to_string();
        api.remove(&id);

        let err = update(&ctx, &state).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err
            .to_string()
            .starts_with(&format!("Error updating CES-AlarmRule {}", id)));
    }

    #[tokio::test]
    async fn test_update_without_id_fails() {
        let (ctx, api, _) = context();
        let err = update(&ctx, &planned()).await.unwrap_err();
        assert!(matches!(err.root(), ProviderError::Build(_)));
        assert_eq!(api.calls(Operation::Update), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (ctx, api, _) = context();
        let state = create(&ctx, &planned()).await.unwrap();

        delete(&ctx, &state).await.unwrap();
        delete(&ctx, &state).await.unwrap();
        assert!(api.is_empty());
        assert_eq!(api.calls(Operation::Delete), 2);
    }

    #[tokio::test]
    async fn test_delete_terminal_error_carries_context() {
        let (ctx, api, _) = context();
        let state = create(&ctx, &planned()).await.unwrap();
        api.fail_next(Operation::Delete, FailureMode::Conflict, 1);

        let err = delete(&ctx, &state).await.unwrap_err();
        assert!(matches!(err.root(), ProviderError::Conflict(_)));
        assert_eq!(api.calls(Operation::Delete), 1);
    }
}
