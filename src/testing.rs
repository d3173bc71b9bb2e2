//! Testing utilities for the provider.
//!
//! - [`ProviderTester`]: drives a [`ProviderService`] the way the host does
//! - [`InMemoryAlarmRules`]: a scripted in-memory alarm-rule API
//! - [`ManualClock`]: simulated time for retry deadlines
//! - [`StaticClientFactory`]: hands a fixed client to the provider
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ces_provider::testing::{InMemoryAlarmRules, ManualClock, ProviderTester, StaticClientFactory};
//! use ces_provider::CesProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_alarm_rule() {
//!     let api = Arc::new(InMemoryAlarmRules::new());
//!     let provider = CesProvider::new()
//!         .with_client_factory(Arc::new(StaticClientFactory::new(api.clone())))
//!         .with_clock(Arc::new(ManualClock::new()));
//!     let tester = ProviderTester::new(provider);
//!
//!     tester.configure(json!({"region": "eu-de", "project_id": "p", "auth_token": "t"})).await.unwrap();
//!     let state = tester.lifecycle_create("telefonicaopencloud_ces_alarmrule", config).await.unwrap();
//!     assert_eq!(state["alarm_state"], "ok");
//! }
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::alarmrule::{AlarmRule, AlarmRuleApi, CreateOpts, CreateResult, UpdateOpts};
use crate::client::ClientFactory;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::retry::Clock;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness that drives a [`ProviderService`] the way the host does.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Ok(())` if validation passes (no error diagnostics).
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Ok(())` if configuration succeeds.
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Full plan operation with explicit config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade resource state from an older schema version.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back.
    ///
    /// Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back.
    ///
    /// Fails if the plan requires replacement, since that is not an update.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        if plan.requires_replace {
            return Err(ProviderError::InvalidRequest(format!(
                "plan for {} requires replacement",
                resource_type
            )));
        }
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan a delete, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update, then delete.
    ///
    /// Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone())
            .await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// Fakes
// =========================================================================

/// A remote operation on [`InMemoryAlarmRules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`AlarmRuleApi::create`].
    Create,
    /// [`AlarmRuleApi::get`].
    Get,
    /// [`AlarmRuleApi::update`].
    Update,
    /// [`AlarmRuleApi::delete`].
    Delete,
}

/// A scripted remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// 503, retryable.
    Unavailable,
    /// 429, retryable.
    RateLimited,
    /// 404.
    NotFound,
    /// 409.
    Conflict,
    /// 400.
    InvalidRequest,
    /// 403.
    PermissionDenied,
}

impl FailureMode {
    /// The error a real client would return for this failure.
    pub fn to_error(self) -> ProviderError {
        let message = "scripted failure".to_string();
        match self {
            FailureMode::Unavailable => ProviderError::Unavailable(message),
            FailureMode::RateLimited => ProviderError::ResourceExhausted(message),
            FailureMode::NotFound => ProviderError::NotFound(message),
            FailureMode::Conflict => ProviderError::Conflict(message),
            FailureMode::InvalidRequest => ProviderError::InvalidRequest(message),
            FailureMode::PermissionDenied => ProviderError::PermissionDenied(message),
        }
    }
}

const ID_BASE: u64 = 1_600_000_000_000;

#[derive(Default)]
struct Remote {
    rules: BTreeMap<String, AlarmRule>,
    counter: u64,
    calls: HashMap<Operation, usize>,
    scripted: HashMap<Operation, VecDeque<FailureMode>>,
    always: HashMap<Operation, FailureMode>,
    created: Vec<CreateOpts>,
    updated: Vec<(String, UpdateOpts)>,
}

impl Remote {
    fn tick(&mut self) -> u64 {
        self.counter += 1;
        ID_BASE + self.counter
    }

    /// Count the call and pop any failure scripted for it.
    fn enter(&mut self, op: Operation) -> Result<(), ProviderError> {
        *self.calls.entry(op).or_default() += 1;
        if let Some(mode) = self.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(mode.to_error());
        }
        match self.always.get(&op) {
            Some(mode) => Err(mode.to_error()),
            None => Ok(()),
        }
    }
}

fn not_found(id: &str) -> ProviderError {
    ProviderError::NotFound(format!("alarm rule {} does not exist", id))
}

/// An in-memory alarm-rule service with scriptable failures.
///
/// Created rules get ids of the form `al<n>`, an `ok` alarm state and a
/// fresh `update_time`, the way the remote reports them.
#[derive(Default)]
pub struct InMemoryAlarmRules {
    inner: Mutex<Remote>,
}

impl InMemoryAlarmRules {
    /// An empty service with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Remote> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next `times` calls of `op` with `mode`.
    pub fn fail_next(&self, op: Operation, mode: FailureMode, times: usize) {
        let mut remote = self.lock();
        let queue = remote.scripted.entry(op).or_default();
        queue.extend(std::iter::repeat(mode).take(times));
    }

    /// Fail every call of `op` until [`clear_failures`](Self::clear_failures).
    pub fn fail_always(&self, op: Operation, mode: FailureMode) {
        self.lock().always.insert(op, mode);
    }

    /// Drop every scripted and permanent failure.
    pub fn clear_failures(&self) {
        let mut remote = self.lock();
        remote.scripted.clear();
        remote.always.clear();
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Payloads of successful creates, oldest first.
    pub fn created_opts(&self) -> Vec<CreateOpts> {
        self.lock().created.clone()
    }

    /// Payloads of successful updates, oldest first.
    pub fn updated_opts(&self) -> Vec<(String, UpdateOpts)> {
        self.lock().updated.clone()
    }

    /// Seed a rule directly, bypassing call accounting.
    ///
    /// A rule without an id gets one assigned.
    pub fn insert(&self, mut rule: AlarmRule) -> String {
        let mut remote = self.lock();
        let id = match rule.alarm_id.clone() {
            Some(id) => id,
            None => format!("al{}", remote.tick()),
        };
        rule.alarm_id = Some(id.clone());
        remote.rules.insert(id.clone(), rule);
        id
    }

    /// Drop a rule behind the provider's back.
    pub fn remove(&self, id: &str) -> Option<AlarmRule> {
        self.lock().rules.remove(id)
    }

    /// The stored rule with `id`, if any.
    pub fn rule(&self, id: &str) -> Option<AlarmRule> {
        self.lock().rules.get(id).cloned()
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.lock().rules.len()
    }

    /// Whether no rules are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().rules.is_empty()
    }
}

#[async_trait]
impl AlarmRuleApi for InMemoryAlarmRules {
    async fn create(&self, opts: &CreateOpts) -> Result<CreateResult, ProviderError> {
        let mut remote = self.lock();
        remote.enter(Operation::Create)?;

        let stamp = remote.tick();
        let id = format!("al{}", stamp);
        let rule = AlarmRule {
            alarm_id: Some(id.clone()),
            alarm_name: Some(opts.alarm_name.clone()),
            alarm_description: opts.alarm_description.clone(),
            metric: Some(opts.metric.clone()),
            condition: Some(opts.condition.clone()),
            alarm_actions: Some(opts.alarm_actions.clone()),
            insufficientdata_actions: Some(opts.insufficientdata_actions.clone()),
            ok_actions: Some(opts.ok_actions.clone()),
            alarm_enabled: Some(opts.alarm_enabled),
            alarm_action_enabled: Some(opts.alarm_action_enabled),
            update_time: Some(stamp as i64),
            alarm_state: Some("ok".to_string()),
        };
        remote.rules.insert(id.clone(), rule);
        remote.created.push(opts.clone());
        Ok(CreateResult { alarm_id: id })
    }

    async fn get(&self, id: &str) -> Result<AlarmRule, ProviderError> {
        let mut remote = self.lock();
        remote.enter(Operation::Get)?;
        remote.rules.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, opts: &UpdateOpts) -> Result<(), ProviderError> {
        let mut remote = self.lock();
        remote.enter(Operation::Update)?;
        if !remote.rules.contains_key(id) {
            return Err(not_found(id));
        }

        let stamp = remote.tick();
        if let Some(rule) = remote.rules.get_mut(id) {
            rule.alarm_name = Some(opts.alarm_name.clone());
            rule.alarm_description = opts.alarm_description.clone();
            rule.condition = Some(opts.condition.clone());
            rule.alarm_actions = Some(opts.alarm_actions.clone());
            rule.insufficientdata_actions = Some(opts.insufficientdata_actions.clone());
            rule.ok_actions = Some(opts.ok_actions.clone());
            rule.alarm_enabled = Some(opts.alarm_enabled);
            rule.alarm_action_enabled = Some(opts.alarm_action_enabled);
            rule.update_time = Some(stamp as i64);
        }
        remote.updated.push((id.to_string(), opts.clone()));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let mut remote = self.lock();
        remote.enter(Operation::Delete)?;
        remote.rules.remove(id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}

#[derive(Default)]
struct ClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Simulated time. Sleeping advances the clock instantly.
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ClockState>,
}

impl ManualClock {
    /// A clock at zero elapsed time.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ClockState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    /// Simulated time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Every requested sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.lock();
            state.sleeps.push(duration);
            state.elapsed += duration;
        }
        tokio::task::yield_now().await;
    }
}

/// A [`ClientFactory`] that ignores the configuration and returns one client.
pub struct StaticClientFactory {
    api: Arc<dyn AlarmRuleApi>,
}

impl StaticClientFactory {
    /// Hand out `api` for every configuration.
    pub fn new(api: Arc<dyn AlarmRuleApi>) -> Self {
        Self { api }
    }
}

impl ClientFactory for StaticClientFactory {
    fn alarm_rule_client(
        &self,
        _config: &ProviderConfig,
    ) -> Result<Arc<dyn AlarmRuleApi>, ProviderError> {
        Ok(self.api.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CesProvider;
    use crate::resources::alarm_rule::RESOURCE_TYPE;
    use serde_json::json;

    fn tester() -> (ProviderTester<CesProvider>, Arc<InMemoryAlarmRules>) {
        let api = Arc::new(InMemoryAlarmRules::new());
        let provider = CesProvider::new()
            .with_client_factory(Arc::new(StaticClientFactory::new(api.clone())))
            .with_clock(Arc::new(ManualClock::new()));
        (ProviderTester::new(provider), api)
    }

    fn credentials() -> Value {
        json!({"region": "eu-de", "project_id": "p-1", "auth_token": "token"})
    }

    fn config(name: &str, value: i64) -> Value {
        json!({
            "alarm_name": name,
            "metric": [{
                "namespace": "SYS.ECS",
                "metric_name": "cpu_util",
                "dimensions": [{"name": "instance_id", "value": "i-1"}]
            }],
            "condition": [{
                "period": 300,
                "filter": "average",
                "comparison_operator": ">",
                "value": value,
                "count": 3
            }]
        })
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let (tester, _) = tester();
        assert!(tester.configure(credentials()).await.is_ok());
    }

    #[tokio::test]
    async fn test_tester_configure_reports_diagnostics() {
        let (tester, _) = tester();
        let err = tester
            .configure(json!({"region": "eu-de", "project_id": "p-1", "auth_token": "t", "ces_endpoint": "::"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
    }

    #[test]
    fn test_tester_resource_types() {
        let (tester, _) = tester();
        assert_eq!(tester.resource_types(), vec![RESOURCE_TYPE.to_string()]);
        assert!(tester.schema().resources.contains_key(RESOURCE_TYPE));
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let (tester, api) = tester();
        tester.configure(credentials()).await.unwrap();

        let final_state = tester
            .lifecycle_crud(RESOURCE_TYPE, config("cpu_high", 80), config("cpu_higher", 90))
            .await
            .unwrap();

        assert_eq!(final_state["alarm_name"], "cpu_higher");
        assert_eq!(final_state["condition"][0]["value"], 90);
        assert!(api.is_empty());
        assert_eq!(api.created_opts().len(), 1);
        assert_eq!(api.updated_opts().len(), 1);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_update_refuses_replacement() {
        let (tester, _) = tester();
        tester.configure(credentials()).await.unwrap();
        let created = tester
            .lifecycle_create(RESOURCE_TYPE, config("cpu_high", 80))
            .await
            .unwrap();

        let mut proposed = config("cpu_high", 80);
        proposed["metric"][0]["metric_name"] = json!("mem_util");
        let err = tester
            .lifecycle_update(RESOURCE_TYPE, created, proposed)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requires replacement"));
    }

    #[tokio::test]
    async fn test_tester_upgrade_and_stop() {
        let (tester, _) = tester();
        tester.configure(credentials()).await.unwrap();

        let upgraded = tester
            .upgrade_resource_state(RESOURCE_TYPE, 0, config("cpu_high", 80))
            .await
            .unwrap();
        assert_eq!(upgraded["alarm_enabled"], true);

        tester.stop().await.unwrap();
        assert!(tester.provider().config().await.is_none());
    }

    #[tokio::test]
    async fn test_tester_plan_update_assertions() {
        let (tester, _) = tester();
        tester.configure(credentials()).await.unwrap();
        let created = tester
            .lifecycle_create(RESOURCE_TYPE, config("cpu_high", 80))
            .await
            .unwrap();

        let plan = tester
            .plan_update(RESOURCE_TYPE, created, config("cpu_high", 95))
            .await
            .unwrap();
        assert_plan_has_changes(&plan);
        assert_plan_changes_attribute(&plan, "condition");
        assert_plan_does_not_change_attribute(&plan, "metric");
        assert_plan_updates_in_place(&plan);
    }

    #[test]
    #[should_panic(expected = "Expected plan to not change attribute 'metric'")]
    fn test_assert_plan_does_not_change_attribute_fails() {
        let plan = PlanResult::with_changes(
            Value::Null,
            vec![crate::types::AttributeChange::modified(
                "metric",
                serde_json::json!([]),
                serde_json::json!([{}]),
            )],
            true,
        );
        assert_plan_does_not_change_attribute(&plan, "metric");
    }

    #[tokio::test]
    async fn test_in_memory_failures_are_consumed_in_order() {
        let api = InMemoryAlarmRules::new();
        let id = api.insert(AlarmRule::default());
        api.fail_next(Operation::Get, FailureMode::Unavailable, 1);
        api.fail_next(Operation::Get, FailureMode::NotFound, 1);

        assert!(api.get(&id).await.unwrap_err().is_retryable());
        assert!(api.get(&id).await.unwrap_err().is_not_found());
        assert_eq!(api.get(&id).await.unwrap().alarm_id.as_deref(), Some(id.as_str()));
        assert_eq!(api.calls(Operation::Get), 3);
    }

    #[tokio::test]
    async fn test_in_memory_fail_always_until_cleared() {
        let api = InMemoryAlarmRules::new();
        let id = api.insert(AlarmRule::default());
        api.fail_always(Operation::Delete, FailureMode::Conflict);

        assert!(api.delete(&id).await.is_err());
        assert!(api.delete(&id).await.is_err());
        api.clear_failures();
        api.delete(&id).await.unwrap();
        assert!(api.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(2)).await;
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.now() - start, Duration::from_secs(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid alarm_name")];
        assert_has_errors(&diagnostics);
        assert_error_contains(&diagnostics, "alarm_name");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("alarm_name"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("alarm_name"));
        assert!(display.contains("More info"));
    }
}
