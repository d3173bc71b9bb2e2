//! The Cloud Eye provider.
//!
//! [`CesProvider`] implements [`ProviderService`] for the alarm-rule
//! resource. It keeps the provider configuration behind a lock and builds a
//! fresh remote client for every resource operation.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{CesClientFactory, ClientFactory};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::alarm_rule::{
    self, lifecycle, state_from_remote, AlarmRuleState, LifecycleContext, ReadOutcome,
    DISPLAY_NAME, RESOURCE_TYPE,
};
use crate::retry::{Clock, TokioClock};
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::validate;

/// Provider for Cloud Eye alarm rules.
pub struct CesProvider {
    config: RwLock<Option<ProviderConfig>>,
    factory: Arc<dyn ClientFactory>,
    clock: Arc<dyn Clock>,
}

impl Default for CesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CesProvider {
    /// Create an unconfigured provider talking to the real endpoint.
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            factory: Arc::new(CesClientFactory),
            clock: Arc::new(TokioClock),
        }
    }

    /// Use `factory` to build remote clients.
    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Use `clock` for retry loops.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The active configuration, if [`ProviderService::configure`] succeeded.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    async fn context(&self) -> Result<LifecycleContext, ProviderError> {
        let guard = self.config.read().await;
        let config = guard
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
            .map_err(|e| e.with_context("Error creating Cloud Eye Service client"))?;
        let api = self
            .factory
            .alarm_rule_client(config)
            .map_err(|e| e.with_context("Error creating Cloud Eye Service client"))?;
        Ok(LifecycleContext {
            api,
            clock: self.clock.clone(),
            timeouts: config.timeouts.clone(),
        })
    }
}

fn ensure_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn validation_error(diagnostics: &[Diagnostic]) -> Option<ProviderError> {
    let messages: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(ProviderError::Validation(messages.join("; ")))
    }
}

/// Apply defaults and validate a proposed attribute tree.
fn prepare(schema: &Schema, mut value: Value) -> Result<Value, ProviderError> {
    schema.apply_defaults(&mut value);
    match validation_error(&validate(schema, &value)) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Drop nulls and empty lists so that absent and empty compare equal.
fn normalize(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| normalize(item).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| normalize(v).is_some())
}

/// Top-level changes between two trees, in field order.
fn diff(schema: &Schema, prior: &Value, planned: &Value) -> (Vec<AttributeChange>, bool) {
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for name in schema.block.field_names() {
        let computed_only = schema
            .block
            .attributes
            .get(name)
            .is_some_and(|a| a.flags.is_computed_only());
        if computed_only {
            continue;
        }

        let before = present(prior.get(name));
        let after = present(planned.get(name));
        if before.and_then(normalize) == after.and_then(normalize) {
            continue;
        }
        if schema.block.forces_new(name) {
            requires_replace = true;
        }
        changes.push(AttributeChange::new(name, before.cloned(), after.cloned()));
    }

    (changes, requires_replace)
}

fn computed_fields(schema: &Schema) -> Vec<&str> {
    let mut names: Vec<&str> = schema
        .block
        .attributes
        .iter()
        .filter(|(_, attr)| attr.flags.is_computed_only())
        .map(|(name, _)| name.as_str())
        .collect();
    names.sort_unstable();
    names
}

#[async_trait::async_trait]
impl ProviderService for CesProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(RESOURCE_TYPE, alarm_rule::schema())
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if diagnostics.is_empty() {
            if let Err(e) = ProviderConfig::from_value(config) {
                diagnostics.push(e.into());
            }
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::from_value(config) {
            Ok(config) => config.with_env_fallback(),
            Err(e) => return Ok(vec![e.into()]),
        };

        let diagnostics = config.validate();
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(errors = diagnostics.len(), "provider configuration rejected");
            return Ok(diagnostics);
        }

        info!(region = ?config.region, "provider configured");
        *self.config.write().await = Some(config);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        if self.config.write().await.take().is_some() {
            info!("provider stopped, configuration released");
        }
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        ensure_resource_type(resource_type)?;
        let schema = alarm_rule::schema();
        let mut config = config;
        schema.apply_defaults(&mut config);
        Ok(validate(&schema, &config))
    }

    /// Only the current schema version exists; its state gains any missing defaults.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        ensure_resource_type(resource_type)?;
        let schema = alarm_rule::schema();
        if u64::try_from(version).ok() != Some(schema.version) {
            return Err(ProviderError::InvalidRequest(format!(
                "cannot upgrade {} state from schema version {} to {}",
                DISPLAY_NAME, version, schema.version
            )));
        }
        let mut state = state;
        schema.apply_defaults(&mut state);
        Ok(state)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        ensure_resource_type(resource_type)?;
        let schema = alarm_rule::schema();
        let prior = prior_state.filter(|v| !v.is_null());

        if proposed_state.is_null() {
            let prior = prior.unwrap_or(Value::Null);
            let (changes, _) = diff(&schema, &prior, &Value::Null);
            debug!(changes = changes.len(), "planned delete");
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let mut planned = prepare(&schema, proposed_state)?;

        let Some(mut prior) = prior else {
            let (changes, _) = diff(&schema, &Value::Null, &planned);
            debug!(changes = changes.len(), "planned create");
            return Ok(PlanResult::with_changes(planned, changes, false));
        };

        schema.apply_defaults(&mut prior);
        let (changes, requires_replace) = diff(&schema, &prior, &planned);
        if let Value::Object(obj) = &mut planned {
            for name in computed_fields(&schema) {
                let carried = if requires_replace {
                    Value::Null
                } else {
                    prior.get(name).cloned().unwrap_or(Value::Null)
                };
                obj.insert(name.to_string(), carried);
            }
        }

        debug!(changes = changes.len(), requires_replace, "planned update");
        if changes.is_empty() {
            Ok(PlanResult::no_change(planned))
        } else {
            Ok(PlanResult::with_changes(planned, changes, requires_replace))
        }
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        ensure_resource_type(resource_type)?;
        let context = format!("Error creating {}", DISPLAY_NAME);
        let planned = prepare(&alarm_rule::schema(), planned_state)
            .and_then(AlarmRuleState::from_value)
            .map_err(|e| e.with_context(context))?;

        let ctx = self.context().await?;
        let created = lifecycle::create(&ctx, &planned).await?;
        created.to_value()
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        ensure_resource_type(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }
        let state = AlarmRuleState::from_value(current_state)
            .map_err(|e| e.with_context(format!("Error reading {}", DISPLAY_NAME)))?;

        let ctx = self.context().await?;
        match lifecycle::read(&ctx, &state).await? {
            ReadOutcome::Present(state) => state.to_value(),
            ReadOutcome::Gone => Ok(Value::Null),
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        ensure_resource_type(resource_type)?;
        let context = format!("Error updating {}", DISPLAY_NAME);
        let mut planned = prepare(&alarm_rule::schema(), planned_state)
            .and_then(AlarmRuleState::from_value)
            .map_err(|e| e.with_context(context))?;
        if planned.id().is_none() {
            planned.alarm_id = prior_state
                .get("alarm_id")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        let ctx = self.context().await?;
        let updated = lifecycle::update(&ctx, &planned).await?;
        updated.to_value()
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        ensure_resource_type(resource_type)?;
        if current_state.is_null() {
            return Ok(());
        }
        let state = AlarmRuleState::from_value(current_state)
            .map_err(|e| e.with_context(format!("Error deleting {}", DISPLAY_NAME)))?;

        let ctx = self.context().await?;
        lifecycle::delete(&ctx, &state).await
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        ensure_resource_type(resource_type)?;
        let context = format!("Error reading {} {}", DISPLAY_NAME, id);

        let ctx = self.context().await?;
        let remote = ctx
            .api
            .get(id)
            .await
            .map_err(|e| e.with_context(context.clone()))?;
        let state = state_from_remote(&remote).map_err(|e| e.with_context(context))?;
        info!(alarm_id = id, "imported {}", DISPLAY_NAME);

        Ok(vec![ImportedResource::new(RESOURCE_TYPE, state.to_value()?)])
    }
}
