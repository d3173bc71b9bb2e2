//! Cloud Eye alarm-rule API: wire types, request URLs and the REST client.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::http::HttpClient;
use super::ServiceClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;

const RESOURCE_PATH: &str = "alarms";

/// Statistic applied to the metric over one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Maximum.
    Max,
    /// Minimum.
    Min,
    /// Arithmetic mean.
    Average,
    /// Sum.
    Sum,
    /// Variance.
    Variance,
}

impl Filter {
    /// Every accepted value, in wire form.
    pub const ALL: [&'static str; 5] = ["max", "min", "average", "sum", "variance"];

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Variance => "variance",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the filtered metric is compared with the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    /// `>`
    #[serde(rename = ">")]
    Greater,
    /// `=`
    #[serde(rename = "=")]
    Equal,
    /// `<`
    #[serde(rename = "<")]
    Less,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// `<=`
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl ComparisonOperator {
    /// Every accepted value, in wire form.
    pub const ALL: [&'static str; 5] = [">", "=", "<", ">=", "<="];

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Equal => "=",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an alarm action triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Send to the listed notification topics.
    Notification,
    /// Trigger the listed autoscaling policies.
    Autoscaling,
}

impl ActionType {
    /// Every accepted value, in wire form.
    pub const ALL: [&'static str; 2] = ["notification", "autoscaling"];

    /// The wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Autoscaling => "autoscaling",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric dimension, e.g. `instance_id=...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionInfo {
    /// Dimension name.
    pub name: String,
    /// Dimension value.
    pub value: String,
}

/// The metric an alarm rule watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    /// `service.item` namespace, e.g. `SYS.ECS`.
    pub namespace: String,
    /// Metric name, e.g. `cpu_util`.
    pub metric_name: String,
    /// Between one and three dimensions.
    pub dimensions: Vec<DimensionInfo>,
}

/// When the alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    /// Aggregation period in seconds.
    pub period: i64,
    /// Statistic applied over the period.
    pub filter: Filter,
    /// Comparison against `value`.
    pub comparison_operator: ComparisonOperator,
    /// Threshold.
    pub value: i64,
    /// Unit of the threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Consecutive periods the comparison must hold.
    pub count: i64,
}

/// An action fired on a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Action kind.
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Topic URNs or policy ids, at most five.
    pub notification_list: Vec<String>,
}

/// Body of the create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOpts {
    /// Rule name.
    pub alarm_name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_description: Option<String>,
    /// Watched metric.
    pub metric: MetricInfo,
    /// Firing condition.
    pub condition: ConditionInfo,
    /// Actions on transition to alarm.
    pub alarm_actions: Vec<ActionInfo>,
    /// Actions on transition to insufficient data.
    pub insufficientdata_actions: Vec<ActionInfo>,
    /// Actions on transition to ok.
    pub ok_actions: Vec<ActionInfo>,
    /// Whether the rule is evaluated.
    pub alarm_enabled: bool,
    /// Whether actions fire.
    pub alarm_action_enabled: bool,
}

/// Body of the update request. The metric cannot be changed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOpts {
    /// Rule name.
    pub alarm_name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_description: Option<String>,
    /// Firing condition.
    pub condition: ConditionInfo,
    /// Actions on transition to alarm.
    pub alarm_actions: Vec<ActionInfo>,
    /// Actions on transition to insufficient data.
    pub insufficientdata_actions: Vec<ActionInfo>,
    /// Actions on transition to ok.
    pub ok_actions: Vec<ActionInfo>,
    /// Whether the rule is evaluated.
    pub alarm_enabled: bool,
    /// Whether actions fire.
    pub alarm_action_enabled: bool,
}

/// Response to a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    /// Id assigned by the remote.
    pub alarm_id: String,
}

/// An alarm rule as reported by the remote.
///
/// Every field is optional so that partial responses still decode; the
/// refresher decides what a missing field means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmRule {
    /// Rule id.
    pub alarm_id: Option<String>,
    /// Rule name.
    pub alarm_name: Option<String>,
    /// Free-form description.
    pub alarm_description: Option<String>,
    /// Watched metric.
    pub metric: Option<MetricInfo>,
    /// Firing condition.
    pub condition: Option<ConditionInfo>,
    /// Actions on transition to alarm.
    pub alarm_actions: Option<Vec<ActionInfo>>,
    /// Actions on transition to insufficient data.
    pub insufficientdata_actions: Option<Vec<ActionInfo>>,
    /// Actions on transition to ok.
    pub ok_actions: Option<Vec<ActionInfo>>,
    /// Whether the rule is evaluated.
    pub alarm_enabled: Option<bool>,
    /// Whether actions fire.
    pub alarm_action_enabled: Option<bool>,
    /// Last modification, epoch milliseconds.
    pub update_time: Option<i64>,
    /// Current evaluation state, e.g. `ok` or `alarm`.
    pub alarm_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    metric_alarms: Vec<AlarmRule>,
}

/// URL of the alarm collection.
pub fn create_url(client: &ServiceClient) -> String {
    client.service_url(&[client.project_id.as_str(), RESOURCE_PATH])
}

/// URL of a single alarm rule, used for get, update and delete.
pub fn resource_url(client: &ServiceClient, id: &str) -> String {
    client.service_url(&[client.project_id.as_str(), RESOURCE_PATH, id])
}

/// Remote operations on alarm rules.
#[async_trait]
pub trait AlarmRuleApi: Send + Sync {
    /// Create a rule and return its id.
    async fn create(&self, opts: &CreateOpts) -> Result<CreateResult, ProviderError>;

    /// Fetch a rule. A rule that does not exist is [`ProviderError::NotFound`].
    async fn get(&self, id: &str) -> Result<AlarmRule, ProviderError>;

    /// Update the mutable fields of a rule.
    async fn update(&self, id: &str, opts: &UpdateOpts) -> Result<(), ProviderError>;

    /// Delete a rule.
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;
}

/// [`AlarmRuleApi`] over the Cloud Eye REST endpoint.
#[derive(Debug, Clone)]
pub struct CesClient {
    service: ServiceClient,
    http: HttpClient,
}

impl CesClient {
    /// Create a client for an already resolved endpoint.
    pub fn new(service: ServiceClient, http: HttpClient) -> Self {
        Self { service, http }
    }

    /// Create a client scoped by the provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let endpoint = config.ces_endpoint()?;
        let project_id = config.require_project_id()?;
        let token = config.require_auth_token()?;
        let http = HttpClient::new(token, config.request_timeout)?;
        Ok(Self::new(ServiceClient::new(endpoint, project_id), http))
    }

    /// The endpoint this client talks to.
    pub fn service(&self) -> &ServiceClient {
        &self.service
    }
}

#[async_trait]
impl AlarmRuleApi for CesClient {
    async fn create(&self, opts: &CreateOpts) -> Result<CreateResult, ProviderError> {
        let body = serde_json::to_value(opts)?;
        let response = self.http.post(&create_url(&self.service), &body).await?;
        let result: CreateResult = serde_json::from_value(response)?;
        debug!(alarm_id = %result.alarm_id, "alarm rule created");
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<AlarmRule, ProviderError> {
        let response = self.http.get(&resource_url(&self.service, id)).await?;
        let GetResponse { metric_alarms } = serde_json::from_value(response)?;
        metric_alarms
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("alarm rule {} does not exist", id)))
    }

    async fn update(&self, id: &str, opts: &UpdateOpts) -> Result<(), ProviderError> {
        let body = serde_json::to_value(opts)?;
        self.http.put(&resource_url(&self.service, id), &body).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let _: Value = self.http.delete(&resource_url(&self.service, id)).await?;
        Ok(())
    }
}
