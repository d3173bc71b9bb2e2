//! Typed state record of an alarm rule.
//!
//! The host hands attribute trees over as JSON. [`AlarmRuleState`] is the
//! same tree with the singleton `metric` and `condition` blocks unwrapped
//! from their one-element lists and the enumerations parsed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::client::alarmrule::{ActionInfo, ConditionInfo, MetricInfo};
use crate::error::ProviderError;

/// Serde adapter for blocks that the host stores as a one-element list.
mod single_block {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(std::iter::once(value))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let mut items = Vec::<T>::deserialize(deserializer)?;
        match items.len() {
            1 => Ok(items.remove(0)),
            n => Err(D::Error::custom(format!(
                "expected exactly one block, got {}",
                n
            ))),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// An alarm rule as tracked in host state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRuleState {
    /// Identity assigned on create. `None` until the rule exists remotely.
    #[serde(default)]
    pub alarm_id: Option<String>,
    /// Rule name.
    pub alarm_name: String,
    /// Free-form description.
    #[serde(default)]
    pub alarm_description: Option<String>,
    /// Watched metric.
    #[serde(with = "single_block")]
    pub metric: MetricInfo,
    /// Firing condition.
    #[serde(with = "single_block")]
    pub condition: ConditionInfo,
    /// Actions on transition to alarm.
    #[serde(default, deserialize_with = "null_as_default")]
    pub alarm_actions: Vec<ActionInfo>,
    /// Actions on transition to insufficient data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub insufficientdata_actions: Vec<ActionInfo>,
    /// Actions on transition to ok.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok_actions: Vec<ActionInfo>,
    /// Whether the rule is evaluated.
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub alarm_enabled: bool,
    /// Whether actions fire.
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub alarm_action_enabled: bool,
    /// Last modification reported by the remote, epoch milliseconds.
    #[serde(default)]
    pub update_time: Option<i64>,
    /// Evaluation state reported by the remote.
    #[serde(default)]
    pub alarm_state: Option<String>,
}

impl AlarmRuleState {
    /// Ingest a host attribute tree.
    ///
    /// Fails with [`ProviderError::Build`] when the tree does not have the
    /// resource's shape.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Build(format!("invalid alarm rule attributes: {}", e)))
    }

    /// Render the record as a host attribute tree.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The remote identity, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.alarm_id.as_deref().filter(|id| !id.is_empty())
    }
}
