//! Attribute schema of the alarm-rule resource.

use serde_json::json;

use crate::client::alarmrule::{ActionType, ComparisonOperator, Filter};
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validators::Rule;

/// Aggregation periods accepted by Cloud Eye, in seconds.
pub const PERIODS: [i64; 6] = [1, 300, 1200, 3600, 14400, 86400];

/// Upper bound of `metric.dimensions`.
pub const MAX_DIMENSIONS: u32 = 3;

/// Upper bound of each action's `notification_list`.
pub const MAX_NOTIFICATIONS: usize = 5;

/// Upper bound of `alarm_description`, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 256;

/// `alarm_name`: 1 to 128 letters, digits and underscores.
pub fn alarm_name_rule() -> Rule {
    Rule::pattern(
        "^[a-zA-Z0-9_]{1,128}$",
        "must be string of 1 to 128 characters that consists of uppercase/lowercase letters, digits and underscores(_)",
    )
}

/// `alarm_description`: at most 256 characters.
pub fn alarm_description_rule() -> Rule {
    Rule::max_length(MAX_DESCRIPTION_LENGTH)
}

/// `metric.namespace`: `service.item`.
pub fn namespace_rule() -> Rule {
    Rule::pattern(
        r"^[a-zA-Z][a-zA-Z0-9_]{2,31}\.[a-zA-Z][a-zA-Z0-9_]{2,31}$",
        "is in service.item format. service and item must be a string of 3 to 32 characters that starts with a letter and consists of uppercase/lowercase letters, digits and underscores(_)",
    )
}

/// `metric.metric_name`.
pub fn metric_name_rule() -> Rule {
    Rule::pattern(
        "^[a-zA-Z][a-zA-Z0-9_]{0,63}$",
        "must be a string of 1 to 64 characters that starts with a letter and consists of uppercase/lowercase letters, digits and underscores(_)",
    )
}

/// `metric.dimensions.name`.
pub fn dimension_name_rule() -> Rule {
    Rule::pattern(
        "^[a-zA-Z][a-zA-Z0-9_]{0,31}$",
        "must be a string of 1 to 32 characters that starts with a letter and consists of uppercase/lowercase letters, digits and underscores(_)",
    )
}

/// `metric.dimensions.value`.
pub fn dimension_value_rule() -> Rule {
    Rule::pattern(
        "^[a-zA-Z0-9][a-zA-Z0-9-]{0,63}$",
        "must be a string of 1 to 64 characters that starts with a letter or digit and consists of uppercase/lowercase letters, digits and hyphens(-)",
    )
}

/// `condition.period`.
pub fn period_rule() -> Rule {
    Rule::one_of_int(PERIODS)
}

/// `condition.filter`.
pub fn filter_rule() -> Rule {
    Rule::one_of(Filter::ALL)
}

/// `condition.comparison_operator`.
pub fn comparison_operator_rule() -> Rule {
    Rule::one_of(ComparisonOperator::ALL)
}

/// `condition.value`. Not cross-checked with the operator.
pub fn threshold_rule() -> Rule {
    Rule::int_at_least(0)
}

/// `condition.count`.
pub fn count_rule() -> Rule {
    Rule::int_range(1, 5)
}

/// `*_actions.type`.
pub fn action_type_rule() -> Rule {
    Rule::one_of(ActionType::ALL)
}

/// `*_actions.notification_list`.
pub fn notification_list_rule() -> Rule {
    Rule::max_items(MAX_NOTIFICATIONS)
}

fn action_block(description: &str) -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_rule(action_type_rule())
                    .with_description("notification or autoscaling"),
            )
            .with_attribute(
                "notification_list",
                Attribute::required_string_list()
                    .with_rule(notification_list_rule())
                    .with_description("Topic URNs or policy ids"),
            )
            .with_description(description),
    )
}

/// The complete resource schema.
pub fn schema() -> Schema {
    let dimensions = NestedBlock::list(
        Block::new()
            .with_attribute(
                "name",
                Attribute::required_string().with_rule(dimension_name_rule()),
            )
            .with_attribute(
                "value",
                Attribute::required_string().with_rule(dimension_value_rule()),
            ),
    )
    .with_min_items(1)
    .with_max_items(MAX_DIMENSIONS);

    let metric = NestedBlock::list(
        Block::new()
            .with_attribute(
                "namespace",
                Attribute::required_string().with_rule(namespace_rule()),
            )
            .with_attribute(
                "metric_name",
                Attribute::required_string().with_rule(metric_name_rule()),
            )
            .with_block("dimensions", dimensions)
            .with_description("The metric the rule watches"),
    )
    .with_min_items(1)
    .with_max_items(1)
    .with_force_new();

    let condition = NestedBlock::list(
        Block::new()
            .with_attribute(
                "period",
                Attribute::required_int64()
                    .with_rule(period_rule())
                    .with_description("Aggregation period in seconds"),
            )
            .with_attribute(
                "filter",
                Attribute::required_string().with_rule(filter_rule()),
            )
            .with_attribute(
                "comparison_operator",
                Attribute::required_string().with_rule(comparison_operator_rule()),
            )
            .with_attribute(
                "value",
                Attribute::required_int64()
                    .with_rule(threshold_rule())
                    .with_description("Alarm threshold"),
            )
            .with_attribute("unit", Attribute::optional_string())
            .with_attribute(
                "count",
                Attribute::required_int64()
                    .with_rule(count_rule())
                    .with_description("Consecutive periods before the alarm fires"),
            )
            .with_description("When the alarm fires"),
    )
    .with_min_items(1)
    .with_max_items(1);

    Schema::v0()
        .with_attribute(
            "alarm_id",
            Attribute::computed_string().with_description("Id assigned by Cloud Eye"),
        )
        .with_attribute(
            "alarm_name",
            Attribute::required_string().with_rule(alarm_name_rule()),
        )
        .with_attribute(
            "alarm_description",
            Attribute::optional_string().with_rule(alarm_description_rule()),
        )
        .with_block("metric", metric)
        .with_block("condition", condition)
        .with_block(
            "alarm_actions",
            action_block("Actions fired on transition to alarm"),
        )
        .with_block(
            "insufficientdata_actions",
            action_block("Actions fired on transition to insufficient data"),
        )
        .with_block(
            "ok_actions",
            action_block("Actions fired on transition to ok"),
        )
        .with_attribute(
            "alarm_enabled",
            Attribute::optional_bool().with_default(json!(true)),
        )
        .with_attribute(
            "alarm_action_enabled",
            Attribute::optional_bool().with_default(json!(true)),
        )
        .with_attribute(
            "update_time",
            Attribute::computed_int64().with_description("Last modification, epoch milliseconds"),
        )
        .with_attribute(
            "alarm_state",
            Attribute::computed_string().with_description("Current evaluation state"),
        )
}
