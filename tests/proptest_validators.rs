//! Property-based tests using proptest
//!
//! These tests check the alarm-rule field rules and the schema walker
//! against randomized inputs.

use ces_provider::resources::alarm_rule::schema::{
    alarm_description_rule, alarm_name_rule, count_rule, namespace_rule, period_rule, PERIODS,
};
use ces_provider::resources::alarm_rule::{schema, RESOURCE_TYPE};
use ces_provider::{is_valid, CesProvider, ProviderService};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate a rule configuration with the given name, period and count
fn rule_config(name: &str, period: i64, count: i64) -> Value {
    json!({
        "alarm_name": name,
        "metric": [{
            "namespace": "SYS.ECS",
            "metric_name": "cpu_util",
            "dimensions": [{"name": "instance_id", "value": "i-1"}]
        }],
        "condition": [{
            "period": period,
            "filter": "average",
            "comparison_operator": ">",
            "value": 80,
            "count": count
        }]
    })
}

fn arb_valid_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,128}"
}

fn arb_period() -> impl Strategy<Value = i64> {
    prop::sample::select(PERIODS.to_vec())
}

proptest! {
    /// Names built from the allowed alphabet are accepted
    #[test]
    fn test_valid_alarm_names_accepted(name in arb_valid_name()) {
        prop_assert!(alarm_name_rule().is_satisfied_by(&json!(name)));
    }

    /// Names containing any other character are rejected
    #[test]
    fn test_alarm_names_with_foreign_characters_rejected(
        prefix in "[a-z]{0,10}",
        bad in "[-. !@#$%/]",
        suffix in "[a-z]{0,10}",
    ) {
        let name = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(!alarm_name_rule().is_satisfied_by(&json!(name)));
    }

    /// Names longer than 128 characters are rejected
    #[test]
    fn test_long_alarm_names_rejected(len in 129usize..300) {
        let name = "a".repeat(len);
        prop_assert!(!alarm_name_rule().is_satisfied_by(&json!(name)));
    }

    /// Descriptions are bounded by characters, not bytes
    #[test]
    fn test_description_length_counts_characters(len in 0usize..400) {
        let description = "é".repeat(len);
        prop_assert_eq!(
            alarm_description_rule().is_satisfied_by(&json!(description)),
            len <= 256
        );
    }

    /// Only the listed periods are accepted
    #[test]
    fn test_period_membership(period in -10i64..100_000) {
        prop_assert_eq!(
            period_rule().is_satisfied_by(&json!(period)),
            PERIODS.contains(&period)
        );
    }

    /// Count is accepted exactly in [1, 5]
    #[test]
    fn test_count_range(count in -100i64..100) {
        prop_assert_eq!(
            count_rule().is_satisfied_by(&json!(count)),
            (1..=5).contains(&count)
        );
    }

    /// Integers encoded as floats never pass the schema, in or out of range
    #[test]
    fn test_float_encoded_count_rejected(count in -10i64..10) {
        let mut config = rule_config("cpu_high", 300, 3);
        config["condition"][0]["count"] = json!(count as f64);
        schema().apply_defaults(&mut config);
        prop_assert!(!is_valid(&schema(), &config));
    }

    /// Out-of-range counts fail the rule whether encoded as integer or float
    #[test]
    fn test_count_rule_reads_whole_floats(count in -100i64..100) {
        prop_assert_eq!(
            count_rule().is_satisfied_by(&json!(count as f64)),
            (1..=5).contains(&count)
        );
    }

    /// Namespaces are two dot-separated identifiers
    #[test]
    fn test_namespace_shape(service in "[A-Z][A-Z0-9_]{2,31}", item in "[a-z][a-z0-9_]{2,31}") {
        let namespace = format!("{}.{}", service, item);
        prop_assert!(namespace_rule().is_satisfied_by(&json!(namespace)));
        prop_assert!(!namespace_rule().is_satisfied_by(&json!(service)));
    }

    /// The schema walker agrees with the individual rules
    #[test]
    fn test_schema_agrees_with_rules(
        name in arb_valid_name(),
        period in arb_period(),
        count in -3i64..10,
    ) {
        let mut config = rule_config(&name, period, count);
        schema().apply_defaults(&mut config);
        prop_assert_eq!(is_valid(&schema(), &config), (1..=5).contains(&count));
    }

    /// Planning a valid configuration never touches the remote and always creates
    #[test]
    fn test_plan_accepts_every_valid_config(
        name in arb_valid_name(),
        period in arb_period(),
        count in 1i64..=5,
    ) {
        let provider = CesProvider::new();
        let config = rule_config(&name, period, count);
        let plan = tokio_test::block_on(provider.plan(RESOURCE_TYPE, None, config.clone(), config));
        let plan = plan.expect("valid config should plan");
        prop_assert!(!plan.requires_replace);
        prop_assert_eq!(&plan.planned_state["alarm_name"], &json!(name));
        prop_assert_eq!(&plan.planned_state["alarm_enabled"], &json!(true));
    }
}
