use chrono::{DateTime, Utc};

use crate::domain::{
    entities::{
        plan_features::PlanFeatureEntity, plan_subscription_usages::PlanSubscriptionUsageEntity,
    },
    value_objects::plans::PositiveWords,
};

/// Read-only answers about what a subscription may use, computed from its plan's
/// features and its usage rows at a fixed instant.
#[derive(Debug, Clone)]
pub struct SubscriptionAbility {
    features: Vec<PlanFeatureEntity>,
    usages: Vec<PlanSubscriptionUsageEntity>,
    positive_words: PositiveWords,
    now: DateTime<Utc>,
}

impl SubscriptionAbility {
    pub fn new(
        features: Vec<PlanFeatureEntity>,
        usages: Vec<PlanSubscriptionUsageEntity>,
        positive_words: PositiveWords,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            features,
            usages,
            positive_words,
            now,
        }
    }

    /// The plan's configured value for `code`.
    pub fn value(&self, code: &str) -> Option<&str> {
        self.features
            .iter()
            .find(|feature| feature.code == code)
            .map(|feature| feature.value.as_str())
    }

    pub fn value_or<'a>(&'a self, code: &str, default: &'a str) -> &'a str {
        self.value(code).unwrap_or(default)
    }

    pub fn enabled(&self, code: &str) -> bool {
        self.value(code)
            .is_some_and(|value| self.positive_words.contains(value))
    }

    /// Uses recorded in the current window; expired rows count as zero.
    pub fn consumed(&self, code: &str) -> i32 {
        self.usages
            .iter()
            .find(|usage| usage.code == code)
            .filter(|usage| !usage.is_expired(self.now))
            .map_or(0, |usage| usage.used)
    }

    /// Configured value minus consumption. The value's leading integer is used, so
    /// `"5.5"` counts as 5 and non-numeric values count as zero.
    pub fn remainings(&self, code: &str) -> i64 {
        let limit = self.value(code).map_or(0, leading_integer);

        limit.saturating_sub(i64::from(self.consumed(code)))
    }

    pub fn can_use(&self, code: &str) -> bool {
        let Some(value) = self.value(code) else {
            return false;
        };

        if self.enabled(code) {
            return true;
        }

        // an explicit zero disables a countable feature
        if value == "0" {
            return false;
        }

        self.remainings(code) > 0
    }
}

fn leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit))
        });

    if negative { -magnitude } else { magnitude }
}
