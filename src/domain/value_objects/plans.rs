use serde::{Deserialize, Serialize};

use crate::domain::{errors::SubscriptionError, value_objects::enums::intervals::Interval};

/// Plan definition accepted by `PlanRepository::create_plan`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub interval: Interval,
    pub interval_count: i32,
    pub trial_period_days: Option<i32>,
    pub sort_order: i32,
}

impl NewPlan {
    pub fn new(name: impl Into<String>, price_minor: i32) -> Self {
        Self {
            name: name.into(),
            description: None,
            price_minor,
            interval: Interval::Month,
            interval_count: 1,
            trial_period_days: None,
            sort_order: 0,
        }
    }

    /// Sets the billing interval from its stored name, rejecting unknown units.
    pub fn with_interval(
        mut self,
        interval: &str,
        interval_count: i32,
    ) -> Result<Self, SubscriptionError> {
        self.interval = Interval::from_str(interval)?;
        self.interval_count = interval_count.max(1);
        Ok(self)
    }

    pub fn with_trial_days(mut self, days: i32) -> Self {
        self.trial_period_days = Some(days);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPlanFeature {
    pub code: String,
    pub value: String,
    pub sort_order: i32,
}

impl NewPlanFeature {
    pub fn new(code: impl Into<String>, value: impl Into<String>, sort_order: i32) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
            sort_order,
        }
    }
}

/// Feature values that mean "enabled", compared case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PositiveWords(Vec<String>);

impl PositiveWords {
    pub fn new(words: Vec<String>) -> Self {
        Self(words)
    }

    pub fn contains(&self, value: &str) -> bool {
        let value = value.to_uppercase();
        self.0.iter().any(|word| word.to_uppercase() == value)
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }
}

impl Default for PositiveWords {
    fn default() -> Self {
        Self(
            ["Y", "YES", "TRUE", "UNLIMITED"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_plan_defaults_to_monthly() {
        let plan = NewPlan::new("Pro", 999);

        assert_eq!(plan.interval, Interval::Month);
        assert_eq!(plan.interval_count, 1);
        assert_eq!(plan.trial_period_days, None);
    }

    #[test]
    fn new_plan_rejects_unknown_interval() {
        let err = NewPlan::new("Pro", 999).with_interval("decade", 1).unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidInterval(_)));
    }

    #[test]
    fn new_plan_clamps_interval_count() {
        let plan = NewPlan::new("Pro", 999).with_interval("week", 0).unwrap();

        assert_eq!(plan.interval, Interval::Week);
        assert_eq!(plan.interval_count, 1);
    }

    #[test]
    fn positive_words_ignore_case() {
        let words = PositiveWords::default();

        assert!(words.contains("yes"));
        assert!(words.contains("Unlimited"));
        assert!(!words.contains("10"));
        assert!(!words.contains("N"));
    }
}
