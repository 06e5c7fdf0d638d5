use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::errors::SubscriptionError;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Interval {
    pub fn all() -> [Interval; 4] {
        [Interval::Day, Interval::Week, Interval::Month, Interval::Year]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, SubscriptionError> {
        match value {
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            "month" => Ok(Interval::Month),
            "year" => Ok(Interval::Year),
            other => Err(SubscriptionError::InvalidInterval(other.to_string())),
        }
    }

    pub fn is_valid(value: &str) -> bool {
        Self::from_str(value).is_ok()
    }

    /// Human readable form such as "1 month" or "3 weeks".
    pub fn description(&self, count: i32) -> String {
        let count = count.max(1);
        if count == 1 {
            format!("1 {}", self.as_str())
        } else {
            format!("{} {}s", count, self.as_str())
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
