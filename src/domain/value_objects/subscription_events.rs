use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle notifications fired by the subscription use cases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    Created { subscription_id: i64 },
    Saved { subscription_id: i64 },
    PlanChanged { subscription_id: i64, from_plan_id: i64, to_plan_id: i64 },
    Canceled { subscription_id: i64, immediately: bool },
    Renewed { subscription_id: i64 },
}

impl SubscriptionEvent {
    pub fn subscription_id(&self) -> i64 {
        match self {
            SubscriptionEvent::Created { subscription_id }
            | SubscriptionEvent::Saved { subscription_id }
            | SubscriptionEvent::PlanChanged { subscription_id, .. }
            | SubscriptionEvent::Canceled { subscription_id, .. }
            | SubscriptionEvent::Renewed { subscription_id } => *subscription_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionEvent::Created { .. } => "subscription_created",
            SubscriptionEvent::Saved { .. } => "subscription_saved",
            SubscriptionEvent::PlanChanged { .. } => "subscription_plan_changed",
            SubscriptionEvent::Canceled { .. } => "subscription_canceled",
            SubscriptionEvent::Renewed { .. } => "subscription_renewed",
        }
    }
}

impl Display for SubscriptionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
