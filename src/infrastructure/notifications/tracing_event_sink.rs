use tracing::info;

use crate::domain::{
    repositories::subscription_events::SubscriptionEventSink,
    value_objects::subscription_events::SubscriptionEvent,
};

/// Default sink: every lifecycle event becomes an `info!` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl SubscriptionEventSink for TracingEventSink {
    fn publish(&self, event: SubscriptionEvent) {
        match event {
            SubscriptionEvent::PlanChanged {
                subscription_id,
                from_plan_id,
                to_plan_id,
            } => info!(
                event = %event,
                subscription_id,
                from_plan_id,
                to_plan_id,
                "subscription_events: published"
            ),
            SubscriptionEvent::Canceled {
                subscription_id,
                immediately,
            } => info!(
                event = %event,
                subscription_id,
                immediately,
                "subscription_events: published"
            ),
            _ => info!(
                event = %event,
                subscription_id = event.subscription_id(),
                "subscription_events: published"
            ),
        }
    }
}
