use crate::domain::value_objects::subscription_events::SubscriptionEvent;

#[cfg_attr(test, mockall::automock)]
pub trait SubscriptionEventSink: Send + Sync {
    fn publish(&self, event: SubscriptionEvent);
}
