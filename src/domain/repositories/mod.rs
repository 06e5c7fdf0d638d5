pub mod plan_subscription_usages;
pub mod plan_subscriptions;
pub mod plans;
pub mod subscription_events;
