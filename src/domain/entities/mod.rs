pub mod plan_features;
pub mod plan_subscription_usages;
pub mod plan_subscriptions;
pub mod plans;
