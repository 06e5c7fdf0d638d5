pub mod plan_subscriptions;
pub mod subscribers;
pub mod subscription_ability;
pub mod subscription_builder;
pub mod subscription_usage;
