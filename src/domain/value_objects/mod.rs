pub mod clock;
pub mod enums;
pub mod features;
pub mod period;
pub mod plans;
pub mod subscribables;
pub mod subscription_events;
pub mod subscription_queries;
