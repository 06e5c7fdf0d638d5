use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Invalid interval \"{0}\".")]
    InvalidInterval(String),
    #[error("Invalid plan feature: {0}.")]
    InvalidPlanFeature(String),
    #[error("unable to renew canceled ended subscription")]
    CannotRenewCanceledEnded,
    #[error("plan {0} not found")]
    PlanNotFound(i64),
    #[error("subscription {0} not found")]
    SubscriptionNotFound(i64),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;
