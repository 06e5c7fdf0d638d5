use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Owner of a subscription: a (type tag, id) pair such as `("user", 42)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SubscribableRef {
    pub subscribable_type: String,
    pub subscribable_id: i64,
}

impl SubscribableRef {
    pub fn new(subscribable_type: impl Into<String>, subscribable_id: i64) -> Self {
        Self {
            subscribable_type: subscribable_type.into(),
            subscribable_id,
        }
    }
}

impl Display for SubscribableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.subscribable_type, self.subscribable_id)
    }
}
