use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{features::FeatureCatalog, plans::PositiveWords};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub plans: PlansConfig,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

/// Plan-level settings, usually read from the JSON file named by `PLANS_CONFIG_PATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlansConfig {
    #[serde(default = "default_subscription_name")]
    pub default_subscription_name: String,

    #[serde(default)]
    pub positive_words: PositiveWords,

    #[serde(default)]
    pub features: FeatureCatalog,
}

fn default_subscription_name() -> String {
    "default".to_string()
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            default_subscription_name: default_subscription_name(),
            positive_words: PositiveWords::default(),
            features: FeatureCatalog::default(),
        }
    }
}
