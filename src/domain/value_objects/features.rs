use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::domain::{
    errors::SubscriptionError,
    value_objects::{enums::intervals::Interval, period::Period},
};

/// Reset policy attached to a configured feature code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureDefinition {
    #[serde(default, alias = "reseteable_interval")]
    pub resettable_interval: Option<String>,

    #[serde(default, alias = "reseteable_count")]
    pub resettable_count: Option<i32>,
}

/// One entry of the feature catalog: either a bare code or `{ "CODE": { ...definition } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FeatureCatalogEntry {
    Code(String),
    #[serde(deserialize_with = "single_definition")]
    Defined(BTreeMap<String, FeatureDefinition>),
}

/// A defined entry names exactly one code, so catalog order stays the configured order.
fn single_definition<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, FeatureDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    let definitions = BTreeMap::<String, FeatureDefinition>::deserialize(deserializer)?;
    if definitions.len() != 1 {
        return Err(D::Error::custom(format!(
            "feature entry must define exactly one code, found {}",
            definitions.len()
        )));
    }
    Ok(definitions)
}

/// The set of feature codes plans may reference, in configured order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeatureCatalog {
    entries: Vec<FeatureCatalogEntry>,
}

impl FeatureCatalog {
    pub fn new(entries: Vec<FeatureCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.entries.push(FeatureCatalogEntry::Code(code.into()));
        self
    }

    pub fn with_resettable(
        mut self,
        code: impl Into<String>,
        interval: Interval,
        count: i32,
    ) -> Self {
        let definition = FeatureDefinition {
            resettable_interval: Some(interval.as_str().to_string()),
            resettable_count: Some(count),
        };
        self.entries.push(FeatureCatalogEntry::Defined(BTreeMap::from([(
            code.into(),
            definition,
        )])));
        self
    }

    pub fn all_features(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|entry| -> Vec<&str> {
                match entry {
                    FeatureCatalogEntry::Code(code) => vec![code.as_str()],
                    FeatureCatalogEntry::Defined(map) => map.keys().map(String::as_str).collect(),
                }
            })
            .collect()
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| match entry {
            FeatureCatalogEntry::Code(value) => value == code,
            FeatureCatalogEntry::Defined(map) => map.contains_key(code),
        })
    }

    pub fn definition(&self, code: &str) -> Option<&FeatureDefinition> {
        self.entries.iter().find_map(|entry| match entry {
            FeatureCatalogEntry::Defined(map) => map.get(code),
            FeatureCatalogEntry::Code(_) => None,
        })
    }

    pub fn feature(&self, code: &str) -> Result<Feature, SubscriptionError> {
        Feature::new(self, code)
    }

    /// Checks every configured reset interval.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        for entry in &self.entries {
            if let FeatureCatalogEntry::Defined(map) = entry {
                for definition in map.values() {
                    if let Some(interval) = definition.resettable_interval.as_deref() {
                        Interval::from_str(interval)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A catalog-backed plan capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    code: String,
    resettable_interval: Option<String>,
    resettable_count: Option<i32>,
}

impl Feature {
    pub fn new(catalog: &FeatureCatalog, code: &str) -> Result<Self, SubscriptionError> {
        if !catalog.is_valid(code) {
            return Err(SubscriptionError::InvalidPlanFeature(code.to_string()));
        }

        let definition = catalog.definition(code).cloned().unwrap_or_default();

        Ok(Self {
            code: code.to_string(),
            resettable_interval: definition.resettable_interval,
            resettable_count: definition.resettable_count,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn resettable_interval(&self) -> Option<&str> {
        self.resettable_interval.as_deref()
    }

    pub fn resettable_count(&self) -> Option<i32> {
        self.resettable_count
    }

    pub fn is_resettable(&self) -> bool {
        self.resettable_interval.is_some()
    }

    /// End of the reset window that starts at `from`, or `None` for features that never reset.
    pub fn reset_date(
        &self,
        from: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, SubscriptionError> {
        let Some(interval) = self.resettable_interval.as_deref() else {
            return Ok(None);
        };

        let period = Period::new(interval, self.resettable_count.unwrap_or(1), from)?;
        Ok(Some(period.end_date()))
    }
}
