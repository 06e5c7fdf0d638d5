use std::path::Path;

use anyhow::{Context, Result};

use super::config_model::{Database, DotEnvyConfig, PlansConfig};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
    };

    let plans = match std::env::var("PLANS_CONFIG_PATH") {
        Ok(path) if !path.trim().is_empty() => load_plans_config(path.trim())?,
        _ => PlansConfig::default(),
    };

    Ok(DotEnvyConfig { database, plans })
}

pub fn load_plans_config(path: impl AsRef<Path>) -> Result<PlansConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plans config {}", path.display()))?;

    parse_plans_config(&raw).with_context(|| format!("invalid plans config {}", path.display()))
}

pub fn parse_plans_config(raw: &str) -> Result<PlansConfig> {
    let config: PlansConfig = serde_json::from_str(raw)?;
    config.features.validate()?;
    Ok(config)
}
