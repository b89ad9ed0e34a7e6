use std::path::PathBuf;

use dotenvy::dotenv;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{DashboardError, Result};

/// Configuration for the dashboard
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: Option<String>,
    /// Owner whose rows the dashboard shows
    pub owner_id: Option<Uuid>,
    /// Currency used for the statistics bar
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Where tracing output is written while the terminal is in use
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_currency() -> String {
    "BYN".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("project-dashboard.log")
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Build a config from explicit key/value pairs instead of the process environment
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(pairs)?)
    }

    /// Get the database URL, failing if it was never configured
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| DashboardError::Config("DATABASE_URL is not set".to_string()))
    }

    /// Get the owner id, failing if it was never configured
    pub fn owner_id(&self) -> Result<Uuid> {
        self.owner_id
            .ok_or_else(|| DashboardError::Config("OWNER_ID is not set".to_string()))
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = Config::from_pairs(pairs(&[])).unwrap();
        assert_eq!(config.currency, "BYN");
        assert_eq!(config.log_file, PathBuf::from("project-dashboard.log"));
        assert!(config.database_url().is_err());
        assert!(config.owner_id().is_err());
    }

    #[test]
    fn test_reads_database_and_owner() {
        let config = Config::from_pairs(pairs(&[
            ("DATABASE_URL", "postgres://localhost/dashboard"),
            ("OWNER_ID", "6f1c2a4e-8a57-4a4c-9e43-2f6f0c1d9b10"),
            ("CURRENCY", "EUR"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url().unwrap(),
            "postgres://localhost/dashboard"
        );
        assert_eq!(
            config.owner_id().unwrap().to_string(),
            "6f1c2a4e-8a57-4a4c-9e43-2f6f0c1d9b10"
        );
        assert_eq!(config.currency, "EUR");
    }

    #[test]
    fn test_rejects_malformed_owner() {
        let result = Config::from_pairs(pairs(&[("OWNER_ID", "not-a-uuid")]));
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }
}
