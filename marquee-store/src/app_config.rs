use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_ttl_seconds")]
    pub hold_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_booking_number_prefix")]
    pub booking_number_prefix: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_hold_ttl_seconds() -> u64 {
    300
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_booking_number_prefix() -> String {
    "MRQ".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_ttl_seconds: default_hold_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            booking_number_prefix: default_booking_number_prefix(),
            currency: default_currency(),
        }
    }
}

impl BusinessRules {
    pub fn hold_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.hold_ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default").required(false))
            // Add in the current environment file, defaulting to 'development'
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file that shouldn't be checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of MARQUEE)
            // Eg. `MARQUEE__BUSINESS_RULES__HOLD_TTL_SECONDS=600`
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_config_files() {
        let config = Config::load().unwrap();

        assert!(config.database.is_none());
        assert_eq!(config.business_rules.hold_ttl_seconds, 300);
        assert_eq!(config.business_rules.sweep_interval_seconds, 60);
        assert_eq!(config.business_rules.booking_number_prefix, "MRQ");
        assert_eq!(
            config.business_rules.hold_ttl(),
            chrono::Duration::minutes(5)
        );
    }
}
