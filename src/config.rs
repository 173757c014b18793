use crate::core::exchange::ExchangeRules;
use crate::core::filters::MatchingWindow;
use crate::models::ScoringWeights;
use crate::services::pool::PoolSettings;
use chrono::{Duration, Weekday};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub collaborators: CollaboratorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Without a URL the service runs on the in-memory store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Appwrite document API serving profiles and artworks, plus the
/// notification webhook
#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorSettings {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_profiles_collection")]
    pub profiles_collection: String,
    #[serde(default = "default_artworks_collection")]
    pub artworks_collection: String,
    pub notify_url: Option<String>,
}

impl Default for CollaboratorSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            project_id: String::new(),
            database_id: String::new(),
            profiles_collection: default_profiles_collection(),
            artworks_collection: default_artworks_collection(),
            notify_url: None,
        }
    }
}

fn default_profiles_collection() -> String { "user_profiles".to_string() }
fn default_artworks_collection() -> String { "artworks".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub compatibility_capacity: Option<u64>,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSettings {
    /// Weekday the matching window opens on; absent means always open
    pub weekday: Option<String>,
    #[serde(default = "default_window_hours")]
    pub duration_hours: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            weekday: None,
            duration_hours: default_window_hours(),
        }
    }
}

fn default_window_hours() -> u32 { 24 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_request_lifetime_hours")]
    pub request_lifetime_hours: i64,
    #[serde(default)]
    pub window: WindowSettings,
    /// Allowed visit days; empty allows any day
    #[serde(default)]
    pub preferred_days: Vec<String>,
    #[serde(default = "default_min_floor")]
    pub min_compatibility_floor: u8,
    #[serde(default = "default_min_ceiling")]
    pub min_compatibility_ceiling: u8,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            request_lifetime_hours: default_request_lifetime_hours(),
            window: WindowSettings::default(),
            preferred_days: Vec::new(),
            min_compatibility_floor: default_min_floor(),
            min_compatibility_ceiling: default_min_ceiling(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

fn default_request_lifetime_hours() -> i64 { 24 }
fn default_min_floor() -> u8 { 40 }
fn default_min_ceiling() -> u8 { 80 }
fn default_candidate_limit() -> usize { 20 }

fn parse_weekday(value: &str) -> Result<Weekday, ConfigError> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| ConfigError::Message(format!("invalid weekday: {}", value)))
}

impl MatchingSettings {
    pub fn to_pool_settings(&self) -> Result<PoolSettings, ConfigError> {
        if self.min_compatibility_floor > self.min_compatibility_ceiling {
            return Err(ConfigError::Message(format!(
                "min_compatibility_floor {} exceeds ceiling {}",
                self.min_compatibility_floor, self.min_compatibility_ceiling
            )));
        }

        let window = MatchingWindow {
            weekday: self.window.weekday.as_deref().map(parse_weekday).transpose()?,
            duration_hours: self.window.duration_hours,
        };
        let preferred_days = self
            .preferred_days
            .iter()
            .map(|day| parse_weekday(day))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PoolSettings {
            request_lifetime: Duration::hours(self.request_lifetime_hours),
            window,
            preferred_days,
            min_compatibility_floor: self.min_compatibility_floor,
            min_compatibility_ceiling: self.min_compatibility_ceiling,
            candidate_limit: self.candidate_limit,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default = "default_idle_timeout_hours")]
    pub idle_timeout_hours: i64,
    #[serde(default = "default_min_message_chars")]
    pub min_message_chars: usize,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Background sweep period; absent disables the sweep
    pub sweep_interval_secs: Option<u64>,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            idle_timeout_hours: default_idle_timeout_hours(),
            min_message_chars: default_min_message_chars(),
            max_message_chars: default_max_message_chars(),
            sweep_interval_secs: None,
        }
    }
}

fn default_idle_timeout_hours() -> i64 { 24 }
fn default_min_message_chars() -> usize { 50 }
fn default_max_message_chars() -> usize { 2000 }

impl ExchangeSettings {
    pub fn to_rules(&self) -> ExchangeRules {
        ExchangeRules {
            min_message_chars: self.min_message_chars,
            max_message_chars: self.max_message_chars,
            idle_timeout: Duration::hours(self.idle_timeout_hours),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

impl ScoringSettings {
    pub fn to_weights(&self) -> ScoringWeights {
        ScoringWeights {
            social: self.weights.social,
            abstractness: self.weights.abstractness,
            emotional: self.weights.emotional,
            structural: self.weights.structural,
            social_complement_threshold: self.thresholds.social,
            abstractness_complement_threshold: self.thresholds.abstractness,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_social_weight")]
    pub social: f64,
    #[serde(default = "default_abstractness_weight")]
    pub abstractness: f64,
    #[serde(default = "default_emotional_weight")]
    pub emotional: f64,
    #[serde(default = "default_structural_weight")]
    pub structural: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            social: default_social_weight(),
            abstractness: default_abstractness_weight(),
            emotional: default_emotional_weight(),
            structural: default_structural_weight(),
        }
    }
}

fn default_social_weight() -> f64 { 0.5 }
fn default_abstractness_weight() -> f64 { 0.5 }
fn default_emotional_weight() -> f64 { 1.0 }
fn default_structural_weight() -> f64 { 1.0 }

/// Trait gaps above which a pairing counts as complementary
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_social_threshold")]
    pub social: f64,
    #[serde(default = "default_abstractness_threshold")]
    pub abstractness: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            social: default_social_threshold(),
            abstractness: default_abstractness_threshold(),
        }
    }
}

fn default_social_threshold() -> f64 { 50.0 }
fn default_abstractness_threshold() -> f64 { 40.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with ARTMATE__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., ARTMATE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ARTMATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ARTMATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply well-known environment variables that do not follow the prefix scheme
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(format) = env::var("LOG_FORMAT") {
        builder = builder.set_override("logging.format", format)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = from_toml("");
        assert_eq!(settings.server.port, 8080);
        assert!(settings.database.url.is_none());
        assert_eq!(settings.exchange.min_message_chars, 50);
        assert_eq!(settings.matching.min_compatibility_floor, 40);
        assert_eq!(settings.matching.min_compatibility_ceiling, 80);
    }

    #[test]
    fn test_default_weights() {
        let weights = ScoringSettings::default().to_weights();
        assert_eq!(weights, ScoringWeights::default());
    }

    #[test]
    fn test_matching_window_from_config() {
        let settings = from_toml(
            r#"
            [matching]
            preferred_days = ["Sat", "sunday"]

            [matching.window]
            weekday = "thu"
            duration_hours = 24
            "#,
        );

        let pool = settings.matching.to_pool_settings().unwrap();
        assert_eq!(pool.window.weekday, Some(Weekday::Thu));
        assert_eq!(pool.preferred_days, vec![Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        let settings = from_toml(
            r#"
            [matching]
            preferred_days = ["someday"]
            "#,
        );
        assert!(settings.matching.to_pool_settings().is_err());
    }

    #[test]
    fn test_exchange_rules() {
        let rules = ExchangeSettings::default().to_rules();
        assert_eq!(rules, ExchangeRules::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
