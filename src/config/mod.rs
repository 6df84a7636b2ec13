//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::calculate::correlation::DEFAULT_CORRELATION_TOP_GAMES;
use crate::calculate::genre::{AggregateOptions, DEFAULT_TOP_GAMES, DEFAULT_TOP_TAGS};
use crate::calculate::scoring::{
    DEFAULT_COLD_THRESHOLD, DEFAULT_COMPETITION_WEIGHT, DEFAULT_DISCOVERABILITY_WEIGHT,
    DEFAULT_GROWTH_VELOCITY_WEIGHT, DEFAULT_HOTNESS_WEIGHT, DEFAULT_HOT_THRESHOLD,
    DEFAULT_REVENUE_POTENTIAL_WEIGHT, DEFAULT_RISING_HOT_THRESHOLD, DEFAULT_SATURATION_WEIGHT,
    DEFAULT_STABLE_BAND_PCT, DEFAULT_SUCCESS_RATE_WEIGHT, DEFAULT_SUCCESS_REVIEW_THRESHOLD,
    DEFAULT_TIMING_WEIGHT,
};

/// Tolerance when checking that score weights sum to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Weights of each sub-score in the overall score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_hotness_weight")]
    pub hotness: f64,

    #[serde(default = "default_saturation_weight")]
    pub saturation: f64,

    #[serde(default = "default_success_rate_weight")]
    pub success_rate: f64,

    #[serde(default = "default_timing_weight")]
    pub timing: f64,

    #[serde(default = "default_growth_velocity_weight")]
    pub growth_velocity: f64,

    #[serde(default = "default_competition_weight")]
    pub competition: f64,

    #[serde(default = "default_revenue_potential_weight")]
    pub revenue_potential: f64,

    #[serde(default = "default_discoverability_weight")]
    pub discoverability: f64,
}

fn default_hotness_weight() -> f64 {
    DEFAULT_HOTNESS_WEIGHT
}

fn default_saturation_weight() -> f64 {
    DEFAULT_SATURATION_WEIGHT
}

fn default_success_rate_weight() -> f64 {
    DEFAULT_SUCCESS_RATE_WEIGHT
}

fn default_timing_weight() -> f64 {
    DEFAULT_TIMING_WEIGHT
}

fn default_growth_velocity_weight() -> f64 {
    DEFAULT_GROWTH_VELOCITY_WEIGHT
}

fn default_competition_weight() -> f64 {
    DEFAULT_COMPETITION_WEIGHT
}

fn default_revenue_potential_weight() -> f64 {
    DEFAULT_REVENUE_POTENTIAL_WEIGHT
}

fn default_discoverability_weight() -> f64 {
    DEFAULT_DISCOVERABILITY_WEIGHT
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            hotness: default_hotness_weight(),
            saturation: default_saturation_weight(),
            success_rate: default_success_rate_weight(),
            timing: default_timing_weight(),
            growth_velocity: default_growth_velocity_weight(),
            competition: default_competition_weight(),
            revenue_potential: default_revenue_potential_weight(),
            discoverability: default_discoverability_weight(),
        }
    }
}

impl ScoreWeights {
    fn all(&self) -> [f64; 8] {
        [
            self.hotness,
            self.saturation,
            self.success_rate,
            self.timing,
            self.growth_velocity,
            self.competition,
            self.revenue_potential,
            self.discoverability,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.all().iter().sum()
    }
}

/// Scoring thresholds and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// WoW changes within ±this percent are "stable"
    #[serde(default = "default_stable_band_pct")]
    pub stable_band_pct: f64,

    /// Minimum review score for a game to count toward success rate
    #[serde(default = "default_success_review_threshold")]
    pub success_review_threshold: u8,

    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: u8,

    /// Lower hot bar for genres that are rising
    #[serde(default = "default_rising_hot_threshold")]
    pub rising_hot_threshold: u8,

    #[serde(default = "default_cold_threshold")]
    pub cold_threshold: u8,

    #[serde(default)]
    pub weights: ScoreWeights,
}

fn default_stable_band_pct() -> f64 {
    DEFAULT_STABLE_BAND_PCT
}

fn default_success_review_threshold() -> u8 {
    DEFAULT_SUCCESS_REVIEW_THRESHOLD
}

fn default_hot_threshold() -> u8 {
    DEFAULT_HOT_THRESHOLD
}

fn default_rising_hot_threshold() -> u8 {
    DEFAULT_RISING_HOT_THRESHOLD
}

fn default_cold_threshold() -> u8 {
    DEFAULT_COLD_THRESHOLD
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            stable_band_pct: default_stable_band_pct(),
            success_review_threshold: default_success_review_threshold(),
            hot_threshold: default_hot_threshold(),
            rising_hot_threshold: default_rising_hot_threshold(),
            cold_threshold: default_cold_threshold(),
            weights: ScoreWeights::default(),
        }
    }
}

/// Engine configuration: what to compute and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_top_tags_limit")]
    pub top_tags_limit: usize,

    #[serde(default = "default_top_games_limit")]
    pub top_games_limit: usize,

    #[serde(default = "default_correlation_top_games")]
    pub correlation_top_games: usize,

    /// Genres to aggregate; empty means every genre seen in the snapshot
    #[serde(default)]
    pub tracked_genres: Vec<String>,

    /// Tag pairs to correlate
    #[serde(default)]
    pub tag_pairs: Vec<(String, String)>,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_top_tags_limit() -> usize {
    DEFAULT_TOP_TAGS
}

fn default_top_games_limit() -> usize {
    DEFAULT_TOP_GAMES
}

fn default_correlation_top_games() -> usize {
    DEFAULT_CORRELATION_TOP_GAMES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_tags_limit: default_top_tags_limit(),
            top_games_limit: default_top_games_limit(),
            correlation_top_games: default_correlation_top_games(),
            tracked_genres: Vec::new(),
            tag_pairs: Vec::new(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            top_tags_limit: self.top_tags_limit,
            top_games_limit: self.top_games_limit,
            success_review_threshold: self.scoring.success_review_threshold,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("Server port must be greater than 0"));
        }

        let engine = &self.engine;
        if engine.top_tags_limit == 0
            || engine.top_games_limit == 0
            || engine.correlation_top_games == 0
        {
            return Err(invalid("Engine list limits must be greater than 0"));
        }

        let scoring = &engine.scoring;
        if !scoring.stable_band_pct.is_finite() || scoring.stable_band_pct < 0.0 {
            return Err(invalid("Stable band must be a non-negative percentage"));
        }

        for (name, value) in [
            ("success_review_threshold", scoring.success_review_threshold),
            ("hot_threshold", scoring.hot_threshold),
            ("rising_hot_threshold", scoring.rising_hot_threshold),
            ("cold_threshold", scoring.cold_threshold),
        ] {
            if value > 100 {
                return Err(invalid(format!("{} must be within 0-100, got {}", name, value)));
            }
        }

        if scoring.cold_threshold > scoring.hot_threshold {
            return Err(invalid("cold_threshold must not exceed hot_threshold"));
        }

        if scoring.weights.all().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("Score weights must be non-negative"));
        }

        let sum = scoring.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("Score weights must sum to 1.0, got {}", sum)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.engine.top_tags_limit, 10);
        assert_eq!(config.engine.correlation_top_games, 5);
        assert_eq!(config.engine.scoring.success_review_threshold, 70);
        assert!(config.engine.tracked_genres.is_empty());
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_weights_must_sum_to_one() {
        let mut config = AppConfig::default();
        config.engine.scoring.weights.hotness = 0.5;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_config_validation_negative_weight() {
        let mut config = AppConfig::default();
        config.engine.scoring.weights.hotness = -0.1;
        config.engine.scoring.weights.success_rate = 0.5;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_thresholds() {
        let mut config = AppConfig::default();
        config.engine.scoring.hot_threshold = 101;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.engine.scoring.cold_threshold = 80;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.engine.scoring.stable_band_pct = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.engine.scoring.stable_band_pct = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limit() {
        let mut config = AppConfig::default();
        config.engine.top_games_limit = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            data_dir = "/srv/market"

            [engine]
            tracked_genres = ["Roguelike", "Survival"]
            tag_pairs = [["Roguelike", "Deck Building"]]

            [engine.scoring]
            hot_threshold = 75

            [engine.scoring.weights]
            hotness = 0.25
            discoverability = 0.0
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/market"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.engine.tracked_genres, vec!["Roguelike", "Survival"]);
        assert_eq!(
            config.engine.tag_pairs,
            vec![("Roguelike".to_string(), "Deck Building".to_string())]
        );
        assert_eq!(config.engine.scoring.hot_threshold, 75);
        assert_eq!(config.engine.scoring.cold_threshold, 40);
        assert_eq!(config.engine.scoring.weights.hotness, 0.25);
        assert_eq!(config.engine.scoring.weights.timing, 0.15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("market.toml");
        std::fs::write(&path, "log_level = \"debug\"\n[server]\nport = 9000\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.port, 9000);

        std::fs::write(&path, "[server]\nport = 0\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_aggregate_options_follow_engine_config() {
        let mut engine = EngineConfig::default();
        engine.top_tags_limit = 3;
        engine.scoring.success_review_threshold = 80;

        let options = engine.aggregate_options();
        assert_eq!(options.top_tags_limit, 3);
        assert_eq!(options.success_review_threshold, 80);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.engine.tag_pairs = vec![("A".to_string(), "B".to_string())];
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(parsed.engine.tag_pairs, config.engine.tag_pairs);
        assert_eq!(parsed.engine.scoring, config.engine.scoring);
    }
}
