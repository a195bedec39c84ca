//! Pipeline configuration.
//!
//! Built once at startup from defaults, an optional TOML file and a few
//! environment overrides, then passed by reference to every stage.

use pricecast_core::data::RetryPolicy;
use pricecast_core::domain::TradingCalendar;
use pricecast_core::ensemble::Ensembler;
use pricecast_core::features::FeatureConfig;
use pricecast_core::forecast::PatternAdjuster;
use pricecast_core::models::{GbmParams, SeasonalParams, SequenceParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BASE_DIR: &str = "PRICECAST_BASE_DIR";
pub const ENV_PREFERRED_SOURCE: &str = "PREFERRED_SOURCE";
pub const ENV_RAW_TTL: &str = "RAW_TTL_SECONDS";

/// Source names the data loader knows how to build.
pub const KNOWN_SOURCES: [&str; 3] = ["stooq", "yahoo", "local"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("environment variable {var}={value:?} is not valid")]
    Env { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Providers in fallback order.
    pub sources: Vec<String>,
    /// Raw files younger than this are reused; 0 disables the cache.
    pub cache_ttl_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            sources: KNOWN_SOURCES.iter().map(|s| s.to_string()).collect(),
            cache_ttl_secs: 0,
            max_attempts: 3,
            retry_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Skip US federal holidays when dating forecast steps.
    pub holidays: bool,
    /// Rescale the GBM forecast by nearest historical return patterns.
    pub pattern_adjust: bool,
    pub pattern_window: usize,
    pub pattern_neighbors: usize,
    pub seasonal_period: usize,
    /// Share of feature rows used for training; the rest is the eval split.
    pub train_fraction: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            holidays: false,
            pattern_adjust: true,
            pattern_window: 7,
            pattern_neighbors: 5,
            seasonal_period: 7,
            train_fraction: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub skip_gbm: bool,
    pub use_lstm: bool,
    pub gbm: GbmParams,
    pub sequence: SequenceParams,
    pub ensemble: Ensembler,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            skip_gbm: false,
            use_lstm: false,
            gbm: GbmParams::default(),
            sequence: SequenceParams::default(),
            ensemble: Ensembler::default(),
        }
    }
}

/// Every path and knob the stages need. Sub-directories left unset resolve
/// under `base_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub raw_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub fetch: FetchSettings,
    pub features: FeatureConfig,
    pub forecast: ForecastSettings,
    pub models: ModelSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            raw_dir: None,
            processed_dir: None,
            models_dir: None,
            results_dir: None,
            fetch: FetchSettings::default(),
            features: FeatureConfig::default(),
            forecast: ForecastSettings::default(),
            models: ModelSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PRICECAST_BASE_DIR`, `PREFERRED_SOURCE` (moved to the front of
    /// the source order) and `RAW_TTL_SECONDS` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_BASE_DIR).filter(|v| !v.trim().is_empty()) {
            self.base_dir = PathBuf::from(dir.trim());
        }
        if let Some(source) = lookup(ENV_PREFERRED_SOURCE) {
            let source = source.trim().to_ascii_lowercase();
            if !source.is_empty() {
                self.fetch.sources.retain(|s| *s != source);
                self.fetch.sources.insert(0, source);
            }
        }
        if let Some(ttl) = lookup(ENV_RAW_TTL) {
            self.fetch.cache_ttl_secs = ttl.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_RAW_TTL.to_string(),
                value: ttl.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.sources.is_empty() {
            return Err(ConfigError::Invalid("fetch.sources is empty".into()));
        }
        if let Some(unknown) = self
            .fetch
            .sources
            .iter()
            .find(|s| !KNOWN_SOURCES.contains(&s.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "unknown data source '{unknown}' (expected one of {})",
                KNOWN_SOURCES.join(", ")
            )));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Invalid("fetch.max_attempts must be >= 1".into()));
        }
        let frac = self.forecast.train_fraction;
        if !(frac > 0.0 && frac <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train_fraction must be in (0, 1], got {frac}"
            )));
        }
        self.features
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn resolve(&self, dir: &Option<PathBuf>, default: &[&str]) -> PathBuf {
        match dir {
            Some(d) if d.is_absolute() => d.clone(),
            Some(d) => self.base_dir.join(d),
            None => default.iter().fold(self.base_dir.clone(), |p, s| p.join(s)),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.resolve(&self.raw_dir, &["data", "raw"])
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.resolve(&self.processed_dir, &["data", "processed"])
    }

    pub fn models_dir(&self) -> PathBuf {
        self.resolve(&self.models_dir, &["models"])
    }

    pub fn results_dir(&self) -> PathBuf {
        self.resolve(&self.results_dir, &["results"])
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch.max_attempts,
            delay: Duration::from_millis(self.fetch.retry_delay_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.fetch.cache_ttl_secs)
    }

    pub fn calendar(&self) -> TradingCalendar {
        if self.forecast.holidays {
            TradingCalendar::us_federal()
        } else {
            TradingCalendar::weekdays()
        }
    }

    pub fn seasonal_params(&self) -> SeasonalParams {
        SeasonalParams {
            period: self.forecast.seasonal_period,
            ..SeasonalParams::default()
        }
    }

    pub fn pattern_adjuster(&self) -> PatternAdjuster {
        PatternAdjuster::new(self.forecast.pattern_window, self.forecast.pattern_neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_resolve_under_base_dir() {
        let cfg = PipelineConfig::with_base_dir("/tmp/pc");
        assert_eq!(cfg.raw_dir(), PathBuf::from("/tmp/pc/data/raw"));
        assert_eq!(cfg.processed_dir(), PathBuf::from("/tmp/pc/data/processed"));
        assert_eq!(cfg.models_dir(), PathBuf::from("/tmp/pc/models"));
        assert_eq!(cfg.results_dir(), PathBuf::from("/tmp/pc/results"));
        assert_eq!(cfg.fetch.sources, vec!["stooq", "yahoo", "local"]);
        cfg.validate().unwrap();
    }

    #[test]
    fn toml_overrides_only_what_it_names() {
        let cfg = PipelineConfig::from_toml(
            r#"
            base_dir = "work"
            models_dir = "/srv/models"

            [fetch]
            sources = ["yahoo"]
            cache_ttl_secs = 3600

            [features]
            windows = [3, 8]

            [forecast]
            holidays = true

            [models]
            use_lstm = true

            [models.gbm]
            n_estimators = 25
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fetch.sources, vec!["yahoo"]);
        assert_eq!(cfg.fetch.max_attempts, 3);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.features.windows, vec![3, 8]);
        assert_eq!(cfg.features.rsi_period, 14);
        assert_eq!(cfg.calendar(), TradingCalendar::us_federal());
        assert!(cfg.models.use_lstm);
        assert_eq!(cfg.models.gbm.n_estimators, 25);
        assert_eq!(cfg.models.gbm.max_depth, 3);
        assert_eq!(cfg.models_dir(), PathBuf::from("/srv/models"));
        assert_eq!(cfg.raw_dir(), PathBuf::from("work/data/raw"));
    }

    #[test]
    fn env_overrides() {
        let mut cfg = PipelineConfig::default();
        cfg.apply_env(env(&[
            (ENV_BASE_DIR, "/data/pc"),
            (ENV_PREFERRED_SOURCE, "Yahoo"),
            (ENV_RAW_TTL, "600"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_dir, PathBuf::from("/data/pc"));
        assert_eq!(cfg.fetch.sources, vec!["yahoo", "stooq", "local"]);
        assert_eq!(cfg.fetch.cache_ttl_secs, 600);
    }

    #[test]
    fn bad_ttl_is_an_env_error() {
        let mut cfg = PipelineConfig::default();
        let err = cfg.apply_env(env(&[(ENV_RAW_TTL, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.fetch.sources = vec!["bloomberg".into()];
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml("base_dir = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
