//! Configuration loading and typed config structures for the Canopy server.
//!
//! The configuration lives in `canopy-config.yaml`. Every field has a
//! default, so an empty file (or no file at all) yields a runnable server
//! with no database.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration, mirroring `canopy-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// World settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// New-player provisioning.
    #[serde(default)]
    pub player: PlayerConfig,

    /// Background job cadence.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file.
    ///
    /// `DATABASE_URL`, when set, overrides `infrastructure.postgres_url`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.infrastructure.apply_env_overrides();
            Ok(config)
        }
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject zero-length schedule intervals.
    fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("schedule.market_sweep_secs", self.schedule.market_sweep_secs),
            ("schedule.plant_tick_secs", self.schedule.plant_tick_secs),
            ("schedule.weather_cycle_secs", self.schedule.weather_cycle_secs),
            ("schedule.persist_secs", self.schedule.persist_secs),
            (
                "infrastructure.max_connections",
                u64::from(self.infrastructure.max_connections),
            ),
            (
                "infrastructure.connect_timeout_secs",
                self.infrastructure.connect_timeout_secs,
            ),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

/// World settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Seed for the random source. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Seed the starter strains, locations and achievements on boot.
    #[serde(default = "default_true")]
    pub seed_starter_catalog: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            seed_starter_catalog: true,
        }
    }
}

/// New-player provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerConfig {
    /// Balance of a freshly provisioned player.
    #[serde(default = "default_starting_tokens")]
    pub starting_tokens: u64,

    /// Reputation of a freshly provisioned player.
    #[serde(default = "default_starting_reputation")]
    pub starting_reputation: i64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            starting_tokens: default_starting_tokens(),
            starting_reputation: default_starting_reputation(),
        }
    }
}

/// Background job cadence, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Market sweep (once per in-game day).
    #[serde(default = "default_market_sweep_secs")]
    pub market_sweep_secs: u64,

    /// Re-evaluation of every growing plant.
    #[serde(default = "default_plant_tick_secs")]
    pub plant_tick_secs: u64,

    /// Weather generation cycle.
    #[serde(default = "default_weather_cycle_secs")]
    pub weather_cycle_secs: u64,

    /// Flush of changed rows to `PostgreSQL`.
    #[serde(default = "default_persist_secs")]
    pub persist_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            market_sweep_secs: default_market_sweep_secs(),
            plant_tick_secs: default_plant_tick_secs(),
            weather_cycle_secs: default_weather_cycle_secs(),
            persist_secs: default_persist_secs(),
        }
    }
}

/// Infrastructure connection strings and pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection string. `None` runs in memory only.
    #[serde(default)]
    pub postgres_url: Option<String>,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl InfrastructureConfig {
    /// Override connection strings with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            if !val.is_empty() {
                self.postgres_url = Some(val);
            }
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_starting_tokens() -> u64 {
    canopy_players::DEFAULT_STARTING_TOKENS
}

const fn default_starting_reputation() -> i64 {
    canopy_players::DEFAULT_STARTING_REPUTATION
}

const fn default_market_sweep_secs() -> u64 {
    86_400
}

const fn default_plant_tick_secs() -> u64 {
    300
}

const fn default_weather_cycle_secs() -> u64 {
    3_600
}

const fn default_persist_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    String::from("info")
}
