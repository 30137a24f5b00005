use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KeeperError, Result};
use crate::types::{Address, BlockNumber, Commission};

/// Blocks that must pass between announcing and executing a nomination.
/// Roughly 18 hours at six-second blocks.
pub const DEFAULT_DELAY_BLOCKS: BlockNumber = 10_850;

/// Default interval between scans.
pub const DEFAULT_SCAN_FREQUENCY: &str = "15m";

/// Default pause after each submitted nomination.
pub const DEFAULT_EXECUTION_COOLDOWN_MS: u64 = 7_000;

/// Default upper bound on waiting for a submission to finalize.
pub const DEFAULT_FINALIZATION_TIMEOUT_SECS: u64 = 300;

/// Default maximum commission a nomination target may charge.
pub const DEFAULT_COMMISSION_THRESHOLD_PERCENT: f64 = 15.0;

/// Top-level configuration for the keeper service.
///
/// Loaded from `~/.keeper/config.toml` by default. Missing sections fall
/// back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub validity: ValidityConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl KeeperConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KeeperConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.scan.scan_frequency.parse::<ScanFrequency>()?;

        let threshold = self.validity.commission_threshold_percent;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(KeeperError::Config(format!(
                "commission_threshold_percent must be within 0..=100, got {}",
                threshold
            )));
        }
        if self.scan.finalization_timeout_secs == 0 {
            return Err(KeeperError::Config(
                "finalization_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if !seen.insert(&group.controller) {
                return Err(KeeperError::Config(format!(
                    "duplicate group for controller {}",
                    group.controller
                )));
            }
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.keeper/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Scan loop and execution pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Interval expression, e.g. "15m" or "every 30s".
    pub scan_frequency: String,
    /// Blocks between announcement and earliest execution.
    pub delay_blocks: BlockNumber,
    /// Pause after each submitted nomination.
    pub execution_cooldown_ms: u64,
    /// Upper bound on waiting for a submission to finalize.
    pub finalization_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_frequency: DEFAULT_SCAN_FREQUENCY.to_string(),
            delay_blocks: DEFAULT_DELAY_BLOCKS,
            execution_cooldown_ms: DEFAULT_EXECUTION_COOLDOWN_MS,
            finalization_timeout_secs: DEFAULT_FINALIZATION_TIMEOUT_SECS,
        }
    }
}

impl ScanConfig {
    pub fn execution_cooldown(&self) -> Duration {
        Duration::from_millis(self.execution_cooldown_ms)
    }

    pub fn finalization_timeout(&self) -> Duration {
        Duration::from_secs(self.finalization_timeout_secs)
    }
}

/// Target validity rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityConfig {
    /// Maximum allowed commission, in percent.
    pub commission_threshold_percent: f64,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            commission_threshold_percent: DEFAULT_COMMISSION_THRESHOLD_PERCENT,
        }
    }
}

impl ValidityConfig {
    pub fn commission_threshold(&self) -> Commission {
        Commission::from_percent_f64(self.commission_threshold_percent)
    }
}

/// Human-readable alert delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Send alerts at all. When false a no-op notifier is installed.
    pub enabled: bool,
    /// Alerts allowed per minute before excess ones are dropped.
    pub max_per_minute: u32,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_minute: 20,
        }
    }
}

/// A controller/principal pair the service acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub controller: Address,
    pub principal: Address,
}

/// Interval between scans, parsed from expressions like `"30s"`, `"15m"`,
/// `"2h"` or `"every 15m"`. A bare number is read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFrequency(pub Duration);

impl ScanFrequency {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for ScanFrequency {
    type Err = KeeperError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let expr = s.trim();
        let expr = expr.strip_prefix("every").unwrap_or(expr).trim();
        let invalid = || KeeperError::Config(format!("invalid scan frequency: {:?}", s));

        let split = expr
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(expr.len());
        let (digits, unit) = expr.split_at(split);
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let secs = match unit.trim() {
            "" | "s" | "sec" | "secs" => value,
            "m" | "min" | "mins" => value.checked_mul(60).ok_or_else(invalid)?,
            "h" | "hr" | "hrs" => value.checked_mul(3600).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        if secs == 0 {
            return Err(invalid());
        }
        Ok(Self(Duration::from_secs(secs)))
    }
}

impl fmt::Display for ScanFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {}s", self.0.as_secs())
    }
}
