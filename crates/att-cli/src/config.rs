//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use att_core::{BreakPolicy, CompanyCode, RecorderPolicy, SummaryPolicy};
use chrono::{Duration, NaiveTime};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Address the HTTP server listens on.
    pub bind_address: String,
    /// Company code stored on every recorded event.
    pub company_code: CompanyCode,
    pub dedup_window_secs: u32,
    pub short_break_secs: u32,
    pub lunch_break_secs: u32,
    /// Local time after which today's last checkout is no longer pending.
    pub day_close_time: NaiveTime,
    pub default_query_limit: u32,
    pub employee_query_limit: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("bind_address", &self.bind_address)
            .field("company_code", &self.company_code.as_str())
            .field("dedup_window_secs", &self.dedup_window_secs)
            .field("short_break_secs", &self.short_break_secs)
            .field("lunch_break_secs", &self.lunch_break_secs)
            .field("day_close_time", &self.day_close_time)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let breaks = BreakPolicy::default();
        Self {
            database_path: data_dir.join("att.db"),
            bind_address: "127.0.0.1:8787".to_string(),
            company_code: CompanyCode::default(),
            dedup_window_secs: 60,
            short_break_secs: seconds(breaks.short_break_under),
            lunch_break_secs: seconds(breaks.lunch_break_from),
            day_close_time: SummaryPolicy::default().day_close,
            default_query_limit: 100,
            employee_query_limit: 50,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ATT_*)
        figment = figment.merge(Env::prefixed("ATT_"));

        figment.extract()
    }

    pub fn recorder_policy(&self) -> RecorderPolicy {
        RecorderPolicy {
            dedup_window: Duration::seconds(i64::from(self.dedup_window_secs)),
            company_code: self.company_code.clone(),
        }
    }

    pub fn break_policy(&self) -> BreakPolicy {
        BreakPolicy {
            short_break_under: Duration::seconds(i64::from(self.short_break_secs)),
            lunch_break_from: Duration::seconds(i64::from(self.lunch_break_secs)),
        }
    }

    pub const fn summary_policy(&self) -> SummaryPolicy {
        SummaryPolicy {
            day_close: self.day_close_time,
        }
    }
}

fn seconds(duration: Duration) -> u32 {
    u32::try_from(duration.num_seconds()).unwrap_or_default()
}

/// Returns the platform-specific config directory for att.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("att"))
}

/// Returns the platform-specific data directory for att.
///
/// On Linux: `~/.local/share/att`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("att"))
}
