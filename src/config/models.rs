use serde::Deserialize;
use std::time::Duration;

/// Engine configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_tts_endpoint")]
    pub tts_endpoint: String,
    #[serde(default)]
    pub tts_voice: Option<String>,
    #[serde(default = "crate::config::defaults::default_tts_timeout_secs")]
    pub tts_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_advance_delay_ms")]
    pub advance_delay_ms: u64,
    #[serde(default = "crate::config::defaults::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub start_muted: bool,
    #[serde(default = "crate::config::defaults::default_auto_advance")]
    pub auto_advance: bool,
    #[serde(default = "crate::config::defaults::default_auto_scroll")]
    pub auto_scroll: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            tts_endpoint: crate::config::defaults::default_tts_endpoint(),
            tts_voice: None,
            tts_timeout_secs: crate::config::defaults::default_tts_timeout_secs(),
            advance_delay_ms: crate::config::defaults::default_advance_delay_ms(),
            tick_interval_ms: crate::config::defaults::default_tick_interval_ms(),
            volume: crate::config::defaults::default_volume(),
            start_muted: false,
            auto_advance: crate::config::defaults::default_auto_advance(),
            auto_scroll: crate::config::defaults::default_auto_scroll(),
        }
    }
}

impl AppConfig {
    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// Never zero; a zero interval would spin the engine loop.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_secs.max(1))
    }

    /// Keep runtime values in bounds regardless of config source.
    pub(crate) fn clamped(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            crate::config::defaults::default_volume()
        };
        self
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
