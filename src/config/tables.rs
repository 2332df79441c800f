use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout: settings grouped under `[logging]`, `[tts]` and `[playback]`.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    tts: TtsConfig,
    #[serde(default)]
    playback: PlaybackConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            tts_endpoint: tables.tts.endpoint,
            tts_voice: tables.tts.voice,
            tts_timeout_secs: tables.tts.timeout_secs,
            advance_delay_ms: tables.playback.advance_delay_ms,
            tick_interval_ms: tables.playback.tick_interval_ms,
            volume: tables.playback.volume,
            start_muted: tables.playback.start_muted,
            auto_advance: tables.playback.auto_advance,
            auto_scroll: tables.playback.auto_scroll,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            tts: TtsConfig {
                endpoint: config.tts_endpoint.clone(),
                voice: config.tts_voice.clone(),
                timeout_secs: config.tts_timeout_secs,
            },
            playback: PlaybackConfig {
                advance_delay_ms: config.advance_delay_ms,
                tick_interval_ms: config.tick_interval_ms,
                volume: config.volume,
                start_muted: config.start_muted,
                auto_advance: config.auto_advance,
                auto_scroll: config.auto_scroll,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct TtsConfig {
    #[serde(default = "defaults::default_tts_endpoint")]
    endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
    #[serde(default = "defaults::default_tts_timeout_secs")]
    timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            endpoint: defaults::default_tts_endpoint(),
            voice: None,
            timeout_secs: defaults::default_tts_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_advance_delay_ms")]
    advance_delay_ms: u64,
    #[serde(default = "defaults::default_tick_interval_ms")]
    tick_interval_ms: u64,
    #[serde(default = "defaults::default_volume")]
    volume: f32,
    #[serde(default)]
    start_muted: bool,
    #[serde(default = "defaults::default_auto_advance")]
    auto_advance: bool,
    #[serde(default = "defaults::default_auto_scroll")]
    auto_scroll: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            advance_delay_ms: defaults::default_advance_delay_ms(),
            tick_interval_ms: defaults::default_tick_interval_ms(),
            volume: defaults::default_volume(),
            start_muted: false,
            auto_advance: defaults::default_auto_advance(),
            auto_scroll: defaults::default_auto_scroll(),
        }
    }
}
