use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const TABLE_KEYS: [&str; 3] = ["logging", "tts", "playback"];

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the grouped table layout or a flat list of keys.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let raw: toml::Table = toml::from_str(contents).context("Parsing config TOML")?;
    let grouped = TABLE_KEYS
        .iter()
        .any(|key| raw.get(*key).is_some_and(toml::Value::is_table));
    let config = if grouped {
        let tables: ConfigTables =
            toml::from_str(contents).context("Reading grouped config tables")?;
        AppConfig::from(tables)
    } else {
        toml::from_str::<AppConfig>(contents).context("Reading flat config keys")?
    };
    Ok(config.clamped())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(&ConfigTables::from(config)).context("Serializing config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::io::Write;

    #[test]
    fn grouped_tables_are_read() {
        let cfg = parse_config(
            r#"
            [logging]
            log_level = "warn"

            [tts]
            endpoint = "http://tts.internal/speak"
            voice = "en-GB"

            [playback]
            advance_delay_ms = 250
            volume = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.tts_endpoint, "http://tts.internal/speak");
        assert_eq!(cfg.tts_voice.as_deref(), Some("en-GB"));
        assert_eq!(cfg.advance_delay_ms, 250);
        assert!((cfg.volume - 0.4).abs() < f32::EPSILON);
        assert_eq!(cfg.tick_interval_ms, 50);
        assert!(cfg.auto_advance);
    }

    #[test]
    fn flat_keys_are_read_and_clamped() {
        let cfg = parse_config("volume = 3.5\nstart_muted = true\nauto_scroll = false\n").unwrap();
        assert_eq!(cfg.volume, 1.0);
        assert!(cfg.start_muted);
        assert!(!cfg.auto_scroll);
        assert_eq!(cfg.advance_delay_ms, 600);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = AppConfig::default();
        cfg.advance_delay_ms = 900;
        cfg.tts_voice = Some("narrator".to_string());
        let text = serialize_config(&cfg).unwrap();
        assert!(text.contains("[playback]"));
        assert_eq!(parse_config(&text).unwrap(), cfg);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "volume = \"loud\"").unwrap();
        assert_eq!(load_config(file.path()), AppConfig::default());
        assert_eq!(
            load_config(Path::new("/nonexistent/config.toml")),
            AppConfig::default()
        );
    }
}
