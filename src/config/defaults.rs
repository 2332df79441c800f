pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_tts_endpoint() -> String {
    "http://127.0.0.1:5002/api/tts".to_string()
}

pub(crate) fn default_tts_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_advance_delay_ms() -> u64 {
    600
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    50
}

pub(crate) fn default_volume() -> f32 {
    1.0
}

pub(crate) fn default_auto_advance() -> bool {
    true
}

pub(crate) fn default_auto_scroll() -> bool {
    true
}
