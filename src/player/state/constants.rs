/// Limits for playback controls.
pub(crate) const MIN_VOLUME: f32 = 0.0;
pub(crate) const MAX_VOLUME: f32 = 1.0;
pub(crate) const MAX_PROGRESS_PERCENT: f64 = 100.0;
