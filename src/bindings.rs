//! TypeScript bindings for the types a web UI consumes.

use crate::error::PlaybackFault;
use crate::player::{PlaybackView, TrackView, Transport};
use crate::track::{Track, TrackKind};
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<(), String> {
    T::export_all_to(out_dir).map_err(|err| err.to_string())
}

/// Replace every `.ts` file in `out_dir` with freshly generated bindings.
pub fn export_ts_bindings(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|err| format!("Failed to create {}: {err}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir)
        .map_err(|err| format!("Failed to list {}: {err}", out_dir.display()))?
    {
        let entry = entry.map_err(|err| format!("Failed to read entry: {err}"))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .map_err(|err| format!("Failed to remove {}: {err}", path.display()))?;
        }
    }

    export_single_type::<TrackKind>(out_dir)?;
    export_single_type::<Track>(out_dir)?;
    export_single_type::<Transport>(out_dir)?;
    export_single_type::<PlaybackFault>(out_dir)?;
    export_single_type::<TrackView>(out_dir)?;
    export_single_type::<PlaybackView>(out_dir)?;
    Ok(())
}
