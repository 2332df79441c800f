//! Narration units and the ordered list a session plays through.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Which part of a timeline a track narrates; drives scroll-target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TrackKind {
    Hero,
    MilestoneContext,
    Event,
    Conclusion,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TrackKind::Hero => "hero",
            TrackKind::MilestoneContext => "milestone_context",
            TrackKind::Event => "event",
            TrackKind::Conclusion => "conclusion",
        };
        write!(f, "{}", label)
    }
}

/// One unit of narration mapped to a UI section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub text: String,
    pub kind: TrackKind,
    pub anchor_id: String,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_anchor_id: Option<String>,
}

impl Track {
    /// The anchor and optional owning section the page should scroll to.
    ///
    /// Event tracks live inside their milestone's section, so the parent is
    /// passed along for the synchronizer to expand or locate first.
    pub fn scroll_target(&self) -> (&str, Option<&str>) {
        match self.kind {
            TrackKind::Event => (self.anchor_id.as_str(), self.parent_anchor_id.as_deref()),
            _ => (self.anchor_id.as_str(), None),
        }
    }
}

/// Drop tracks with empty narration and duplicate ids, keeping first occurrence.
pub fn sanitize_tracks(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = std::collections::HashSet::new();
    tracks
        .into_iter()
        .filter(|track| !track.text.trim().is_empty())
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) fn track(id: &str, text: &str) -> Track {
    Track {
        id: id.to_string(),
        title: id.to_uppercase(),
        text: text.to_string(),
        kind: TrackKind::MilestoneContext,
        anchor_id: format!("section-{id}"),
        parent_anchor_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tracks_resolve_through_parent() {
        let mut event = track("e1", "Something happened.");
        event.kind = TrackKind::Event;
        event.parent_anchor_id = Some("section-m1".to_string());
        assert_eq!(event.scroll_target(), ("section-e1", Some("section-m1")));

        let mut hero = track("hero", "Intro");
        hero.kind = TrackKind::Hero;
        hero.parent_anchor_id = Some("ignored".to_string());
        assert_eq!(hero.scroll_target(), ("section-hero", None));
    }

    #[test]
    fn sanitize_drops_blank_and_duplicate_tracks() {
        let tracks = vec![
            track("a", "Intro"),
            track("b", "   "),
            track("a", "Again"),
            track("c", "Outro"),
        ];
        let ids: Vec<_> = sanitize_tracks(tracks).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
