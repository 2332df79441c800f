//! Adapter from a verification timeline document to an ordered tracklist.
//!
//! The timeline is read from JSON. Each section of the page becomes one track:
//! the hero summary, one context track per milestone, one track per event inside
//! a milestone, and the closing conclusion. Anchor ids follow the page's section
//! ids so the scroll synchronizer can locate them.

use crate::text_utils::{join_sentences, normalize_narration};
use crate::track::{Track, TrackKind, sanitize_tracks};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const HERO_ANCHOR: &str = "timeline-hero";
pub const CONCLUSION_ANCHOR: &str = "timeline-conclusion";

#[derive(Debug, Clone, Deserialize)]
pub struct Timeline {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub fn load_timeline(path: &Path) -> Result<Timeline> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Reading timeline {}", path.display()))?;
    let timeline: Timeline = serde_json::from_str(&data)
        .with_context(|| format!("Parsing timeline {}", path.display()))?;
    info!(
        path = %path.display(),
        milestones = timeline.milestones.len(),
        "Loaded timeline"
    );
    Ok(timeline)
}

pub fn milestone_anchor(milestone_id: &str) -> String {
    format!("milestone-{milestone_id}")
}

pub fn event_anchor(event_id: &str) -> String {
    format!("event-{event_id}")
}

/// Build the tracklist for a timeline. Ids and anchors are stable across runs.
pub fn build_tracks(timeline: &Timeline) -> Vec<Track> {
    let mut tracks = Vec::new();

    tracks.push(Track {
        id: "hero".to_string(),
        title: normalize_narration(&timeline.title),
        text: join_sentences([timeline.title.as_str(), timeline.summary.as_str()]),
        kind: TrackKind::Hero,
        anchor_id: HERO_ANCHOR.to_string(),
        parent_anchor_id: None,
    });

    for milestone in &timeline.milestones {
        let anchor = milestone_anchor(&milestone.id);
        let heading = match &milestone.date {
            Some(date) => format!("{date}: {}", milestone.title),
            None => milestone.title.clone(),
        };
        tracks.push(Track {
            id: format!("milestone:{}", milestone.id),
            title: normalize_narration(&milestone.title),
            text: join_sentences([heading.as_str(), milestone.context.as_str()]),
            kind: TrackKind::MilestoneContext,
            anchor_id: anchor.clone(),
            parent_anchor_id: None,
        });

        for event in &milestone.events {
            tracks.push(Track {
                id: format!("event:{}:{}", milestone.id, event.id),
                title: normalize_narration(&event.title),
                text: join_sentences([event.title.as_str(), event.description.as_str()]),
                kind: TrackKind::Event,
                anchor_id: event_anchor(&event.id),
                parent_anchor_id: Some(anchor.clone()),
            });
        }
    }

    if let Some(conclusion) = timeline.conclusion.as_deref() {
        tracks.push(Track {
            id: "conclusion".to_string(),
            title: "Conclusion".to_string(),
            text: join_sentences([conclusion]),
            kind: TrackKind::Conclusion,
            anchor_id: CONCLUSION_ANCHOR.to_string(),
            parent_anchor_id: None,
        });
    }

    let built = tracks.len();
    let tracks = sanitize_tracks(tracks);
    debug!(built, kept = tracks.len(), "Built narration tracks");
    tracks
}
