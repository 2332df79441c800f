//! Page-scroll synchronization requested by the advance pipeline.

use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Best-effort, fire-and-forget scroll to a track's section.
pub trait ScrollSynchronizer {
    fn scroll_to_anchor(&self, anchor_id: &str, parent_anchor_id: Option<&str>);
}

/// Logs each request; stands in for a page that is not attached.
#[derive(Debug, Default, Clone)]
pub struct LoggingScroll;

impl ScrollSynchronizer for LoggingScroll {
    fn scroll_to_anchor(&self, anchor_id: &str, parent_anchor_id: Option<&str>) {
        info!(anchor_id, parent = parent_anchor_id.unwrap_or("-"), "Scroll to section");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    pub anchor_id: String,
    pub parent_anchor_id: Option<String>,
}

/// Records requests and checks them against the anchors the page knows about.
#[derive(Debug, Default, Clone)]
pub struct RecordingScroll {
    known_anchors: Option<Arc<Vec<String>>>,
    requests: Arc<Mutex<Vec<ScrollRequest>>>,
}

impl RecordingScroll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only these anchors exist on the page; others are logged as missing.
    pub fn with_known_anchors(anchors: Vec<String>) -> Self {
        Self {
            known_anchors: Some(Arc::new(anchors)),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<ScrollRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ScrollSynchronizer for RecordingScroll {
    fn scroll_to_anchor(&self, anchor_id: &str, parent_anchor_id: Option<&str>) {
        if let Some(known) = &self.known_anchors {
            let target = parent_anchor_id.unwrap_or(anchor_id);
            if !known.iter().any(|anchor| anchor == target || anchor == anchor_id) {
                warn!(anchor_id, parent = parent_anchor_id.unwrap_or("-"), "Scroll anchor not found");
            }
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(ScrollRequest {
                anchor_id: anchor_id.to_string(),
                parent_anchor_id: parent_anchor_id.map(str::to_string),
            });
        }
    }
}

impl<S: ScrollSynchronizer + ?Sized> ScrollSynchronizer for Box<S> {
    fn scroll_to_anchor(&self, anchor_id: &str, parent_anchor_id: Option<&str>) {
        (**self).scroll_to_anchor(anchor_id, parent_anchor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_requests_even_for_missing_anchors() {
        let scroll = RecordingScroll::with_known_anchors(vec!["milestone-m1".to_string()]);
        let observer = scroll.clone();
        scroll.scroll_to_anchor("event-e1", Some("milestone-m1"));
        scroll.scroll_to_anchor("timeline-conclusion", None);
        let requests = observer.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].parent_anchor_id.as_deref(), Some("milestone-m1"));
        assert_eq!(requests[1].anchor_id, "timeline-conclusion");
    }
}
