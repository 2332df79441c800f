//! End-of-track handling: scroll ahead, wait out the advance delay, then play
//! the next track.

use super::{AdvanceTicket, CommandResult, Effect, PlaybackController};
use crate::cancellation::CancellationToken;
use crate::error::InvalidStateError;
use crate::media::MediaPrimitive;
use crate::player::state::{StatePatch, Transport};
use tracing::{debug, info};

#[derive(Debug)]
pub(super) struct PendingAdvance {
    pub ticket: u64,
    pub next_index: usize,
    token: CancellationToken,
}

impl<M: MediaPrimitive> PlaybackController<M> {
    pub(super) fn on_track_ended(&mut self) -> CommandResult {
        let transport = self.store.transport();
        if transport != Transport::Playing {
            return Err(InvalidStateError::Transport {
                command: "finish",
                transport,
            });
        }
        self.media.pause();
        let end = self
            .store
            .duration()
            .unwrap_or_else(|| self.media.current_time());
        self.store.set_transport(
            Transport::Ended,
            StatePatch {
                current_time: Some(end),
                ..StatePatch::default()
            },
        );
        let Some(finished_id) = self.store.current_track_id().map(str::to_string) else {
            return Ok(Vec::new());
        };
        info!(track_id = %finished_id, "Track finished");

        if !self.options.auto_advance {
            return Ok(Vec::new());
        }
        let Some((next_index, next)) = self.store.next_track(&finished_id) else {
            info!("Reached the end of the narration");
            return Ok(Vec::new());
        };
        if self.options.auto_scroll {
            let (anchor_id, parent) = next.scroll_target();
            self.scroll.scroll_to_anchor(anchor_id, parent);
        }
        Ok(vec![Effect::ScheduleAdvance(self.begin_advance(next_index))])
    }

    fn begin_advance(&mut self, next_index: usize) -> AdvanceTicket {
        self.cancel_pending_advance("superseded");
        self.advance_seq = self.advance_seq.wrapping_add(1);
        let token = CancellationToken::new();
        self.pending_advance = Some(PendingAdvance {
            ticket: self.advance_seq,
            next_index,
            token: token.clone(),
        });
        debug!(
            ticket = self.advance_seq,
            next_index,
            delay_ms = self.options.advance_delay.as_millis() as u64,
            "Scheduled advance"
        );
        AdvanceTicket {
            id: self.advance_seq,
            delay: self.options.advance_delay,
            token,
        }
    }

    /// The advance delay elapsed. Tickets that were cancelled or superseded
    /// are ignored.
    pub fn on_advance_due(&mut self, ticket: u64) -> CommandResult {
        let due = self
            .pending_advance
            .as_ref()
            .is_some_and(|pending| pending.ticket == ticket && !pending.token.is_cancelled());
        if !due {
            debug!(ticket, "Ignoring stale advance");
            return Ok(Vec::new());
        }
        let Some(pending) = self.pending_advance.take() else {
            return Ok(Vec::new());
        };
        self.store.select_index(pending.next_index)?;
        debug!(index = pending.next_index, "Advancing to next track");
        self.play_current()
    }

    pub(super) fn take_pending_advance(&mut self) -> Option<PendingAdvance> {
        let pending = self.pending_advance.take()?;
        pending.token.cancel();
        Some(pending)
    }

    pub(super) fn cancel_pending_advance(&mut self, reason: &'static str) {
        if let Some(pending) = self.take_pending_advance() {
            debug!(ticket = pending.ticket, reason, "Cancelled pending advance");
        }
    }

    /// Pause inside the advance window: stay on the upcoming track without
    /// starting it.
    pub(super) fn park_on_next_track(&mut self) {
        let Some(pending) = self.take_pending_advance() else {
            return;
        };
        if self.store.select_index(pending.next_index).is_ok() {
            self.store.set_transport(
                Transport::Idle,
                StatePatch {
                    current_time: Some(0.0),
                    duration: Some(None),
                    ..StatePatch::default()
                },
            );
            info!(index = pending.next_index, "Paused before the next track");
        }
    }
}
