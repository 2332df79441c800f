//! The engine loop: owns the controller, serializes commands and completions
//! onto one task, and performs the effects the controller returns.

use super::{CommandResult, Effect, PlaybackController};
use crate::gateway::SpeechGateway;
use crate::media::MediaPrimitive;
use crate::player::messages::{Command, Message};
use crate::player::view::PlaybackView;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Cloneable front door to a running [`NarrationEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<PlaybackView>,
}

impl EngineHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|err| anyhow!("narration engine stopped; dropped {}", err.0.name()))
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.view.clone()
    }

    pub fn view(&self) -> PlaybackView {
        self.view.borrow().clone()
    }
}

pub struct NarrationEngine<M: MediaPrimitive> {
    controller: PlaybackController<M>,
    gateway: Arc<dyn SpeechGateway>,
    tick: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
    messages_tx: mpsc::UnboundedSender<Message>,
    messages: mpsc::UnboundedReceiver<Message>,
    view_tx: watch::Sender<PlaybackView>,
}

impl<M: MediaPrimitive> NarrationEngine<M> {
    pub fn new(
        controller: PlaybackController<M>,
        gateway: Arc<dyn SpeechGateway>,
        tick: Duration,
    ) -> (Self, EngineHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (messages_tx, messages) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(controller.view());
        let engine = Self {
            controller,
            gateway,
            tick: tick.max(Duration::from_millis(1)),
            commands,
            messages_tx,
            messages,
            view_tx,
        };
        let handle = EngineHandle {
            commands: commands_tx,
            view,
        };
        (engine, handle)
    }

    /// Drive the session until `Shutdown` arrives or every handle is dropped.
    /// The controller is released on the way out.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick_ms = self.tick.as_millis() as u64, "Narration engine started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("All engine handles dropped; stopping");
                        break;
                    };
                    if matches!(command, Command::Shutdown) {
                        info!("Shutdown requested");
                        break;
                    }
                    self.handle_command(command);
                }
                Some(message) = self.messages.recv() => self.handle_message(message),
                _ = ticker.tick() => self.poll_media(),
            }
            self.publish();
        }

        self.messages.close();
        while let Ok(message) = self.messages.try_recv() {
            if let Message::GenerationFinished {
                result: Ok(handle), ..
            } = message
            {
                self.controller.blobs().revoke(&handle);
            }
        }
        self.controller.shutdown();
        self.publish();
        info!("Narration engine stopped");
        Ok(())
    }

    fn handle_command(&mut self, command: Command) {
        let name = command.name();
        debug!(command = name, "Handling command");
        let result = match command {
            Command::Play => self.controller.play_current(),
            Command::Pause => self.controller.pause(),
            Command::Stop => self.controller.stop(),
            Command::Next => self.controller.next(),
            Command::Previous => self.controller.previous(),
            Command::JumpTo(index) => self.controller.jump_to(index),
            Command::SetVolume(volume) => {
                self.controller.set_volume(volume);
                Ok(Vec::new())
            }
            Command::ToggleMute => {
                self.controller.toggle_mute();
                Ok(Vec::new())
            }
            Command::LoadTracklist {
                tracks,
                start_index,
            } => {
                self.controller.load_tracklist(tracks, start_index);
                Ok(Vec::new())
            }
            Command::Shutdown => Ok(Vec::new()),
        };
        self.apply(name, result);
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::GenerationFinished {
                epoch,
                track_id,
                result,
            } => {
                let outcome = self.controller.on_generation_finished(epoch, &track_id, result);
                debug!(epoch, track_id = %track_id, ?outcome, "Generation completed");
            }
            Message::AdvanceDue { ticket } => {
                let result = self.controller.on_advance_due(ticket);
                self.apply("advance", result);
            }
        }
    }

    fn poll_media(&mut self) {
        for event in self.controller.poll_media_events() {
            let result = self.controller.on_media_event(event);
            self.apply("media_event", result);
        }
    }

    fn apply(&mut self, origin: &'static str, result: CommandResult) {
        match result {
            Ok(effects) => {
                for effect in effects {
                    self.dispatch(effect);
                }
            }
            Err(err) => debug!(origin, "Rejected: {err}"),
        }
    }

    fn dispatch(&self, effect: Effect) {
        let tx = self.messages_tx.clone();
        match effect {
            Effect::Generate(request) => {
                let gateway = Arc::clone(&self.gateway);
                let blobs = self.controller.blobs().clone();
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = gateway.generate(&request.text).await;
                    debug!(
                        track_id = %request.track_id,
                        epoch = request.epoch,
                        ok = result.is_ok(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Speech request finished"
                    );
                    let message = Message::GenerationFinished {
                        epoch: request.epoch,
                        track_id: request.track_id,
                        result,
                    };
                    if let Err(mpsc::error::SendError(Message::GenerationFinished {
                        result: Ok(handle),
                        ..
                    })) = tx.send(message)
                    {
                        blobs.revoke(&handle);
                    }
                });
            }
            Effect::ScheduleAdvance(ticket) => {
                tokio::spawn(async move {
                    tokio::time::sleep(ticket.delay).await;
                    if let Err(err) = ticket.token.check("advance") {
                        debug!(ticket = ticket.id, "Advance dropped: {err}");
                        return;
                    }
                    let _ = tx.send(Message::AdvanceDue { ticket: ticket.id });
                });
            }
        }
    }

    fn publish(&mut self) {
        let view = self.controller.view();
        self.view_tx.send_if_modified(|current| {
            if current.revision == view.revision && current.finished == view.finished {
                return false;
            }
            *current = view;
            true
        });
    }
}
