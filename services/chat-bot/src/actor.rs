//! Engine actor.
//!
//! The [`GameEngine`] is owned by one thread that drains a bounded mailbox. Chat commands,
//! operator actions, scheduler ticks, status queries and config swaps all arrive as
//! [`Message`]s, so no two of them ever interleave. Callers await a `oneshot` for the result.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chatcollect_execution::{EventKind, GameEngine, LootRng};
use chatcollect_types::{EventStatus, GameConfig, LeaderboardRow};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    broadcaster::Broadcaster,
    commands::{self, ChatCommand},
};

/// Current wall clock in Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

#[derive(Debug, Error)]
#[error("engine mailbox closed")]
pub struct MailboxClosed;

/// Messages handled by the engine actor.
pub enum Message {
    Chat {
        user: String,
        text: String,
        response: oneshot::Sender<Option<String>>,
    },
    StartEvent {
        kind: EventKind,
        minutes: Option<f64>,
        response: oneshot::Sender<Option<String>>,
    },
    StopEvent {
        kind: EventKind,
        response: oneshot::Sender<Option<String>>,
    },
    SetBanner {
        show: bool,
    },
    Leaderboard {
        show: bool,
        response: oneshot::Sender<Vec<LeaderboardRow>>,
    },
    Tick {
        response: oneshot::Sender<Duration>,
    },
    Status {
        response: oneshot::Sender<EventStatus>,
    },
    ReloadConfig {
        config: Box<GameConfig>,
    },
}

/// Handle for sending work to the engine actor.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Message,
    ) -> Result<T, MailboxClosed> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(build(response))
            .await
            .map_err(|_| MailboxClosed)?;
        receiver.await.map_err(|_| MailboxClosed)
    }

    /// Run one chat line from `user`. Returns the reply, if the line warrants one.
    pub async fn chat(&self, user: &str, text: &str) -> Result<Option<String>, MailboxClosed> {
        let (user, text) = (user.to_string(), text.to_string());
        self.request(|response| Message::Chat {
            user,
            text,
            response,
        })
        .await
    }

    pub async fn start_event(
        &self,
        kind: EventKind,
        minutes: Option<f64>,
    ) -> Result<Option<String>, MailboxClosed> {
        self.request(|response| Message::StartEvent {
            kind,
            minutes,
            response,
        })
        .await
    }

    pub async fn stop_event(&self, kind: EventKind) -> Result<Option<String>, MailboxClosed> {
        self.request(|response| Message::StopEvent { kind, response })
            .await
    }

    /// Push a leaderboard snapshot to overlays (`show = false` hides it) and return the rows.
    pub async fn leaderboard(&self, show: bool) -> Result<Vec<LeaderboardRow>, MailboxClosed> {
        self.request(|response| Message::Leaderboard { show, response })
            .await
    }

    /// Run one scheduler tick. Returns the delay before the next one.
    pub async fn tick(&self) -> Result<Duration, MailboxClosed> {
        self.request(|response| Message::Tick { response }).await
    }

    pub async fn status(&self) -> Result<EventStatus, MailboxClosed> {
        self.request(|response| Message::Status { response }).await
    }

    pub async fn set_banner(&self, show: bool) {
        if self.sender.send(Message::SetBanner { show }).await.is_err() {
            warn!(show, "engine mailbox closed; banner toggle dropped");
        }
    }

    pub async fn reload_config(&self, config: GameConfig) {
        if self
            .sender
            .send(Message::ReloadConfig {
                config: Box::new(config),
            })
            .await
            .is_err()
        {
            warn!("engine mailbox closed; config reload dropped");
        }
    }
}

/// Owns the engine and applies messages one at a time.
pub struct Actor<R> {
    engine: GameEngine<R>,
    broadcaster: Broadcaster,
    outbox: mpsc::Sender<String>,
}

impl<R: LootRng + Send + 'static> Actor<R> {
    /// `outbox` receives chat announcements that are not replies to a command.
    pub fn new(engine: GameEngine<R>, broadcaster: Broadcaster, outbox: mpsc::Sender<String>) -> Self {
        Self {
            engine,
            broadcaster,
            outbox,
        }
    }

    /// Start the actor on a dedicated thread.
    pub fn spawn(self, capacity: usize) -> Mailbox {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        std::thread::spawn(move || self.run(receiver));
        Mailbox { sender }
    }

    fn run(mut self, mut receiver: mpsc::Receiver<Message>) {
        info!("engine actor started");
        while let Some(message) = receiver.blocking_recv() {
            self.handle(message, unix_now());
        }
        info!("engine actor stopped");
    }

    fn handle(&mut self, message: Message, now: f64) {
        match message {
            Message::Chat {
                user,
                text,
                response,
            } => {
                let reply = self.chat(&user, &text, now);
                let _ = response.send(reply);
            }
            Message::StartEvent {
                kind,
                minutes,
                response,
            } => {
                let announcement = self.engine.start_event(kind, minutes, now);
                if let Some(text) = &announcement {
                    self.announce(text.clone());
                }
                let _ = response.send(announcement);
            }
            Message::StopEvent { kind, response } => {
                let announcement = self.engine.stop_event(kind);
                if let Some(text) = &announcement {
                    self.announce(text.clone());
                }
                let _ = response.send(announcement);
            }
            Message::SetBanner { show } => self.engine.set_show_banner(show),
            Message::Leaderboard { show, response } => {
                let event = self.engine.leaderboard_overlay(show);
                self.broadcaster.publish(&event);
                let _ = response.send(self.engine.leaderboard(self.engine.config().leaderboard.overlay_size));
            }
            Message::Tick { response } => {
                let report = self.engine.tick(now);
                for text in report.announcements {
                    self.announce(text);
                }
                let _ = response.send(report.next_interval);
            }
            Message::Status { response } => {
                let _ = response.send(self.engine.status(now));
            }
            Message::ReloadConfig { config } => self.engine.set_config(*config),
        }
    }

    fn chat(&mut self, user: &str, text: &str, now: f64) -> Option<String> {
        let command = commands::parse(&self.engine.config().commands, text)?;
        debug!(user, ?command, "chat command");
        let result = match command {
            ChatCommand::Loot => self.engine.loot(user, now).map(|report| {
                self.broadcaster.publish(&report.overlay);
                report.reply
            }),
            ChatCommand::Leaderboard => Ok(self.engine.leaderboard_reply()),
            ChatCommand::JoinContest => self.engine.join_contest(user),
            ChatCommand::Use { amount } => self.engine.use_points(user, amount.as_deref(), now),
        };
        match result {
            Ok(reply) => Some(reply),
            Err(err) => {
                debug!(user, %err, "command rejected");
                err.reply(self.engine.config())
            }
        }
    }

    fn announce(&self, text: String) {
        if let Err(err) = self.outbox.try_send(text) {
            warn!(%err, "chat outbox unavailable; announcement dropped");
        }
    }
}
