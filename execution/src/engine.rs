//! Command orchestration.
//!
//! [`GameEngine`] owns the ledger, the event scheduler and the RNG, and runs one command at a
//! time to completion: reconcile the ledger with disk, check the command's preconditions,
//! mutate, persist, then hand back a chat reply and (for loots) an overlay event. Wall-clock
//! time is always passed in, so the engine itself is deterministic for a scripted RNG.

use std::time::Duration;

use chatcollect_types::{
    format_item_name, normalize_username, render, EventStatus, GameConfig, LeaderboardRow,
    LootOutcome, OverlayEvent, Rarity,
};
use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    events::{
        format_remaining, ContestNotice, ContestSettings, DriveProgress, EventKind, EventNotice,
        EventScheduler, JoinError,
    },
    ledger::PlayerLedger,
    rarity,
    rng::{choose, LootRng},
};

const MEDALS: [&str; 5] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣"];

/// A rejected command. Every variant except [`CommandError::ContestNotJoinable`] and
/// [`CommandError::InvalidUsername`] carries a user-facing reply.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("username cannot be stored in the ledger")]
    InvalidUsername,
    #[error("{username} must wait {remaining}s to loot")]
    LootCooldown { username: String, remaining: u64 },
    #[error("{username} must wait {remaining}s to use points")]
    UseCooldown { username: String, remaining: u64 },
    #[error("{username} has no ledger record")]
    UnknownPlayer { username: String },
    #[error("{username} has {score} points but needs {needed}")]
    InsufficientScore {
        username: String,
        score: u64,
        needed: u64,
    },
    #[error("{username} gave an invalid amount")]
    InvalidAmount { username: String },
    #[error("no contest is accepting entries")]
    ContestNotJoinable,
    #[error("{username} already joined the contest")]
    AlreadyJoined { username: String },
    #[error("{username} cannot pay the {cost} point entry")]
    EntryTooLow { username: String, cost: u64 },
}

impl CommandError {
    /// Chat reply for this rejection, `None` when the command is silently ignored.
    pub fn reply(&self, config: &GameConfig) -> Option<String> {
        let messages = &config.messages;
        let text = match self {
            CommandError::LootCooldown {
                username,
                remaining,
            } => render(
                &messages.cooldown,
                &[
                    ("username", username.clone()),
                    ("remaining", remaining.to_string()),
                ],
            ),
            CommandError::UseCooldown {
                username,
                remaining,
            } => render(
                &messages.use_cooldown,
                &[
                    ("username", username.clone()),
                    ("remaining", remaining.to_string()),
                ],
            ),
            CommandError::UnknownPlayer { username } => {
                render(&messages.not_registered, &[("username", username.clone())])
            }
            CommandError::InsufficientScore {
                username, score, ..
            } => render(
                &messages.not_enough_points,
                &[("username", username.clone()), ("score", score.to_string())],
            ),
            CommandError::InvalidAmount { username } => {
                render(&messages.invalid_amount, &[("username", username.clone())])
            }
            CommandError::ContestNotJoinable | CommandError::InvalidUsername => return None,
            CommandError::AlreadyJoined { username } => render(
                &messages.contest_already_joined,
                &[
                    ("username", username.clone()),
                    ("contest", config.events.contest_name.clone()),
                ],
            ),
            CommandError::EntryTooLow { username, cost } => render(
                &messages.contest_entry_too_low,
                &[("username", username.clone()), ("cost", cost.to_string())],
            ),
        };
        Some(text)
    }
}

/// Everything produced by one accepted loot.
#[derive(Clone, Debug, PartialEq)]
pub struct LootReport {
    pub outcome: LootOutcome,
    pub reply: String,
    pub overlay: OverlayEvent,
    pub rank: String,
    pub score: u64,
    pub ranked_up: bool,
    pub bounty_satisfied: bool,
}

/// Result of one scheduler tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Chat announcements for transitions that fired.
    pub announcements: Vec<String>,
    pub status: EventStatus,
    pub next_interval: Duration,
}

pub struct GameEngine<R = StdRng> {
    config: GameConfig,
    ledger: PlayerLedger,
    scheduler: EventScheduler,
    rng: R,
    show_banner: bool,
}

impl GameEngine<StdRng> {
    /// Engine backed by an OS-seeded RNG.
    pub fn from_entropy(config: GameConfig, ledger: PlayerLedger) -> Self {
        Self::new(config, ledger, StdRng::from_entropy())
    }
}

impl<R: LootRng> GameEngine<R> {
    pub fn new(config: GameConfig, ledger: PlayerLedger, rng: R) -> Self {
        Self {
            config,
            ledger,
            scheduler: EventScheduler::new(),
            rng,
            show_banner: true,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Swap the configuration between commands. A running contest keeps its entry terms.
    pub fn set_config(&mut self, config: GameConfig) {
        self.config = config;
        info!("game config replaced");
    }

    pub fn ledger(&self) -> &PlayerLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut PlayerLedger {
        &mut self.ledger
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn show_banner(&self) -> bool {
        self.show_banner
    }

    pub fn set_show_banner(&mut self, show: bool) {
        self.show_banner = show;
        info!(show, "overlay banner toggled");
    }

    /// Resolve one loot for `username` at `now` (Unix seconds).
    pub fn loot(&mut self, username: &str, now: f64) -> Result<LootReport, CommandError> {
        let username = normalize_username(username).ok_or(CommandError::InvalidUsername)?;
        self.ledger.reload_if_changed();

        let cooldown = self.scheduler.rush_hour().loot_cooldown(
            self.config.cooldowns.loot_secs,
            self.config.cooldowns.rush_hour_divisor,
        );
        let record = self
            .ledger
            .get_or_create(&username)
            .ok_or(CommandError::InvalidUsername)?;
        let elapsed = now - record.last_loot_time;
        if elapsed < cooldown {
            let remaining = (cooldown - elapsed).ceil().max(1.0) as u64;
            debug!(user = %username, remaining, "loot on cooldown");
            return Err(CommandError::LootCooldown {
                username,
                remaining,
            });
        }

        let old_rank = self.config.rank_title(record.score).to_string();
        let luck = record.luck;
        record.luck = 0.0;
        record.last_loot_time = now;
        let roll = rarity::resolve(luck, &self.config.loot, &self.config.items, &mut self.rng);
        if roll.rarity == Rarity::Shiny {
            record.shinies = record.shinies.saturating_add(1);
        }

        let mut points = roll.points;
        let bounty_satisfied = self.scheduler.bounty_hunter_mut().try_satisfy(&roll.item);
        if bounty_satisfied {
            points = points.saturating_add(self.config.loot.bounty_bonus);
            info!(user = %username, item = %roll.item, "bounty hunter satisfied");
        }

        let others = self.ledger.others(&username);
        let thief = rarity::roll_thief(&self.config.loot, &others, &mut self.rng);
        let beneficiary = thief.as_deref().unwrap_or(&username);
        if let Some(record) = self.ledger.get_mut(beneficiary) {
            record.credit(points);
        }

        let drive = self.scheduler.loot_drive_mut().record(&username);
        if let DriveProgress::Completed { participants, .. } = &drive {
            for participant in participants {
                if let Some(record) = self.ledger.get_mut(participant) {
                    record.prestige_stars = record.prestige_stars.saturating_add(1);
                }
            }
            info!(participants = participants.len(), "loot drive completed");
        }

        let score = self
            .ledger
            .get(&username)
            .map(|record| record.score)
            .unwrap_or_default();
        let rank = self.config.rank_title(score).to_string();
        let ranked_up = rank != old_rank;
        self.persist();

        let outcome = LootOutcome {
            rarity: roll.rarity,
            item: roll.item,
            is_legendary: roll.is_legendary,
            points,
            stolen: thief.is_some(),
            thief,
        };
        info!(
            user = %username,
            item = %outcome.item,
            rarity = outcome.rarity.as_str(),
            legendary = outcome.is_legendary,
            points,
            stolen = outcome.stolen,
            "loot resolved"
        );

        let reply = self.loot_reply(&username, &outcome, &rank, score, ranked_up, bounty_satisfied, &drive);
        let trigger_explosion = ranked_up
            || matches!(outcome.rarity, Rarity::Shiny | Rarity::Golden)
            || outcome.is_legendary
            || bounty_satisfied;
        let overlay = OverlayEvent::Loot {
            user: username,
            rank: rank.clone(),
            score,
            item: outcome.item.clone(),
            is_legendary: outcome.is_legendary,
            rarity: outcome.rarity,
            trigger_explosion,
            ranked_up,
            show_banner: self.show_banner,
        };

        Ok(LootReport {
            outcome,
            reply,
            overlay,
            rank,
            score,
            ranked_up,
            bounty_satisfied,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn loot_reply(
        &self,
        username: &str,
        outcome: &LootOutcome,
        rank: &str,
        score: u64,
        ranked_up: bool,
        bounty_satisfied: bool,
        drive: &DriveProgress,
    ) -> String {
        let messages = &self.config.messages;
        let template = if outcome.stolen {
            &messages.loot_stolen
        } else {
            match outcome.rarity {
                Rarity::Ruined => &messages.loot_ruined,
                Rarity::Shiny => &messages.loot_shiny,
                Rarity::Golden => &messages.loot_golden,
                Rarity::Standard if outcome.is_legendary => &messages.loot_legendary,
                Rarity::Standard => &messages.loot_success,
            }
        };
        let mut reply = render(
            template,
            &[
                ("username", username.to_string()),
                ("item", format_item_name(&outcome.item)),
                ("points", outcome.points.to_string()),
                ("rank", rank.to_string()),
                ("score", score.to_string()),
                ("thief", outcome.thief.clone().unwrap_or_default()),
            ],
        );

        if bounty_satisfied {
            reply.push(' ');
            reply.push_str(&render(
                &messages.bounty_hunter_satisfied,
                &[
                    ("username", username.to_string()),
                    ("points", self.config.loot.bounty_bonus.to_string()),
                ],
            ));
        }

        let drive_name = &self.config.events.loot_drive_name;
        match drive {
            DriveProgress::Completed { .. } => reply.push_str(&format!(
                " 🍪 {drive_name} COMPLETE! All participants get a Prestige Star! ⭐"
            )),
            DriveProgress::Counted { current, target } => {
                let every = self.config.event_settings.loot_drive_progress_every;
                if every > 0 && current % every == 0 {
                    reply.push_str(&format!(" ({drive_name}: {current}/{target})"));
                }
            }
            DriveProgress::Inactive => {}
        }

        if ranked_up && !outcome.stolen {
            reply.push(' ');
            reply.push_str(&render(
                &messages.rank_up,
                &[("username", username.to_string()), ("rank", rank.to_string())],
            ));
        }
        reply
    }

    /// Convert points into luck for the next loot.
    ///
    /// `amount` is the raw argument after the trigger; a missing amount means 1.
    pub fn use_points(
        &mut self,
        username: &str,
        amount: Option<&str>,
        now: f64,
    ) -> Result<String, CommandError> {
        let username = normalize_username(username).ok_or(CommandError::InvalidUsername)?;
        let amount = match amount.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| CommandError::InvalidAmount {
                    username: username.clone(),
                })?,
        };
        if amount < 1 {
            return Err(CommandError::InvalidAmount { username });
        }
        let amount = amount as u64;

        self.ledger.reload_if_changed();
        let use_secs = self.config.cooldowns.use_secs;
        let luck_per_point = self.config.loot.luck_per_point;
        let Some(record) = self.ledger.get_mut(&username) else {
            return Err(CommandError::UnknownPlayer { username });
        };

        let elapsed = now - record.last_use_time;
        if elapsed < use_secs {
            let remaining = (use_secs - elapsed).ceil().max(1.0) as u64;
            return Err(CommandError::UseCooldown {
                username,
                remaining,
            });
        }
        if !record.try_debit(amount) {
            return Err(CommandError::InsufficientScore {
                username,
                score: record.score,
                needed: amount,
            });
        }
        let added = amount as f64 * luck_per_point;
        record.luck += added;
        record.last_use_time = now;
        let total = record.luck;
        self.persist();
        info!(user = %username, amount, luck = total, "points used");

        Ok(render(
            &self.config.messages.use_success,
            &[
                ("username", username),
                ("amount", amount.to_string()),
                ("added", added.to_string()),
                ("total", total.to_string()),
            ],
        ))
    }

    /// Enter the running contest.
    pub fn join_contest(&mut self, username: &str) -> Result<String, CommandError> {
        let username = normalize_username(username).ok_or(CommandError::InvalidUsername)?;
        self.ledger.reload_if_changed();

        let contest = self.scheduler.contest();
        if contest.phase() != chatcollect_types::ContestPhase::Joining {
            return Err(CommandError::ContestNotJoinable);
        }
        if contest.has_joined(&username) {
            return Err(CommandError::AlreadyJoined { username });
        }
        let Some(record) = self.ledger.get_mut(&username) else {
            return Err(CommandError::UnknownPlayer { username });
        };
        let pool = match self.scheduler.contest_mut().join(record) {
            Ok(pool) => pool,
            Err(JoinError::NotJoining) => return Err(CommandError::ContestNotJoinable),
            Err(JoinError::AlreadyJoined) => return Err(CommandError::AlreadyJoined { username }),
            Err(JoinError::InsufficientScore { cost }) => {
                return Err(CommandError::EntryTooLow { username, cost })
            }
        };
        self.persist();
        info!(user = %username, pool, "contest joined");

        Ok(render(
            &self.config.messages.contest_joined,
            &[
                ("username", username),
                ("contest", self.config.events.contest_name.clone()),
                ("pool", pool.to_string()),
            ],
        ))
    }

    /// Top `limit` players by score; equal scores keep username order.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardRow> {
        self.ledger
            .by_score()
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, record)| LeaderboardRow {
                rank: index + 1,
                username: record.username.clone(),
                score: record.score,
                shinies: record.shinies,
            })
            .collect()
    }

    /// Chat rendering of the leaderboard.
    pub fn leaderboard_reply(&self) -> String {
        let rows = self.leaderboard(self.config.leaderboard.chat_size);
        if rows.is_empty() {
            return "No collectors yet.".to_string();
        }
        rows.iter()
            .map(|row| {
                let medal = MEDALS
                    .get(row.rank - 1)
                    .map(|medal| medal.to_string())
                    .unwrap_or_else(|| format!("{}.", row.rank));
                let badge = if row.shinies > 0 { "💎" } else { "" };
                format!(
                    "{medal} {}{badge} ({}) - {}",
                    row.username,
                    self.config.rank_title(row.score),
                    row.score
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Leaderboard snapshot for overlays; `show = false` hides it.
    pub fn leaderboard_overlay(&self, show: bool) -> OverlayEvent {
        OverlayEvent::LeaderboardUpdate {
            show,
            data: self.leaderboard(self.config.leaderboard.overlay_size),
        }
    }

    /// Operator start. Returns the chat announcement, or `None` if the event was already running.
    pub fn start_event(&mut self, kind: EventKind, minutes: Option<f64>, now: f64) -> Option<String> {
        let settings = &self.config.event_settings;
        let names = &self.config.events;
        let messages = &self.config.messages;
        let default_minutes = match kind {
            EventKind::RushHour => settings.rush_hour_minutes,
            EventKind::LootDrive => settings.loot_drive_minutes,
            EventKind::BountyHunter => settings.bounty_hunter_minutes,
            EventKind::Contest => settings.contest_minutes,
        };
        let minutes = minutes
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .unwrap_or(default_minutes);
        let duration = minutes * 60.0;

        let announcement = match kind {
            EventKind::RushHour => self.scheduler.rush_hour_mut().start(now, duration).then(|| {
                render(
                    &messages.rush_hour_start,
                    &[
                        ("name", names.rush_hour_name.clone()),
                        ("minutes", minutes.to_string()),
                    ],
                )
            }),
            EventKind::LootDrive => {
                let target = settings.loot_drive_target;
                self.scheduler
                    .loot_drive_mut()
                    .start(now, duration, target)
                    .then(|| {
                        render(
                            &messages.loot_drive_start,
                            &[
                                ("name", names.loot_drive_name.clone()),
                                ("target", target.to_string()),
                                ("minutes", minutes.to_string()),
                            ],
                        )
                    })
            }
            EventKind::BountyHunter => {
                if self.scheduler.bounty_hunter().is_active() {
                    None
                } else {
                    let item = choose(&self.config.items.normal, &mut self.rng)
                        .cloned()
                        .unwrap_or_else(|| chatcollect_types::loot::FALLBACK_ITEMS[0].to_string());
                    let display = format_item_name(&item);
                    self.scheduler
                        .bounty_hunter_mut()
                        .start(now, duration, item)
                        .then(|| {
                            render(
                                &messages.bounty_hunter_spawn,
                                &[("name", names.bounty_hunter_name.clone()), ("item", display)],
                            )
                        })
                }
            }
            EventKind::Contest => self
                .scheduler
                .contest_mut()
                .start(now, duration, ContestSettings::from(settings))
                .then(|| {
                    render(
                        &messages.contest_start,
                        &[
                            ("name", names.contest_name.clone()),
                            ("command", self.config.commands.contest.clone()),
                            ("cost", settings.contest_entry_cost.to_string()),
                        ],
                    )
                }),
        };

        match &announcement {
            Some(_) => info!(event = ?kind, minutes, "event started"),
            None => warn!(event = ?kind, "event already active"),
        }
        announcement
    }

    /// Operator stop. Returns the chat announcement, or `None` if the event was not running.
    ///
    /// Stopping a contest refunds every participant; stopping a loot drive awards nothing.
    pub fn stop_event(&mut self, kind: EventKind) -> Option<String> {
        let names = &self.config.events;
        let announcement = match kind {
            EventKind::RushHour => self
                .scheduler
                .rush_hour_mut()
                .stop()
                .then(|| format!("🛑 The {} has been stopped manually.", names.rush_hour_name)),
            EventKind::LootDrive => self
                .scheduler
                .loot_drive_mut()
                .stop()
                .map(|_| format!("🛑 The {} has been stopped manually.", names.loot_drive_name)),
            EventKind::BountyHunter => self
                .scheduler
                .bounty_hunter_mut()
                .stop()
                .then(|| format!("🛑 The {} has left the chat.", names.bounty_hunter_name)),
            EventKind::Contest => {
                let refund = self.scheduler.contest().settings().refund;
                let contest_name = names.contest_name.clone();
                match self.scheduler.contest_mut().stop() {
                    None => None,
                    Some(refunds) if refunds.is_empty() => {
                        Some(format!("🛑 The {contest_name} has been stopped manually."))
                    }
                    Some(refunds) => {
                        self.ledger.reload_if_changed();
                        for participant in &refunds {
                            match self.ledger.get_mut(participant) {
                                Some(record) => record.credit(refund),
                                None => warn!(user = %participant, "refund skipped; player left the ledger"),
                            }
                        }
                        self.persist();
                        info!(participants = refunds.len(), refund, "contest refunded");
                        Some(format!(
                            "🛑 The {contest_name} has been stopped manually. Points refunded."
                        ))
                    }
                }
            }
        };
        if announcement.is_some() {
            info!(event = ?kind, "event stopped");
        }
        announcement
    }

    /// Advance every event timer and apply contest payouts.
    pub fn tick(&mut self, now: f64) -> TickReport {
        let notices = self.scheduler.tick(now, &mut self.rng);
        let mut announcements = Vec::with_capacity(notices.len());
        for notice in notices {
            if let Some(text) = self.apply_notice(notice) {
                announcements.push(text);
            }
        }
        TickReport {
            announcements,
            status: self.scheduler.status(now),
            next_interval: self.scheduler.next_interval(&self.config.ticks),
        }
    }

    fn apply_notice(&mut self, notice: EventNotice) -> Option<String> {
        let names = &self.config.events;
        let text = match notice {
            EventNotice::RushHourEnded => {
                info!("rush hour ended");
                format!(
                    "🛑 The {} has ended! Cooldowns are back to normal.",
                    names.rush_hour_name
                )
            }
            EventNotice::LootDriveFailed { current, target } => {
                info!(current, target, "loot drive failed");
                format!(
                    "😞 The {} ended! We only collected {current}/{target}. No stars awarded.",
                    names.loot_drive_name
                )
            }
            EventNotice::BountyHunterLeft => {
                info!("bounty hunter left");
                format!(
                    "😒 The {} got tired of waiting and left!",
                    names.bounty_hunter_name
                )
            }
            EventNotice::Contest(ContestNotice::Reminder { remaining_secs }) => format!(
                "⚠️ {} entries closing in {}! Join now!",
                names.contest_name,
                format_remaining(remaining_secs)
            ),
            EventNotice::Contest(ContestNotice::Cancelled) => {
                info!("contest cancelled");
                format!("😞 {} cancelled! No one joined.", names.contest_name)
            }
            EventNotice::Contest(ContestNotice::EntriesClosed {
                participants,
                pool,
                resolve_delay_secs,
            }) => {
                info!(entries = participants.len(), pool, "contest entries closed");
                format!(
                    "🥊 {} Entries Closed! Participants: {}. Winner chosen in {resolve_delay_secs}s! Pool: {pool} pts",
                    names.contest_name,
                    participants.join(", ")
                )
            }
            EventNotice::Contest(ContestNotice::Winner { username, prize }) => {
                let text = render(
                    &self.config.messages.contest_winner,
                    &[("username", username.clone()), ("prize", prize.to_string())],
                );
                self.ledger.reload_if_changed();
                match self.ledger.get_mut(&username) {
                    Some(record) => record.credit(prize),
                    None => warn!(user = %username, prize, "prize withheld; winner left the ledger"),
                }
                self.persist();
                info!(user = %username, prize, "contest won");
                text
            }
        };
        Some(text)
    }

    pub fn status(&self, now: f64) -> EventStatus {
        self.scheduler.status(now)
    }

    fn persist(&mut self) {
        if let Err(err) = self.ledger.save() {
            warn!(error = %err, "ledger save failed; in-memory state kept");
        }
    }
}
