//! Operator console on stdin.
//!
//! ```text
//! start <rush|drive|bounty|contest> [minutes]
//! stop <rush|drive|bounty|contest>
//! banner <on|off>
//! leaderboard [hide]
//! status
//! help
//! ```

use chatcollect_execution::EventKind;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::actor::{Mailbox, MailboxClosed};

const HELP: &str = "commands: start <rush|drive|bounty|contest> [minutes] | stop <event> | banner <on|off> | leaderboard [hide] | status | help";

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    Start {
        kind: EventKind,
        minutes: Option<f64>,
    },
    Stop(EventKind),
    Banner(bool),
    Leaderboard { show: bool },
    Status,
    Help,
}

fn parse_kind(word: Option<&str>) -> Result<EventKind, String> {
    match word.map(str::to_ascii_lowercase).as_deref() {
        Some("rush" | "rush_hour" | "rushhour") => Ok(EventKind::RushHour),
        Some("drive" | "loot_drive" | "lootdrive") => Ok(EventKind::LootDrive),
        Some("bounty" | "bounty_hunter" | "bountyhunter") => Ok(EventKind::BountyHunter),
        Some("contest") => Ok(EventKind::Contest),
        Some(other) => Err(format!("unknown event: {other}")),
        None => Err("missing event name".to_string()),
    }
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| "empty command".to_string())?
            .to_ascii_lowercase();
        let command = match verb.as_str() {
            "start" => {
                let kind = parse_kind(words.next())?;
                let minutes = match words.next() {
                    Some(raw) => {
                        let minutes: f64 = raw
                            .parse()
                            .map_err(|_| format!("invalid minutes: {raw}"))?;
                        if !minutes.is_finite() || minutes <= 0.0 {
                            return Err(format!("invalid minutes: {raw}"));
                        }
                        Some(minutes)
                    }
                    None => None,
                };
                ConsoleCommand::Start { kind, minutes }
            }
            "stop" => ConsoleCommand::Stop(parse_kind(words.next())?),
            "banner" => match words.next().map(str::to_ascii_lowercase).as_deref() {
                Some("on") => ConsoleCommand::Banner(true),
                Some("off") => ConsoleCommand::Banner(false),
                _ => return Err("usage: banner <on|off>".to_string()),
            },
            "leaderboard" => match words.next() {
                None => ConsoleCommand::Leaderboard { show: true },
                Some(word) if word.eq_ignore_ascii_case("hide") => {
                    ConsoleCommand::Leaderboard { show: false }
                }
                Some(other) => return Err(format!("unexpected argument: {other}")),
            },
            "status" => ConsoleCommand::Status,
            "help" => ConsoleCommand::Help,
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(command)
    }

    /// Apply the command and describe the result for the operator.
    pub async fn execute(self, mailbox: &Mailbox) -> Result<String, MailboxClosed> {
        let output = match self {
            ConsoleCommand::Start { kind, minutes } => mailbox
                .start_event(kind, minutes)
                .await?
                .unwrap_or_else(|| format!("{kind:?} is already running")),
            ConsoleCommand::Stop(kind) => mailbox
                .stop_event(kind)
                .await?
                .unwrap_or_else(|| format!("{kind:?} is not running")),
            ConsoleCommand::Banner(show) => {
                mailbox.set_banner(show).await;
                format!("banner {}", if show { "on" } else { "off" })
            }
            ConsoleCommand::Leaderboard { show } => {
                let rows = mailbox.leaderboard(show).await?;
                format!("leaderboard pushed ({} rows, show={show})", rows.len())
            }
            ConsoleCommand::Status => {
                let status = mailbox.status().await?;
                serde_json::to_string(&status).unwrap_or_else(|err| err.to_string())
            }
            ConsoleCommand::Help => HELP.to_string(),
        };
        Ok(output)
    }
}

/// Read operator commands from stdin until EOF or the engine goes away.
pub async fn run(mailbox: Mailbox) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(?err, "console read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match ConsoleCommand::parse(&line) {
            Ok(command) => match command.execute(&mailbox).await {
                Ok(output) => info!("{output}"),
                Err(err) => {
                    warn!(%err, "console stopping");
                    break;
                }
            },
            Err(reason) => warn!("{reason}; {HELP}"),
        }
    }
    info!("console closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{actor::Actor, broadcaster::Broadcaster};
    use chatcollect_execution::{mocks::ScriptedRng, GameEngine, PlayerLedger};
    use chatcollect_types::GameConfig;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("start rush"),
            Ok(ConsoleCommand::Start {
                kind: EventKind::RushHour,
                minutes: None
            })
        );
        assert_eq!(
            ConsoleCommand::parse("START Contest 3.5"),
            Ok(ConsoleCommand::Start {
                kind: EventKind::Contest,
                minutes: Some(3.5)
            })
        );
        assert_eq!(
            ConsoleCommand::parse("stop bounty"),
            Ok(ConsoleCommand::Stop(EventKind::BountyHunter))
        );
        assert_eq!(
            ConsoleCommand::parse("banner off"),
            Ok(ConsoleCommand::Banner(false))
        );
        assert_eq!(
            ConsoleCommand::parse("leaderboard hide"),
            Ok(ConsoleCommand::Leaderboard { show: false })
        );
        assert_eq!(ConsoleCommand::parse("status"), Ok(ConsoleCommand::Status));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("").is_err());
        assert!(ConsoleCommand::parse("start").is_err());
        assert!(ConsoleCommand::parse("start party").is_err());
        assert!(ConsoleCommand::parse("start rush soon").is_err());
        assert!(ConsoleCommand::parse("start rush -2").is_err());
        assert!(ConsoleCommand::parse("banner maybe").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_execute_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PlayerLedger::open(dir.path().join("players.txt"));
        let engine = GameEngine::new(GameConfig::default(), ledger, ScriptedRng::new());
        let (outbox, _outbox_rx) = mpsc::channel(16);
        let mailbox = Actor::new(engine, Broadcaster::new(), outbox).spawn(16);

        let output = ConsoleCommand::parse("start rush")
            .unwrap()
            .execute(&mailbox)
            .await
            .unwrap();
        assert_eq!(output, "🚀 RUSH HOUR STARTED! Faster looting for 2 minutes!");

        let output = ConsoleCommand::parse("start rush")
            .unwrap()
            .execute(&mailbox)
            .await
            .unwrap();
        assert_eq!(output, "RushHour is already running");

        let output = ConsoleCommand::parse("stop drive")
            .unwrap()
            .execute(&mailbox)
            .await
            .unwrap();
        assert_eq!(output, "LootDrive is not running");
    }
}
