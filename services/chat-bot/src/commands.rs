//! Chat trigger parsing.

use chatcollect_types::CommandConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Loot,
    Leaderboard,
    JoinContest,
    /// Raw amount argument, if one was given.
    Use { amount: Option<String> },
}

/// Match the first word of `text` against the configured triggers, ignoring case.
pub fn parse(commands: &CommandConfig, text: &str) -> Option<ChatCommand> {
    let mut words = text.split_whitespace();
    let trigger = words.next()?.to_lowercase();
    let matches = |configured: &str| configured.trim().to_lowercase() == trigger;

    if matches(&commands.loot) {
        Some(ChatCommand::Loot)
    } else if matches(&commands.leaderboard) {
        Some(ChatCommand::Leaderboard)
    } else if matches(&commands.contest) {
        Some(ChatCommand::JoinContest)
    } else if matches(&commands.use_points) {
        Some(ChatCommand::Use {
            amount: words.next().map(str::to_string),
        })
    } else {
        None
    }
}
