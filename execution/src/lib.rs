//! Chatcollect execution layer.
//!
//! This crate holds the game logic behind the chat bot: the persistent [`PlayerLedger`], rarity
//! resolution, the community [`EventScheduler`] and the [`GameEngine`] that runs commands
//! against them.
//!
//! ## Determinism requirements
//! - Never read the wall clock inside execution; every operation takes `now` in Unix seconds.
//! - Draw randomness only through [`LootRng`], so tests can script every roll.
//! - Avoid hash-ordered collections where iteration order reaches an output.
//!
//! ```rust,ignore
//! use chatcollect_execution::{GameEngine, PlayerLedger};
//! use chatcollect_types::GameConfig;
//!
//! let ledger = PlayerLedger::open("chatcollect_players.txt");
//! let mut engine = GameEngine::from_entropy(GameConfig::default(), ledger);
//! match engine.loot("alice", now) {
//!     Ok(report) => println!("{}", report.reply),
//!     Err(err) => {
//!         if let Some(reply) = err.reply(engine.config()) {
//!             println!("{reply}");
//!         }
//!     }
//! }
//! ```

pub mod engine;
pub mod events;
pub mod ledger;
pub mod rarity;
pub mod rng;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use engine::{CommandError, GameEngine, LootReport, TickReport};
pub use events::{EventKind, EventNotice, EventScheduler};
pub use ledger::{LedgerError, PlayerLedger};
pub use rng::LootRng;
