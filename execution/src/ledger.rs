//! Player ledger backed by a hand-editable text file.
//!
//! One record per line:
//!
//! ```text
//! username | score | last_loot_time | luck | last_use_time | prestige_stars | shinies
//! ```
//!
//! Lines starting with `#` and blank lines are ignored. Only the first three fields are
//! required; missing trailing fields default to zero. A line with fewer than three fields or
//! an unparsable number is skipped with a warning.
//!
//! The file may be edited by hand while the bot runs. [`PlayerLedger::reload_if_changed`]
//! compares the file's modification time against the last one this ledger observed (its own
//! saves included) and reparses only when the file is newer. This is polling, not locking: an
//! external write racing a save resolves last-write-wins.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use chatcollect_types::{normalize_username, PlayerRecord};
use thiserror::Error;
use tracing::{debug, info, warn};

const HEADER: &str = "# ChatCollect Player Database - Edit with Notepad\n\
# Format: username | loot_score | last_loot_time | luck | last_use_time | prestige_stars | shinies\n\
# WARNING: Keep the | separators intact!\n\n";

const MIN_FIELDS: usize = 3;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("ledger {path} was unreadable and has been archived to {archive}")]
    Corrupt { path: String, archive: String },
}

fn io_error(path: &Path, source: io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// In-memory map of player records plus the file it mirrors.
///
/// Records are kept in a `BTreeMap` so every ordering derived from the ledger (the saved file,
/// leaderboards, theft candidates) is deterministic.
#[derive(Debug)]
pub struct PlayerLedger {
    path: PathBuf,
    players: BTreeMap<String, PlayerRecord>,
    last_seen: Option<SystemTime>,
}

impl PlayerLedger {
    /// Open the ledger at `path`, loading it if it exists.
    ///
    /// Load failures are logged and leave the ledger empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut ledger = Self {
            path: path.into(),
            players: BTreeMap::new(),
            last_seen: None,
        };
        match ledger.load() {
            Ok(count) => info!(path = %ledger.path.display(), players = count, "ledger loaded"),
            Err(err) => warn!(error = %err, "ledger load failed; starting empty"),
        }
        ledger
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory map with the file contents.
    ///
    /// A missing file yields an empty ledger. A file that cannot be decoded as text is moved
    /// aside and the ledger starts empty. Other read failures leave the map untouched.
    pub fn load(&mut self) -> Result<usize, LedgerError> {
        let modified = match fs::metadata(&self.path) {
            Ok(meta) => meta.modified().ok(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.players.clear();
                self.last_seen = None;
                return Ok(0);
            }
            Err(err) => return Err(io_error(&self.path, err)),
        };

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                let archive = self.archive()?;
                self.players.clear();
                self.last_seen = None;
                return Err(LedgerError::Corrupt {
                    path: self.path.display().to_string(),
                    archive: archive.display().to_string(),
                });
            }
            Err(err) => return Err(io_error(&self.path, err)),
        };

        self.players = parse(&raw);
        self.last_seen = modified;
        Ok(self.players.len())
    }

    /// Reparse the file if it was modified since the last load or save.
    ///
    /// Returns whether a reparse happened.
    pub fn reload_if_changed(&mut self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        if self.last_seen.is_some_and(|seen| modified <= seen) {
            return false;
        }
        match self.load() {
            Ok(count) => {
                info!(players = count, "ledger changed on disk; reloaded");
                true
            }
            Err(err) => {
                warn!(error = %err, "ledger reload failed");
                false
            }
        }
    }

    /// Write the full ledger, sorted by score descending, through a temporary file.
    pub fn save(&mut self) -> Result<(), LedgerError> {
        let tmp = self.sibling("tmp");
        let mut file = fs::File::create(&tmp).map_err(|err| io_error(&tmp, err))?;
        file.write_all(self.render().as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|err| io_error(&tmp, err))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|err| io_error(&self.path, err))?;

        self.last_seen = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();
        debug!(players = self.players.len(), "ledger saved");
        Ok(())
    }

    /// Serialised file contents.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for record in self.by_score() {
            out.push_str(&format_line(record));
            out.push('\n');
        }
        out
    }

    pub fn get(&self, username: &str) -> Option<&PlayerRecord> {
        self.players.get(&normalize_username(username)?)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut PlayerRecord> {
        self.players.get_mut(&normalize_username(username)?)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.get(username).is_some()
    }

    /// Existing record, or a zero-valued one inserted on first reference.
    ///
    /// Returns `None` without inserting when `username` cannot be stored in the file.
    pub fn get_or_create(&mut self, username: &str) -> Option<&mut PlayerRecord> {
        let key = normalize_username(username)?;
        Some(
            self.players
                .entry(key.clone())
                .or_insert_with(|| PlayerRecord::new(key)),
        )
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Usernames other than `username`, in key order.
    pub fn others(&self, username: &str) -> Vec<String> {
        let key = normalize_username(username);
        self.players
            .keys()
            .filter(|name| key.as_deref() != Some(name.as_str()))
            .cloned()
            .collect()
    }

    /// Records by score descending. Equal scores keep username order.
    pub fn by_score(&self) -> Vec<&PlayerRecord> {
        let mut records: Vec<&PlayerRecord> = self.players.values().collect();
        records.sort_by(|a, b| b.score.cmp(&a.score));
        records
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn archive(&self) -> Result<PathBuf, LedgerError> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let archive = self.sibling(&format!("corrupt-{stamp}"));
        fs::rename(&self.path, &archive).map_err(|err| io_error(&self.path, err))?;
        warn!(archive = %archive.display(), "archived unreadable ledger");
        Ok(archive)
    }
}

fn parse(raw: &str) -> BTreeMap<String, PlayerRecord> {
    let mut players = BTreeMap::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Some(record) => {
                players.insert(record.username.clone(), record);
            }
            None => warn!(line = index + 1, "skipping malformed ledger line"),
        }
    }
    players
}

fn parse_line(line: &str) -> Option<PlayerRecord> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }
    let username = normalize_username(fields[0])?;

    let mut record = PlayerRecord::new(username);
    record.score = fields[1].parse::<i64>().ok()?.max(0) as u64;
    record.last_loot_time = parse_float(fields[2])?;
    record.luck = optional(&fields, 3, parse_float)?.max(0.0);
    record.last_use_time = optional(&fields, 4, parse_float)?;
    record.prestige_stars = optional(&fields, 5, |raw| raw.parse::<u32>().ok())?;
    record.shinies = optional(&fields, 6, |raw| raw.parse::<u32>().ok())?;
    Some(record)
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Absent or empty fields take the default; present fields must parse.
fn optional<T: Default>(
    fields: &[&str],
    index: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    match fields.get(index) {
        None => Some(T::default()),
        Some(raw) if raw.is_empty() => Some(T::default()),
        Some(raw) => parse(*raw),
    }
}

fn format_line(record: &PlayerRecord) -> String {
    format!(
        "{} | {} | {:?} | {:?} | {:?} | {} | {}",
        record.username,
        record.score,
        record.last_loot_time,
        record.luck,
        record.last_use_time,
        record.prestige_stars,
        record.shinies
    )
}
