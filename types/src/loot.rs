use serde::{Deserialize, Serialize};

/// Items used when no normal pool is configured.
pub const FALLBACK_ITEMS: [&str; 3] = ["croissant.png", "donut.png", "Pancakes.png"];

/// Categorical tier of a loot roll. Orthogonal to the legendary-item flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Standard,
    Shiny,
    Ruined,
    Golden,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Standard => "standard",
            Rarity::Shiny => "shiny",
            Rarity::Ruined => "ruined",
            Rarity::Golden => "golden",
        }
    }
}

/// Result of one accepted loot command.
#[derive(Clone, Debug, PartialEq)]
pub struct LootOutcome {
    pub rarity: Rarity,
    pub item: String,
    pub is_legendary: bool,
    /// Points credited, including any bounty bonus.
    pub points: u64,
    pub stolen: bool,
    pub thief: Option<String>,
}

/// Normal and legendary item ids the resolver draws from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPools {
    pub normal: Vec<String>,
    pub legendary: Vec<String>,
}

impl Default for ItemPools {
    fn default() -> Self {
        Self {
            normal: FALLBACK_ITEMS.iter().map(|item| item.to_string()).collect(),
            legendary: Vec::new(),
        }
    }
}

impl ItemPools {
    pub fn new(normal: Vec<String>, legendary: Vec<String>) -> Self {
        Self { normal, legendary }.with_fallback()
    }

    /// Replace an empty normal pool with [`FALLBACK_ITEMS`].
    pub fn with_fallback(mut self) -> Self {
        if self.normal.is_empty() {
            self.normal = FALLBACK_ITEMS.iter().map(|item| item.to_string()).collect();
        }
        self
    }

    pub fn is_legendary(&self, item: &str) -> bool {
        self.legendary.iter().any(|candidate| candidate == item)
    }
}

/// Convert an item id such as `legendary/golden_croissant.png` into `Golden Croissant`.
pub fn format_item_name(item: &str) -> String {
    let file = item.rsplit(['/', '\\']).next().unwrap_or(item);
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };

    let lower = stem.to_lowercase();
    let stem = if ["legendary-", "legendary_", "legendary "]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        &stem[10..]
    } else {
        stem
    };

    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
