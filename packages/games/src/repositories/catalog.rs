use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::duel::DuelEntity;
use crate::repositories::errors::catalog_errors::CatalogError;

/// Clubs needed to fill three rows and three columns.
pub const CLUBS_PER_GRID: usize = 6;

const CLUB_PAIR_SEPARATOR: char = '↔';
const SURNAME_FIELD: &str = "Игрок";

const CLUB_ALIASES: [(&str, &str); 3] = [
    ("пари сен-жермен", "псж"),
    ("бавария мюнхен", "бавария"),
    ("манчестер сити", "ман сити"),
];

pub fn normalize_club_name(raw: &str) -> String {
    let mut name = raw.trim().to_lowercase();
    for (long, short) in CLUB_ALIASES {
        name = name.replace(long, short);
    }
    name
}

/// Club name to the set of player surnames who played for it.
#[derive(Debug, Clone, Default)]
pub struct ClubCatalog {
    members: BTreeMap<String, BTreeSet<String>>,
}

impl ClubCatalog {
    pub fn empty() -> Self {
        ClubCatalog::default()
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        info!(
            clubs = catalog.members.len(),
            path = %path.display(),
            "Loaded club catalog"
        );
        Ok(catalog)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(raw)?;
        let pairs = value
            .as_object()
            .ok_or_else(|| CatalogError::Parse("club catalog must be a JSON object".to_string()))?;

        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (pair_key, players) in pairs {
            let Some((left, right)) = pair_key.split_once(CLUB_PAIR_SEPARATOR) else {
                warn!(key = %pair_key, "Skipping malformed club pair key");
                continue;
            };
            let (left, right) = (normalize_club_name(left), normalize_club_name(right));
            if left.is_empty() || right.is_empty() {
                warn!(key = %pair_key, "Skipping club pair with an empty club name");
                continue;
            }
            let Some(players) = players.as_array() else {
                warn!(key = %pair_key, "Skipping club pair whose value is not a list");
                continue;
            };
            for entry in players {
                let surname = entry
                    .get(SURNAME_FIELD)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_lowercase())
                    .unwrap_or_default();
                if surname.is_empty() {
                    warn!(key = %pair_key, "Skipping player entry without a surname");
                    continue;
                }
                members.entry(left.clone()).or_default().insert(surname.clone());
                members.entry(right.clone()).or_default().insert(surname);
            }
        }

        Ok(ClubCatalog { members })
    }

    pub fn from_members(members: HashMap<String, Vec<String>>) -> Self {
        let members = members
            .into_iter()
            .map(|(club, players)| {
                let players: BTreeSet<String> = players
                    .iter()
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect();
                (normalize_club_name(&club), players)
            })
            .filter(|(_, players)| !players.is_empty())
            .collect();
        ClubCatalog { members }
    }

    /// Club names in sorted order.
    pub fn clubs(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    pub fn members(&self, club: &str) -> Option<&BTreeSet<String>> {
        self.members.get(club)
    }

    /// Surnames shared by both clubs. Empty when either club is unknown.
    pub fn intersection(&self, row_club: &str, col_club: &str) -> Vec<String> {
        match (self.members.get(row_club), self.members.get(col_club)) {
            (Some(a), Some(b)) => a.intersection(b).cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.members.len() >= CLUBS_PER_GRID
    }

    /// Six distinct clubs: the first three label rows, the rest label columns.
    pub fn pick_grid<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(Vec<String>, Vec<String>), CatalogError> {
        if !self.is_available() {
            return Err(CatalogError::Insufficient(format!(
                "need {} clubs, have {}",
                CLUBS_PER_GRID,
                self.members.len()
            )));
        }
        let mut clubs = self.clubs();
        clubs.shuffle(rng);
        clubs.truncate(CLUBS_PER_GRID);
        let cols = clubs.split_off(CLUBS_PER_GRID / 2);
        Ok((clubs, cols))
    }
}

/// Flattened pool of duel answers.
#[derive(Debug, Clone, Default)]
pub struct DuelPool {
    entities: Vec<DuelEntity>,
}

impl DuelPool {
    pub fn empty() -> Self {
        DuelPool::default()
    }

    pub fn new(entities: Vec<DuelEntity>) -> Self {
        DuelPool { entities }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let pool = Self::from_json_str(&raw)?;
        info!(entities = pool.len(), path = %path.display(), "Loaded duel pool");
        Ok(pool)
    }

    /// Parses `{ "<level>": [entity, ...], ... }` and flattens the levels.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let levels: BTreeMap<String, Vec<DuelEntity>> = serde_json::from_str(raw)?;
        let entities = levels.into_values().flatten().collect();
        Ok(DuelPool { entities })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Draws `count` distinct entities without replacement.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<DuelEntity>, CatalogError> {
        if count == 0 || self.entities.len() < count {
            return Err(CatalogError::Insufficient(format!(
                "need {} duel answers, have {}",
                count,
                self.entities.len()
            )));
        }
        Ok(self
            .entities
            .choose_multiple(rng, count)
            .cloned()
            .collect())
    }
}
