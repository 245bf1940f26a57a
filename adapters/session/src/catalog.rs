use std::{fs, path::Path};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slot_volley_core::LevelSpec;
use tracing::{debug, info};

use crate::level::{LevelFile, LevelFileError};

/// What `next` does after the last level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndPolicy {
    /// Pick a random level other than the current one.
    #[default]
    Random,
    /// Start over from the first level.
    Loop,
    /// Stay on the last level.
    Clamp,
}

/// Named level ready to be loaded into a session.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    /// Display name.
    pub name: String,
    /// Validated level description.
    pub spec: LevelSpec,
}

/// Ordered level progression.
#[derive(Debug)]
pub struct LevelCatalog {
    entries: Vec<CatalogEntry>,
    current: usize,
    policy: EndPolicy,
    rng: ChaCha8Rng,
}

impl LevelCatalog {
    /// Creates a catalog positioned on the first entry.
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>, policy: EndPolicy, seed: u64) -> Self {
        Self {
            entries,
            current: 0,
            policy,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Loads every `*.toml` file of a directory, ordered by file name.
    pub fn from_dir(dir: &Path, policy: EndPolicy, seed: u64) -> Result<Self, LevelFileError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let file = LevelFile::read(&path)?;
            let spec = file.to_spec()?;
            let name = file.name.unwrap_or_default();
            debug!(name = %name, path = %path.display(), "level catalogued");
            entries.push(CatalogEntry { name, spec });
        }
        Ok(Self::new(entries, policy, seed))
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalog holds no level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current level.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Current level, if any.
    #[must_use]
    pub fn current(&self) -> Option<&CatalogEntry> {
        self.entries.get(self.current)
    }

    /// Moves to `index`, clamped into range.
    pub fn select(&mut self, index: usize) -> Option<&CatalogEntry> {
        self.current = index.min(self.entries.len().saturating_sub(1));
        self.current()
    }

    /// Returns the current level again.
    pub fn replay(&self) -> Option<&CatalogEntry> {
        self.current()
    }

    /// Moves one level back, stopping at the first.
    pub fn previous(&mut self) -> Option<&CatalogEntry> {
        self.select(self.current.saturating_sub(1))
    }

    /// Moves one level forward, applying the end policy past the last one.
    pub fn next(&mut self) -> Option<&CatalogEntry> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }

        let mut next = self.current + 1;
        if next >= len {
            info!(levels = len, policy = ?self.policy, "all levels completed");
            next = match self.policy {
                EndPolicy::Random => self.random_other(),
                EndPolicy::Loop => 0,
                EndPolicy::Clamp => len - 1,
            };
        }
        self.select(next)
    }

    fn random_other(&mut self) -> usize {
        let len = self.entries.len();
        if len <= 1 {
            return 0;
        }
        let pick = self.rng.gen_range(0..len);
        if pick == self.current {
            (pick + 1) % len
        } else {
            pick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::{BoardGeometry, BoardSpec, SupplySpec, WorldPoint};

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_owned(),
            spec: LevelSpec {
                board: BoardSpec {
                    columns: 1,
                    rows: 1,
                    cells: vec![vec![None]],
                    geometry: BoardGeometry::default(),
                },
                supply: SupplySpec {
                    columns: 1,
                    rows: 1,
                    cells: vec![vec![None]],
                    geometry: BoardGeometry::default(),
                },
                slots: vec![WorldPoint::default()],
            },
        }
    }

    fn catalog(policy: EndPolicy, count: usize) -> LevelCatalog {
        let entries = (0..count).map(|index| entry(&format!("level-{index}"))).collect();
        LevelCatalog::new(entries, policy, 7)
    }

    #[test]
    fn next_walks_in_order_then_loops() {
        let mut catalog = catalog(EndPolicy::Loop, 3);
        let names: Vec<String> = (0..4)
            .filter_map(|_| catalog.next().map(|entry| entry.name.clone()))
            .collect();
        assert_eq!(names, ["level-1", "level-2", "level-0", "level-1"]);
    }

    #[test]
    fn clamp_stays_on_the_last_level() {
        let mut catalog = catalog(EndPolicy::Clamp, 2);
        let _ = catalog.next();
        let _ = catalog.next();
        assert_eq!(catalog.current_index(), 1);
    }

    #[test]
    fn random_end_never_repeats_the_current_level() {
        for seed in 0..32 {
            let entries = (0..4).map(|index| entry(&format!("level-{index}"))).collect();
            let mut catalog = LevelCatalog::new(entries, EndPolicy::Random, seed);
            let _ = catalog.select(3);
            let _ = catalog.next();
            assert_ne!(catalog.current_index(), 3);
        }
    }

    #[test]
    fn random_end_is_reproducible_per_seed() {
        let picks = |seed| {
            let mut catalog = catalog(EndPolicy::Random, 5);
            catalog.rng = ChaCha8Rng::seed_from_u64(seed);
            (0..6)
                .map(|_| {
                    let _ = catalog.select(4);
                    catalog.next().map(|entry| entry.name.clone())
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(11), picks(11));
    }

    #[test]
    fn previous_stops_at_the_first_level() {
        let mut catalog = catalog(EndPolicy::Loop, 3);
        assert_eq!(catalog.previous().map(|entry| entry.name.as_str()), Some("level-0"));
        let _ = catalog.select(10);
        assert_eq!(catalog.current_index(), 2);
        assert_eq!(catalog.replay().map(|entry| entry.name.as_str()), Some("level-2"));
    }

    #[test]
    fn empty_catalog_has_nothing_to_offer() {
        let mut catalog = catalog(EndPolicy::Loop, 0);
        assert!(catalog.is_empty());
        assert!(catalog.next().is_none());
        assert!(catalog.previous().is_none());
    }
}
