use std::fs;
use std::path::Path;

use crate::predict::element_set::{parse_catalog, ElementSet};
use crate::predict::error::PredictError;

/// Element sets loaded from a catalog feed, kept in feed order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<ElementSet>,
}

impl Catalog {
    pub fn from_entries(entries: Vec<ElementSet>) -> Self {
        Self { entries }
    }

    pub fn parse(content: &str) -> Self {
        Self::from_entries(parse_catalog(content))
    }

    /// Loads a single feed file, or every `.tle`/`.txt` file in a directory.
    pub fn load(path: &Path) -> Result<Self, PredictError> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, PredictError> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::parse(&content);
        log::info!(
            "Loaded {} element sets from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn load_dir(dir: &Path) -> Result<Self, PredictError> {
        if !dir.exists() {
            return Err(PredictError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("TLE directory not found: {}", dir.display()),
            )));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_feed = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if path.is_file() && is_feed {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let parsed = parse_catalog(&content);
                    if parsed.is_empty() {
                        log::warn!("No element sets found in {}", path.display());
                    }
                    entries.extend(parsed);
                }
                Err(e) => {
                    log::warn!("Failed to read TLE file {}: {}", path.display(), e);
                }
            }
        }

        log::info!(
            "Loaded {} element sets from {}",
            entries.len(),
            dir.display()
        );
        Ok(Self::from_entries(entries))
    }

    /// Case-insensitive substring match on names; a numeric query also
    /// matches the catalog number exactly. First match in feed order wins.
    pub fn find(&self, query: &str) -> Result<&ElementSet, PredictError> {
        let needle = query.trim().to_lowercase();
        let not_found = || PredictError::ElementSetNotFound {
            query: query.to_string(),
        };
        if needle.is_empty() {
            return Err(not_found());
        }

        let numeric = needle.chars().all(|c| c.is_ascii_digit());
        self.entries
            .iter()
            .find(|set| {
                set.name.to_lowercase().contains(&needle)
                    || (numeric
                        && set
                            .catalog_number()
                            .is_some_and(|n| n.trim_start_matches('0') == needle.trim_start_matches('0')))
            })
            .ok_or_else(not_found)
    }

    pub fn entries(&self) -> &[ElementSet] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
