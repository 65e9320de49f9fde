//! Record of corpus quotes already spent by a translation session.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, warn};

use bard_core::Result;

/// Reference key to the word-index strings already used from that line.
#[derive(Debug, Clone)]
pub struct UsedMap {
    dir: PathBuf,
    translation_id: String,
    entries: HashMap<String, BTreeSet<String>>,
}

impl UsedMap {
    pub fn new(dir: impl Into<PathBuf>, translation_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            translation_id: translation_id.into(),
            entries: HashMap::new(),
        }
    }

    /// Load the session's map; a missing or unreadable file starts empty.
    pub fn load(dir: impl Into<PathBuf>, translation_id: impl Into<String>) -> Self {
        let mut map = Self::new(dir, translation_id);
        let path = map.path();
        if !path.exists() {
            return map;
        }

        let parsed = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<HashMap<String, Vec<String>>>(&content).ok());
        match parsed {
            Some(entries) => {
                map.entries = entries
                    .into_iter()
                    .map(|(key, indices)| (key, indices.into_iter().collect()))
                    .collect();
                debug!("Loaded used map with {} references from {:?}", map.entries.len(), path);
            }
            None => warn!("Used map at {:?} is unreadable, starting fresh", path),
        }
        map
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}_used_map.json", self.translation_id))
    }

    pub fn translation_id(&self) -> &str {
        &self.translation_id
    }

    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let serializable: HashMap<&String, Vec<&String>> =
            self.entries.iter().map(|(k, v)| (k, v.iter().collect())).collect();
        std::fs::write(self.path(), serde_json::to_string_pretty(&serializable)?)?;
        Ok(())
    }

    /// Mark a word range of a line as used.
    pub fn mark_used(&mut self, reference_key: &str, indices: &[usize]) {
        self.mark_used_index(reference_key, join_indices(indices));
    }

    /// Mark a raw word-index string (e.g. `"0,4"`) as used.
    pub fn mark_used_index(&mut self, reference_key: &str, index: impl Into<String>) {
        self.entries
            .entry(reference_key.to_string())
            .or_default()
            .insert(index.into());
    }

    pub fn was_used(&self, reference_key: &str, indices: &[usize]) -> bool {
        self.entries
            .get(reference_key)
            .map(|used| used.contains(&join_indices(indices)))
            .unwrap_or(false)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &HashMap<String, BTreeSet<String>> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `[3, 4, 5]` becomes `"3,4,5"`.
pub fn join_indices(indices: &[usize]) -> String {
    indices.iter().map(usize::to_string).collect::<Vec<_>>().join(",")
}
