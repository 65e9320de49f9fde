//! bard-playwright - Writing new plays in a Shakespearean shape
//!
//! Scene summaries are expanded into structured outlines by a chat model,
//! the outlines are written out as scripts, and scripts can be revised
//! against a critique. Projects keep the summaries and generated scenes of
//! one play together on disk.

mod adjuster;
mod export;
mod generator;
mod project;
mod story;
mod writer;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use bard_core::{BardError, Result};

pub use adjuster::ArtisticAdjuster;
pub use export::{ExportManager, COMBINED_PLAY_FILE};
pub use generator::{GeneratedScene, SceneGenerator};
pub use project::{Project, ProjectManager, ProjectSummary};
pub use story::{CharacterVoices, ExpandedScene, ExpandedStory, SceneSummaries, SceneSummary, StoryExpander};
pub use writer::{SceneLength, SceneWriter};

/// File stem shared by generated scene files, e.g. `act_ii_scene_3`.
pub fn scene_stem(act: &str, scene: &str) -> String {
    format!("act_{}_scene_{}", act.to_lowercase(), scene.to_lowercase())
}

/// Local time in ISO 8601 with microseconds.
pub(crate) fn now_iso() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// `{prefix}_{YYYYmmdd_HHMMSS}`, with `_2`, `_3`... appended while that
/// name is taken in `parent`.
pub(crate) fn unique_name(parent: &Path, prefix: &str) -> String {
    let base = format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let mut name = base.clone();
    let mut n = 1;
    while parent.join(&name).exists() {
        n += 1;
        name = format!("{}_{}", base, n);
    }
    name
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
    if !path.exists() {
        return Err(BardError::not_found(kind, path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(BardError::invalid_argument(format!("{} file is empty: {}", kind, path.display())));
    }
    Ok(serde_json::from_str(&content)?)
}

pub(crate) fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
