//! Writes translated scenes as JSON and a Markdown preview table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bard_core::{Result, TranslatedLine};

use crate::now_iso;

/// A translated line as written to disk, with display references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLine {
    #[serde(flatten)]
    pub line: TranslatedLine,
    #[serde(default)]
    pub formatted_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub timestamp: String,
    pub total_lines: usize,
    pub has_original_lines: bool,
}

/// Contents of `act_{act}_scene_{scene}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub act: String,
    pub scene: String,
    pub metadata: SceneMetadata,
    pub translated_lines: Vec<SavedLine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub original_lines: Vec<String>,
}

impl SceneDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `act_{act}_scene_{scene}` with the act lowercased and underscores trimmed.
pub fn scene_id(act: &str, scene: &str) -> String {
    format!("act_{}_scene_{}", act.to_lowercase().trim_matches('_'), scene)
}

pub struct SceneSaver {
    output_dir: PathBuf,
    checkpoint_interval: usize,
}

impl SceneSaver {
    pub fn new(output_dir: impl Into<PathBuf>, checkpoint_interval: usize) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            checkpoint_interval: checkpoint_interval.max(1),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn json_path(&self, act: &str, scene: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", scene_id(act, scene)))
    }

    pub fn markdown_path(&self, act: &str, scene: &str) -> PathBuf {
        self.output_dir.join(format!("{}.md", scene_id(act, scene)))
    }

    /// Save a scene, rewriting both files every `checkpoint_interval` lines
    /// and once more at the end. `original_lines` is padded or cut to match.
    pub fn save_scene(
        &self,
        act: &str,
        scene: &str,
        translated: &[TranslatedLine],
        original_lines: Option<&[String]>,
    ) -> Result<PathBuf> {
        let json_path = self.json_path(act, scene);
        let md_path = self.markdown_path(act, scene);

        let mut originals: Vec<String> = match original_lines {
            Some(lines) => lines.to_vec(),
            None => translated.iter().map(|l| l.original_modern_line.clone()).collect(),
        };
        originals.resize(translated.len(), String::new());

        let saved: Vec<SavedLine> = translated
            .iter()
            .zip(&originals)
            .map(|(line, original)| {
                let mut line = line.clone();
                if line.original_modern_line.is_empty() {
                    line.original_modern_line = original.clone();
                }
                let formatted_references = line.references.iter().map(|r| r.formatted()).collect();
                SavedLine { line, formatted_references }
            })
            .collect();

        for end in 1..=saved.len() {
            if end % self.checkpoint_interval == 0 || end == saved.len() {
                info!("Checkpoint: saving line {} of scene {}", end, scene_id(act, scene));
                let document = SceneDocument {
                    act: act.to_string(),
                    scene: scene.to_string(),
                    metadata: SceneMetadata {
                        timestamp: now_iso(),
                        total_lines: end,
                        has_original_lines: originals[..end].iter().any(|l| !l.is_empty()),
                    },
                    translated_lines: saved[..end].to_vec(),
                    original_lines: originals[..end].to_vec(),
                };
                std::fs::write(&json_path, serde_json::to_string_pretty(&document)?)?;
                std::fs::write(&md_path, render_markdown(act, scene, &saved[..end]))?;
                debug!("Saved {:?} and {:?}", json_path, md_path);
            }
        }

        Ok(json_path)
    }
}

fn table_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

/// Three-column preview table for one scene.
pub fn render_markdown(act: &str, scene: &str, lines: &[SavedLine]) -> String {
    let mut out = format!("# ACT {}\n\n## SCENE {}\n\n", act, scene);
    out.push_str("| Shakespearean Line | References | Modern Line |\n");
    out.push_str("|-------------------|------------|-------------|\n");
    for saved in lines {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            table_cell(&saved.line.text),
            table_cell(&saved.formatted_references.join(", ")),
            table_cell(&saved.line.original_modern_line)
        ));
    }
    out
}
