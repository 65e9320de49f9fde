//! Play projects: one directory per play with `project.json` and `scenes/`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use bard_core::{BardError, Result};

use crate::story::{CharacterVoices, SceneSummary};
use crate::{load_json, now_iso, save_json, unique_name};

const PROJECT_FILE: &str = "project.json";
const SCENES_DIR: &str = "scenes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub thematic_guidelines: String,
    #[serde(default)]
    pub character_voices: CharacterVoices,
    #[serde(default)]
    pub scenes: Vec<SceneSummary>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn untitled() -> String {
    "Untitled".to_string()
}

impl Project {
    pub fn find_scene(&self, act: &str, scene: &str) -> Option<&SceneSummary> {
        self.scenes.iter().find(|s| s.act == act && s.scene == scene)
    }
}

/// Listing entry for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub scenes: usize,
    pub characters: usize,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ProjectManager {
    projects_dir: PathBuf,
}

impl ProjectManager {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Result<Self> {
        let projects_dir = projects_dir.into();
        std::fs::create_dir_all(&projects_dir)?;
        Ok(Self { projects_dir })
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(project_id)
    }

    pub fn scenes_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(SCENES_DIR)
    }

    /// Create a project and return its id, `project_{YYYYmmdd_HHMMSS}`; a
    /// numeric suffix is added when that second is already taken.
    pub fn create(&self, title: &str, thematic_guidelines: &str, character_voices: CharacterVoices) -> Result<String> {
        let project_id = unique_name(&self.projects_dir, "project");
        std::fs::create_dir_all(self.scenes_dir(&project_id))?;

        let now = now_iso();
        let mut project = Project {
            title: title.to_string(),
            thematic_guidelines: thematic_guidelines.to_string(),
            character_voices,
            scenes: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.save(&project_id, &mut project)?;

        info!("Created new play project: {} (ID: {})", title, project_id);
        Ok(project_id)
    }

    pub fn load(&self, project_id: &str) -> Result<Project> {
        load_json(&self.project_dir(project_id).join(PROJECT_FILE), "Project")
    }

    /// Write the project, stamping `updated_at`.
    pub fn save(&self, project_id: &str, project: &mut Project) -> Result<()> {
        project.updated_at = now_iso();
        save_json(&self.project_dir(project_id).join(PROJECT_FILE), project)
    }

    /// Add a scene definition, replacing one with the same act and scene.
    pub fn add_scene(&self, project_id: &str, scene: SceneSummary) -> Result<()> {
        let mut project = self.require(project_id)?;
        let (act, scene_no) = (scene.act.clone(), scene.scene.clone());

        match project.scenes.iter_mut().find(|s| s.act == act && s.scene == scene_no) {
            Some(existing) => *existing = scene,
            None => project.scenes.push(scene),
        }
        self.save(project_id, &mut project)?;

        info!("Added scene {}.{} to project {}", act, scene_no, project_id);
        Ok(())
    }

    /// All projects, most recently updated first. Unreadable projects are
    /// logged and left out.
    pub fn list(&self) -> Result<Vec<ProjectSummary>> {
        let mut projects = Vec::new();
        if !self.projects_dir.exists() {
            return Ok(projects);
        }

        for entry in std::fs::read_dir(&self.projects_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !path.join(PROJECT_FILE).exists() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load(&id) {
                Ok(project) => projects.push(ProjectSummary {
                    scenes: project.scenes.len(),
                    characters: project.character_voices.len(),
                    title: project.title,
                    created_at: project.created_at,
                    updated_at: project.updated_at,
                    id,
                }),
                Err(e) => error!("Error loading project {}: {}", id, e),
            }
        }

        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// Remove a project directory; `false` when there was none.
    pub fn delete(&self, project_id: &str) -> Result<bool> {
        let dir = self.project_dir(project_id);
        if project_id.is_empty() || !dir.exists() {
            error!("Project not found: {}", project_id);
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        info!("Deleted project: {}", project_id);
        Ok(true)
    }

    pub(crate) fn require(&self, project_id: &str) -> Result<Project> {
        self.load(project_id).map_err(|e| match e {
            BardError::NotFound { .. } => BardError::not_found("Project", project_id),
            other => other,
        })
    }
}
