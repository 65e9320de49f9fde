//! Combining generated scenes into a whole play and exporting single scenes.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use bard_core::{BardError, Result};
use bard_translate::roman::act_to_int;
use bard_translate::scene_file::extract_act_scene_from_filename;

use crate::project::ProjectManager;
use crate::scene_stem;

pub const COMBINED_PLAY_FILE: &str = "modern_play_combined.md";

const GENERATED_SCENES_DIR: &str = "generated_scenes";

pub struct ExportManager<'a> {
    projects: &'a ProjectManager,
}

impl<'a> ExportManager<'a> {
    pub fn new(projects: &'a ProjectManager) -> Self {
        Self { projects }
    }

    /// Combine `{base_dir}/generated_scenes/*.md` into one file in `base_dir`.
    pub fn combine_scenes(&self, base_dir: &Path, output_filename: Option<&str>) -> Result<PathBuf> {
        let scenes_dir = base_dir.join(GENERATED_SCENES_DIR);
        let combined = combine_dir(&scenes_dir, String::new())?;

        let output = base_dir.join(output_filename.unwrap_or(COMBINED_PLAY_FILE));
        std::fs::write(&output, combined)?;
        info!("Combined play saved to {:?}", output);
        Ok(output)
    }

    /// Combine a project's scenes under a `# {title}` heading into
    /// `{project}/{output_filename}`, by default `{title}_full.md`.
    pub fn combine_scenes_in_project(&self, project_id: &str, output_filename: Option<&str>) -> Result<PathBuf> {
        let title = self
            .projects
            .load(project_id)
            .map(|p| p.title)
            .unwrap_or_else(|_| "Play".to_string());
        let combined = combine_dir(&self.projects.scenes_dir(project_id), format!("# {}\n\n", title))?;

        let filename = match output_filename {
            Some(name) => name.to_string(),
            None => format!("{}_full.md", title.replace(['/', '\\'], "_")),
        };
        let output = self.projects.project_dir(project_id).join(filename);
        std::fs::write(&output, combined)?;
        info!("Combined project {} saved to {:?}", project_id, output);
        Ok(output)
    }

    /// Copy one scene's Markdown into `{project}/exports/`.
    pub fn export_scene(&self, project_id: &str, act: &str, scene: &str) -> Result<PathBuf> {
        let name = format!("{}.md", scene_stem(act, scene));
        let source = self.projects.scenes_dir(project_id).join(&name);
        if !source.exists() {
            return Err(BardError::not_found("Scene file", source.display().to_string()));
        }

        let exports = self.projects.project_dir(project_id).join("exports");
        std::fs::create_dir_all(&exports)?;
        let target = exports.join(name);
        std::fs::copy(&source, &target)?;
        Ok(target)
    }
}

/// `header` followed by every `.md` scene in `dir`, trimmed, in act and
/// scene order, each followed by a blank line.
fn combine_dir(dir: &Path, header: String) -> Result<String> {
    if !dir.is_dir() {
        return Err(BardError::not_found("Scenes directory", dir.display().to_string()));
    }

    let mut files: Vec<(u32, u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let (act, scene) = extract_act_scene_from_filename(&path);
        files.push((act_to_int(&act), act_to_int(&scene), path));
    }
    if files.is_empty() {
        return Err(BardError::not_found("Scene files", dir.display().to_string()));
    }
    files.sort();

    let mut combined = header;
    for (_, _, path) in &files {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                combined.push_str(text.trim());
                combined.push_str("\n\n");
            }
            Err(e) => error!("Error reading scene file {:?}: {}", path, e),
        }
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::CharacterVoices;

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_combine_project_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let projects = ProjectManager::new(dir.path()).unwrap();
        let id = projects.create("The Silent Engine", "", CharacterVoices::new()).unwrap();
        let scenes = projects.scenes_dir(&id);
        write(&scenes, "act_ii_scene_1.md", "ACT II\n\nSCENE 1\n\nThird.\n");
        write(&scenes, "act_i_scene_2.md", "ACT I\n\nSCENE 2\n\nSecond.");
        write(&scenes, "act_i_scene_1.md", "\nACT I\n\nSCENE 1\n\nFirst.");
        write(&scenes, "act_i_scene_1.json", "{}");

        let path = ExportManager::new(&projects).combine_scenes_in_project(&id, None).unwrap();
        assert_eq!(path.file_name().unwrap(), "The Silent Engine_full.md");

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("# The Silent Engine\n\nACT I\n\nSCENE 1\n\nFirst.\n\n"));
        let first = text.find("First.").unwrap();
        let second = text.find("Second.").unwrap();
        let third = text.find("Third.").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_combine_generated_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let projects = ProjectManager::new(dir.path().join("projects")).unwrap();
        write(&dir.path().join("generated_scenes"), "act_iv_scene_1.md", "Four.");
        write(&dir.path().join("generated_scenes"), "act_iii_scene_1.md", "Three.");

        let path = ExportManager::new(&projects).combine_scenes(dir.path(), None).unwrap();
        assert_eq!(path, dir.path().join(COMBINED_PLAY_FILE));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Three.\n\nFour.\n\n");
    }

    #[test]
    fn test_combine_without_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let projects = ProjectManager::new(dir.path()).unwrap();
        let id = projects.create("Empty", "", CharacterVoices::new()).unwrap();
        let err = ExportManager::new(&projects).combine_scenes_in_project(&id, None).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_export_scene() {
        let dir = tempfile::tempdir().unwrap();
        let projects = ProjectManager::new(dir.path()).unwrap();
        let id = projects.create("Export", "", CharacterVoices::new()).unwrap();
        write(&projects.scenes_dir(&id), "act_i_scene_1.md", "First.");

        let exporter = ExportManager::new(&projects);
        let path = exporter.export_scene(&id, "I", "1").unwrap();
        assert_eq!(path, projects.project_dir(&id).join("exports").join("act_i_scene_1.md"));
        assert!(exporter.export_scene(&id, "I", "9").is_err());
    }
}
