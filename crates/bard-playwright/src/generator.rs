//! Drives scenes from summaries to finished scripts, for projects and for
//! the ad hoc working directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use bard_core::{BardError, ChatModel, PlaywrightConfig, Result};

use crate::adjuster::ArtisticAdjuster;
use crate::export::ExportManager;
use crate::project::ProjectManager;
use crate::story::{ExpandedStory, SceneSummaries, StoryExpander};
use crate::writer::{SceneLength, SceneWriter};
use crate::{save_json, scene_stem, unique_name};

const EXPANDED_STORY_FILE: &str = "expanded_story.json";

/// A scene written for a project.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScene {
    pub content: String,
    pub path: PathBuf,
}

pub struct SceneGenerator {
    model: Arc<dyn ChatModel>,
    config: PlaywrightConfig,
    projects: ProjectManager,
}

impl SceneGenerator {
    pub fn new(model: Arc<dyn ChatModel>, config: PlaywrightConfig) -> Result<Self> {
        let projects = ProjectManager::new(&config.projects_dir)?;
        std::fs::create_dir_all(config.base_output_dir.join("generated_scenes"))?;
        Ok(Self { model, config, projects })
    }

    pub fn projects(&self) -> &ProjectManager {
        &self.projects
    }

    pub fn exporter(&self) -> ExportManager<'_> {
        ExportManager::new(&self.projects)
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Length from the configured `length_option`.
    pub fn default_length(&self) -> SceneLength {
        SceneLength::from_option(&self.config.length_option)
    }

    pub fn expanded_story_path(&self) -> PathBuf {
        self.config.base_output_dir.join(EXPANDED_STORY_FILE)
    }

    pub fn generated_scenes_dir(&self) -> PathBuf {
        self.config.base_output_dir.join("generated_scenes")
    }

    fn expander(&self, guidelines: &str) -> StoryExpander {
        StoryExpander::new(self.model.clone(), self.config.temperature).with_thematic_guidelines(guidelines)
    }

    fn writer(&self, length: SceneLength) -> SceneWriter {
        SceneWriter::new(self.model.clone(), self.config.temperature, length)
    }

    /// Expand summary and voice files into the working directory's story.
    pub async fn expand_story(&self, summaries_path: &Path, voices_path: &Path) -> Result<PathBuf> {
        self.expander("")
            .expand_files(summaries_path, voices_path, &self.expanded_story_path())
            .await
    }

    /// Write every scene of the working directory's story into
    /// `generated_scenes`; returns that directory.
    pub async fn generate_scenes(&self, length: SceneLength) -> Result<PathBuf> {
        let story = ExpandedStory::load(&self.expanded_story_path())?;
        let dir = self.generated_scenes_dir();
        self.writer(length).generate_scenes(&story, &dir).await;
        Ok(dir)
    }

    /// Revise a scene; revisions land in `final_edits` unless `output_dir` is given.
    pub async fn adjust_scene(&self, scene_path: &Path, critique: &str, output_dir: Option<&Path>) -> Result<String> {
        let default_dir = self.config.base_output_dir.join("final_edits");
        let dir = output_dir.unwrap_or(default_dir.as_path());
        ArtisticAdjuster::new(self.model.clone(), self.config.temperature)
            .revise_scene(scene_path, critique, Some(dir))
            .await
    }

    /// Expand and write one scene of a project. The summaries, voices and
    /// outline used are kept under `generation_sessions/session_*`.
    pub async fn generate_project_scene(
        &self,
        project_id: &str,
        act: &str,
        scene: &str,
        length: SceneLength,
    ) -> Result<GeneratedScene> {
        let project = self.projects.require(project_id)?;
        let summary = project
            .find_scene(act, scene)
            .cloned()
            .ok_or_else(|| BardError::not_found("Scene", format!("{}.{} in project {}", act, scene, project_id)))?;

        let sessions_dir = self.projects.project_dir(project_id).join("generation_sessions");
        let session_dir = sessions_dir.join(unique_name(&sessions_dir, "session"));
        std::fs::create_dir_all(&session_dir)?;

        let summaries = SceneSummaries { scenes: vec![summary] };
        summaries.save(&session_dir.join("scene_summaries.json"))?;
        save_json(&session_dir.join("character_voices.json"), &project.character_voices)?;

        let story = self
            .expander(&project.thematic_guidelines)
            .expand_all(&summaries, &project.character_voices)
            .await?;
        story.save(&session_dir.join(EXPANDED_STORY_FILE))?;

        let scenes_dir = self.projects.scenes_dir(project_id);
        let writer = self.writer(length);
        for expanded in &story.scenes {
            // written under the project's labels so the file can be found again
            let mut expanded = expanded.clone();
            expanded.act = act.to_string();
            expanded.scene = scene.to_string();
            writer.write_scene(&expanded, &scenes_dir).await?;
        }

        let path = scenes_dir.join(format!("{}.md", scene_stem(act, scene)));
        if !path.exists() {
            return Err(BardError::not_found("Generated scene file", path.display().to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        info!("Generated scene {}.{} of project {}", act, scene, project_id);
        Ok(GeneratedScene { content, path })
    }

    /// Generate every scene of a project and combine them into
    /// `{title}_full.md`. A scene that fails is logged and left out.
    pub async fn generate_full_project(&self, project_id: &str, length: SceneLength) -> Result<PathBuf> {
        let project = self.projects.require(project_id)?;
        if project.scenes.is_empty() {
            return Err(BardError::invalid_argument("No scenes defined in project"));
        }

        for scene in &project.scenes {
            if let Err(e) = self.generate_project_scene(project_id, &scene.act, &scene.scene, length).await {
                error!("Failed to generate scene {}.{}: {}", scene.act, scene.scene, e);
            }
        }

        self.exporter().combine_scenes_in_project(project_id, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{CharacterVoices, SceneSummary};
    use bard_core::Provider;
    use bard_llm::ScriptedModel;

    fn outline(scene: u32) -> String {
        format!(
            r##"{{"act": "I", "scene": {scene}, "setting": "A lab", "characters": ["EDGAR"],
                "voice_primers": {{"EDGAR": "Soft"}}, "dramatic_functions": ["#SOLILOQUY"],
                "beats": ["Edgar alone"], "onstage_events": []}}"##
        )
    }

    fn generator(dir: &Path, model: Arc<ScriptedModel>) -> SceneGenerator {
        let config = PlaywrightConfig {
            projects_dir: dir.join("play_projects"),
            base_output_dir: dir.join("modern_play"),
            ..PlaywrightConfig::default()
        };
        SceneGenerator::new(model, config).unwrap()
    }

    fn project_with_scenes(generator: &SceneGenerator, scenes: &[&str]) -> String {
        let voices: CharacterVoices = [("EDGAR".to_string(), "Soft".to_string())].into_iter().collect();
        let id = generator.projects().create("Quiet Hours", "The price of silence", voices).unwrap();
        for scene in scenes {
            let mut summary = SceneSummary::new("I", *scene, "Edgar keeps a secret.");
            summary.characters = vec!["EDGAR".to_string()];
            generator.projects().add_scene(&id, summary).unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_generate_project_scene() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::with_replies(
            Provider::Anthropic,
            [outline(1), "EDGAR\nI will say nothing.".to_string()],
        ));
        let generator = generator(dir.path(), model.clone());
        let id = project_with_scenes(&generator, &["1"]);

        let generated = generator
            .generate_project_scene(&id, "I", "1", SceneLength::Short)
            .await
            .unwrap();
        assert_eq!(generated.path, generator.projects().scenes_dir(&id).join("act_i_scene_1.md"));
        assert_eq!(generated.content, "ACT I\n\nSCENE 1\n\nEDGAR\nI will say nothing.");

        // the project's own guidelines reach the expander
        assert!(model.requests()[0].prompt.contains("The price of silence"));

        let sessions = generator.projects().project_dir(&id).join("generation_sessions");
        let session = std::fs::read_dir(&sessions).unwrap().next().unwrap().unwrap().path();
        assert!(session.join("scene_summaries.json").exists());
        assert!(session.join("character_voices.json").exists());
        assert!(session.join("expanded_story.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_scene() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), Arc::new(ScriptedModel::new(Provider::Anthropic)));
        let id = project_with_scenes(&generator, &["1"]);
        let err = generator
            .generate_project_scene(&id, "II", "1", SceneLength::Medium)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_generate_full_project_skips_failed_scene() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(Provider::Anthropic));
        model.push_reply(outline(1));
        model.push_reply("EDGAR\nFirst.");
        model.push_reply("not an outline");

        let generator = generator(dir.path(), model);
        let id = project_with_scenes(&generator, &["1", "2"]);

        let path = generator.generate_full_project(&id, SceneLength::Medium).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "Quiet Hours_full.md");
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("# Quiet Hours\n\nACT I\n\nSCENE 1\n\nEDGAR\nFirst."));
        assert!(!text.contains("SCENE 2"));
    }

    #[tokio::test]
    async fn test_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path(), Arc::new(ScriptedModel::new(Provider::Anthropic)));
        let id = project_with_scenes(&generator, &[]);
        let err = generator.generate_full_project(&id, SceneLength::Medium).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_working_directory_flow() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::with_replies(
            Provider::Anthropic,
            [outline(3), "EDGAR\nThird.".to_string(), "EDGAR\nThird, revised.".to_string()],
        ));
        let generator = generator(dir.path(), model);

        let summaries = dir.path().join("scene_summaries.json");
        let voices = dir.path().join("character_voices.json");
        SceneSummaries {
            scenes: vec![SceneSummary::new("I", "3", "Edgar confesses.")],
        }
        .save(&summaries)
        .unwrap();
        std::fs::write(&voices, r#"{"EDGAR": "Soft"}"#).unwrap();

        generator.expand_story(&summaries, &voices).await.unwrap();
        let scenes = generator.generate_scenes(SceneLength::Long).await.unwrap();
        let scene = scenes.join("act_i_scene_3.md");
        assert!(scene.exists());

        let revised = generator.adjust_scene(&scene, "More remorse.", None).await.unwrap();
        assert_eq!(revised, "EDGAR\nThird, revised.");
        assert!(dir.path().join("modern_play/final_edits/act_i_scene_3_v2.md").exists());

        let combined = generator.exporter().combine_scenes(&dir.path().join("modern_play"), None).unwrap();
        assert!(std::fs::read_to_string(combined).unwrap().contains("Third."));
    }
}
