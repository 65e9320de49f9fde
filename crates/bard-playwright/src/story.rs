//! Scene summaries in, structured scene outlines out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info};

use bard_core::{BardError, ChatModel, ChatRequest, Provider, Result};
use bard_llm::extract::strip_code_fences;

use crate::{load_json, save_json};

const ANTHROPIC_MAX_TOKENS: u32 = 2048;

const OPENAI_SYSTEM_PROMPT: &str = "You are a literary scene development assistant for a modern Shakespeare-inspired play. \
Your role is to expand scene summaries into fully structured dramatic outlines, deeply rooted in the play's central themes.";

const DEFAULT_THEMATIC_GUIDELINES: &str =
    "Global thematic instructions provided by the client. Ensure all scenes reflect these themes consistently.";

/// Character name to a description of how they speak.
pub type CharacterVoices = BTreeMap<String, String>;

/// What the author says should happen in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    #[serde(deserialize_with = "label")]
    pub act: String,
    #[serde(deserialize_with = "label")]
    pub scene: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub additional_instructions: String,
}

impl SceneSummary {
    pub fn new(act: impl Into<String>, scene: impl Into<String>, overview: impl Into<String>) -> Self {
        Self {
            act: act.into(),
            scene: scene.into(),
            overview: overview.into(),
            setting: String::new(),
            characters: Vec::new(),
            additional_instructions: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSummaries {
    #[serde(default)]
    pub scenes: Vec<SceneSummary>,
}

impl SceneSummaries {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path, "Scene summaries")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }
}

/// A scene outline as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedScene {
    #[serde(default, deserialize_with = "label")]
    pub act: String,
    #[serde(default, deserialize_with = "label")]
    pub scene: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub voice_primers: BTreeMap<String, String>,
    #[serde(default)]
    pub dramatic_functions: Vec<String>,
    #[serde(default)]
    pub beats: Vec<String>,
    #[serde(default)]
    pub onstage_events: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandedStory {
    #[serde(default)]
    pub scenes: Vec<ExpandedScene>,
}

impl ExpandedStory {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path, "Expanded story")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }
}

/// Acts and scenes are labels, but models write `"scene": 2` as often as
/// `"scene": "2"`.
fn label<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected an act or scene label, got {}", other))),
    }
}

pub struct StoryExpander {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    thematic_guidelines: String,
}

impl StoryExpander {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self {
            model,
            temperature,
            thematic_guidelines: DEFAULT_THEMATIC_GUIDELINES.to_string(),
        }
    }

    /// Replace the generic guidelines; blank text keeps them.
    pub fn with_thematic_guidelines(mut self, guidelines: &str) -> Self {
        if !guidelines.trim().is_empty() {
            self.thematic_guidelines = guidelines.trim().to_string();
        }
        self
    }

    pub fn thematic_guidelines(&self) -> &str {
        &self.thematic_guidelines
    }

    pub fn build_prompt(&self, scene: &SceneSummary, voices: &CharacterVoices) -> String {
        let voice_descriptions = voices
            .iter()
            .map(|(name, desc)| format!("{}: {}", name, desc))
            .collect::<Vec<_>>()
            .join("\n");
        let setting = non_blank(&scene.setting, "Provide a rich, suitable setting.");
        let instructions = non_blank(&scene.additional_instructions, "None");

        format!(
            "You are expanding detailed scene summaries into structured scene descriptions for a modern play styled like Shakespeare's Macbeth, but using contemporary American English.

Scene Overview:
{overview}

Thematic Guidelines:
{guidelines}

Characters and their voice styles:
{voices}

Setting:
{setting}

Characters present:
{characters}

Additional Instructions:
{instructions}

Provide detailed expansions for this scene including:
- Rich setting description
- 3 to 5 clear dramatic beats directly based on the scene overview
- Dramatic function tags (e.g., #DIALOGUE_TURN, #SOLILOQUY)
- Specific onstage events (entrances, exits, notable actions)
- Voice primers for each character present

Output JSON strictly formatted as:
{{
  \"act\": \"{act}\",
  \"scene\": \"{scene}\",
  \"setting\": \"...\",
  \"characters\": [\"...\"],
  \"voice_primers\": {{\"Character\": \"Primer\"}},
  \"dramatic_functions\": [\"#...\"],
  \"beats\": [\"...\"],
  \"onstage_events\": [\"...\"]
}}",
            overview = scene.overview,
            guidelines = self.thematic_guidelines,
            voices = voice_descriptions,
            setting = setting,
            characters = scene.characters.join(", "),
            instructions = instructions,
            act = scene.act,
            scene = scene.scene,
        )
    }

    /// Expand one scene; a reply that is not a JSON outline is an error.
    pub async fn expand_scene(&self, scene: &SceneSummary, voices: &CharacterVoices) -> Result<ExpandedScene> {
        info!("Expanding Act {}, Scene {}", scene.act, scene.scene);

        let mut request = ChatRequest::new(self.build_prompt(scene, voices), ANTHROPIC_MAX_TOKENS, self.temperature);
        if self.model.provider() == Provider::OpenAi {
            request = request.with_system(OPENAI_SYSTEM_PROMPT);
        }
        let reply = self.model.complete(&request).await?;

        let mut expanded: ExpandedScene = serde_json::from_str(&strip_code_fences(&reply)).map_err(|e| {
            error!("Failed to parse expanded scene JSON: {}", e);
            BardError::llm(
                self.model.provider().as_str(),
                format!("Failed to expand scene {}.{}: {}", scene.act, scene.scene, e),
            )
        })?;
        if expanded.act.is_empty() {
            expanded.act = scene.act.clone();
        }
        if expanded.scene.is_empty() {
            expanded.scene = scene.scene.clone();
        }
        Ok(expanded)
    }

    /// Expand every scene in order; the first failure aborts the run.
    pub async fn expand_all(&self, summaries: &SceneSummaries, voices: &CharacterVoices) -> Result<ExpandedStory> {
        info!("Starting scene expansion of {} scenes", summaries.scenes.len());
        let mut story = ExpandedStory::default();
        for scene in &summaries.scenes {
            story.scenes.push(self.expand_scene(scene, voices).await?);
        }
        Ok(story)
    }

    /// File-to-file form of [`expand_all`](Self::expand_all).
    pub async fn expand_files(&self, summaries_path: &Path, voices_path: &Path, output_path: &Path) -> Result<PathBuf> {
        let summaries = SceneSummaries::load(summaries_path)?;
        let voices: CharacterVoices = load_json(voices_path, "Character voices")?;

        let story = self.expand_all(&summaries, &voices).await?;
        story.save(output_path)?;
        info!("Expanded scenes saved to {:?}", output_path);
        Ok(output_path.to_path_buf())
    }
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
