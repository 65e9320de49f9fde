//! Scene outlines written out as scripts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use bard_core::{ChatModel, ChatRequest, Provider, Result};

use crate::scene_stem;
use crate::story::{ExpandedScene, ExpandedStory};

const ANTHROPIC_MAX_TOKENS: u32 = 4000;

const OPENAI_SYSTEM_PROMPT: &str = "You are a playwright assistant.";

/// Target amount of spoken text per scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SceneLength {
    /// `short` and `medium` by name; anything else is long.
    pub fn from_option(option: &str) -> Self {
        match option.trim().to_lowercase().as_str() {
            "short" => Self::Short,
            "medium" => Self::Medium,
            _ => Self::Long,
        }
    }

    /// Inclusive word range of spoken text.
    pub fn word_range(self) -> (u32, u32) {
        match self {
            Self::Short => (600, 800),
            Self::Medium => (900, 1100),
            Self::Long => (1200, 1500),
        }
    }
}

impl fmt::Display for SceneLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        })
    }
}

pub struct SceneWriter {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    length: SceneLength,
}

impl SceneWriter {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32, length: SceneLength) -> Self {
        let (min, max) = length.word_range();
        info!("Using length option: {} ({}-{} words)", length, min, max);
        Self {
            model,
            temperature,
            length,
        }
    }

    pub fn length(&self) -> SceneLength {
        self.length
    }

    pub fn build_prompt(&self, scene: &ExpandedScene) -> String {
        let (min_words, max_words) = self.length.word_range();
        let voice_primers = scene
            .voice_primers
            .iter()
            .map(|(name, desc)| format!("{}: {}", name, desc))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are writing dramatic dialog for a play inspired by Shakespeare's structure, but using **modern American English**.

All dialog must be grounded in the following themes: legacy vs mortality, logic without wisdom, the price of silence, power as isolation, and rewriting history. Let these ideas subtly shape tone, pacing, and conflict throughout each scene. Character voices and beats are provided. Maintain emotional resonance and moral complexity.

The setting is: {setting}

The characters in this scene are: {characters}

Use the following dramatic beats to guide the progression of dialog:
- {beats}

Dramatic tones and functions: {functions}

Voice guidelines:
{voice_primers}

Guidelines:
- Write dialog in the style and structure of Shakespeare (use poetic structure, rhythm, and dramatic arc), such as in MacBeth, but in **modern American English**
- Avoid archaic or Elizabethan vocabulary
- Favor poetic forms such as iambic pentameter and rhymed couplets at emotional or dramatic high points; elsewhere lean toward open verse
- Mix in shorter spoken lines and back and forth between characters where appropriate
- Use long, extended speeches, similar to Shakespeare, where a character's explanation of motives or plans is relevant
- Break long speeches into multiple lines, as Shakespeare would
- Include simple stage directions like [Mortimer enters], [Edgar aside], etc. Keep stage directions short and sparse.
- Each scene should contain **between {min_words} and {max_words} words of spoken text**, not counting character names or stage directions
- Return only the formatted play script

Here is an example of the output format:

[Enter CHARACTER NAME with attendants.]

CHARACTER NAME
I speak today about the subject,
Not just any subject,
But the one upon which I am speaking.

[Exit CHARACTER NAME]
",
            setting = scene.setting,
            characters = scene.characters.join(", "),
            beats = scene.beats.join("\n- "),
            functions = scene.dramatic_functions.join(", "),
            voice_primers = voice_primers,
            min_words = min_words,
            max_words = max_words,
        )
    }

    /// Write one scene as `{stem}.md` and `{stem}.json`; returns the Markdown path.
    pub async fn write_scene(&self, scene: &ExpandedScene, output_dir: &Path) -> Result<PathBuf> {
        let act = label_or_x(&scene.act);
        let scene_no = label_or_x(&scene.scene);
        info!("Generating Act {}, Scene {}", act, scene_no);

        let mut request = ChatRequest::new(self.build_prompt(scene), ANTHROPIC_MAX_TOKENS, self.temperature);
        if self.model.provider() == Provider::OpenAi {
            request = request.with_system(OPENAI_SYSTEM_PROMPT);
        }
        let dialog = self.model.complete(&request).await?.trim().to_string();

        std::fs::create_dir_all(output_dir)?;
        let stem = scene_stem(act, scene_no);
        let md_path = output_dir.join(format!("{}.md", stem));
        std::fs::write(&md_path, format!("ACT {}\n\nSCENE {}\n\n{}", act, scene_no, dialog))?;
        let script = json!({ "act": act, "scene": scene_no, "script": dialog });
        std::fs::write(output_dir.join(format!("{}.json", stem)), serde_json::to_string_pretty(&script)?)?;

        Ok(md_path)
    }

    /// Write every scene of the story; scenes that fail are logged and skipped.
    pub async fn generate_scenes(&self, story: &ExpandedStory, output_dir: &Path) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for scene in &story.scenes {
            match self.write_scene(scene, output_dir).await {
                Ok(path) => written.push(path),
                Err(e) => error!("Failed to generate scene {}.{}: {}", scene.act, scene.scene, e),
            }
        }
        info!("Wrote {} of {} scenes to {:?}", written.len(), story.scenes.len(), output_dir);
        written
    }
}

fn label_or_x(label: &str) -> &str {
    if label.is_empty() {
        "X"
    } else {
        label
    }
}
