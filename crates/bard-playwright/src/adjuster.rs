//! Minimal revisions of a written scene against a critique.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use bard_core::{BardError, ChatModel, ChatRequest, Provider, Result};

const ANTHROPIC_MAX_TOKENS: u32 = 3000;

const OPENAI_SYSTEM_PROMPT: &str = "You are a skilled script editor.";

pub struct ArtisticAdjuster {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl ArtisticAdjuster {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    pub fn build_prompt(script: &str, critique: &str) -> String {
        format!(
            "You are an artistic script adjuster. Your task is to minimally revise the following play scene to address a specific critique while preserving its structure, tone, and emotional arc. Do not rewrite the scene wholesale. Make only the changes required to satisfy the critique. Length and quality must be maintained.

Critique:
\"{critique}\"

Play Scene:
{script}

Please return the adjusted play scene in the same format, with stage directions and character names preserved. Only make necessary changes.
"
        )
    }

    pub async fn revise_text(&self, script: &str, critique: &str) -> Result<String> {
        let mut request = ChatRequest::new(Self::build_prompt(script, critique), ANTHROPIC_MAX_TOKENS, self.temperature);
        if self.model.provider() == Provider::OpenAi {
            request = request.with_system(OPENAI_SYSTEM_PROMPT);
        }
        Ok(self.model.complete(&request).await?.trim().to_string())
    }

    /// Revise the scene at `scene_path`. With an output directory the result
    /// is also written as `{stem}_v2.md` and `{stem}_v2.json`.
    pub async fn revise_scene(&self, scene_path: &Path, critique: &str, output_dir: Option<&Path>) -> Result<String> {
        if !scene_path.exists() {
            return Err(BardError::not_found("Scene file", scene_path.display().to_string()));
        }
        let script = std::fs::read_to_string(scene_path)?;
        let revised = self.revise_text(&script, critique).await?;

        if let Some(dir) = output_dir {
            std::fs::create_dir_all(dir)?;
            let stem = scene_path.file_stem().and_then(|s| s.to_str()).unwrap_or("scene");
            let md_path = dir.join(format!("{}_v2.md", stem));
            std::fs::write(&md_path, &revised)?;
            std::fs::write(
                dir.join(format!("{}_v2.json", stem)),
                serde_json::to_string_pretty(&json!({ "script": revised }))?,
            )?;
            info!("Revised scene saved to {:?}", md_path);
        }
        Ok(revised)
    }
}
