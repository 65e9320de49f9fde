//! Asks the chat model to assemble a line from the offered quotes and checks
//! that the reply is made of whole quotes only.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use bard_chunk::text::alphanumeric_lower;
use bard_core::{ChatModel, ChatRequest, Level, Provider};
use bard_llm::extract::{extract_json_object, strip_code_fences};

use crate::selector::PromptOptions;

/// Most quotes a single assembled line may combine.
const MAX_QUOTES: usize = 3;

const ANTHROPIC_MAX_TOKENS: u32 = 1024;

const OPENAI_SYSTEM_PROMPT: &str = "You are a playwright assistant generating lines from source quotes.";

/// A line the model produced together with the options it consumed, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledLine {
    pub text: String,
    pub temp_ids: Vec<String>,
}

pub struct Assembler {
    model: Arc<dyn ChatModel>,
    temperature: f32,
    rng: StdRng,
}

impl Assembler {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32, seed: u64) -> Self {
        Self {
            model,
            temperature,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Try up to `max_retries + 1` times; each retry drops the last option of
    /// every form that has more than one and reshuffles the rest.
    pub async fn assemble_line(
        &mut self,
        modern_line: &str,
        options: &PromptOptions,
        target_syllables: u32,
        max_retries: usize,
    ) -> Option<AssembledLine> {
        info!("Beginning line assembly");
        let mut working = options.clone();

        for attempt in 0..=max_retries {
            if attempt > 0 {
                info!("Retry {}: shuffling and trimming quote options", attempt);
                for level in Level::ALL {
                    let form = working.get_mut(level);
                    if form.len() > 1 {
                        form.pop();
                    }
                    form.shuffle(&mut self.rng);
                }
            }

            let prompt = build_prompt(modern_line, &working, target_syllables);
            let response = match self.call_model(prompt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Model call failed on attempt {}: {}", attempt + 1, e);
                    continue;
                }
            };

            let Some(text) = extract_output(&response) else {
                warn!("Failed to parse model output on attempt {}", attempt + 1);
                continue;
            };

            match mini_validate(&text, &working) {
                Some(temp_ids) => {
                    info!("Mini-validation succeeded with {:?}", temp_ids);
                    return Some(AssembledLine { text, temp_ids });
                }
                None => warn!("Mini-validation failed on attempt {}", attempt + 1),
            }
        }

        error!("Assembler failed after {} retries", max_retries);
        None
    }

    async fn call_model(&self, prompt: String) -> bard_core::Result<String> {
        let mut request = ChatRequest::new(prompt, ANTHROPIC_MAX_TOKENS, self.temperature);
        if self.model.provider() == Provider::OpenAi {
            request = request.with_system(OPENAI_SYSTEM_PROMPT);
        }
        let reply = self.model.complete(&request).await?;
        Ok(reply.trim().to_string())
    }
}

/// The assembly instructions, the modern line and the numbered options.
pub fn build_prompt(modern_line: &str, options: &PromptOptions, target_syllables: u32) -> String {
    let quotes = options
        .iter()
        .map(|opt| {
            format!(
                "[{}] {}: \"{}\" (score: {:.4}) (syllables: {})",
                opt.form.key().to_uppercase(),
                opt.temp_id,
                opt.text.trim(),
                opt.score,
                opt.syllables
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let syllable_instruction = if target_syllables > 0 {
        format!(
            "\nIMPORTANT: The modern line has approximately {} syllables. Try to assemble a line with a similar syllable count (within 25% if possible).\n",
            target_syllables
        )
    } else {
        String::new()
    };

    format!(
        "You are a playwright assistant generating Shakespeare-style dialog using a modern play line and selected source quotes. \
You use quotes from Shakespeare as puzzle pieces, fit together to match as closely as possible the modern play line.

Your job:
- Translate the modern English line into dramatic Shakespearean verse.
- Use ONLY the provided Shakespearean quotes, EXACTLY as written - NO modifications whatsoever.
- You MUST use the entire Shakespearean quote as provided - do not omit any words from a quote you choose. Do not add any words from a quote you choose.
- You may select 1 to 3 of the Shakespearean quote options (they can be lines, phrases, or fragments).
- When combining Shakespearean quote options, try to match the number of syllables listed for those quotes to the number of syllables in the modern line.
- You may only combine whole Shakespearean quotes - no partial usage is allowed.
- You may rearrange the order of the Shakespearean quotes but not change their internal wording.
- No proper nouns may be used.
- Return ONLY the final assembled line, without listing the temp_ids or any other information.
{syllable_instruction}
Modern play line:
\"{modern_line}\"

Here are your options:
{quotes}

Your response should contain ONLY the assembled text, with no additional commentary."
    )
}

/// The assembled text from a reply: a JSON `text` field if present, else the
/// fence-stripped reply. Blank replies yield `None`.
pub fn extract_output(response: &str) -> Option<String> {
    if response.trim().is_empty() {
        error!("Empty or whitespace-only response from model");
        return None;
    }

    let cleaned = strip_code_fences(response);
    if let Some(text) = extract_json_object(&cleaned).and_then(|v| v.get("text").and_then(|t| t.as_str()).map(String::from)) {
        debug!("Extracted text from JSON reply");
        return Some(text);
    }
    Some(cleaned)
}

/// Consume the normalized line with whole options, longest first, at most
/// three times. Returns the temp ids used, in order, when nothing is left over.
pub fn mini_validate(assembled: &str, options: &PromptOptions) -> Option<Vec<String>> {
    let mut remaining = alphanumeric_lower(assembled);
    if remaining.is_empty() {
        return None;
    }

    let mut available: Vec<(String, String)> = options
        .iter()
        .map(|opt| (opt.temp_id.clone(), alphanumeric_lower(&opt.text)))
        .filter(|(_, normalized)| !normalized.is_empty())
        .collect();
    available.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut used = Vec::new();
    for _ in 0..MAX_QUOTES {
        if remaining.is_empty() {
            break;
        }
        let Some(pos) = available.iter().position(|(_, quote)| remaining.starts_with(quote.as_str())) else {
            debug!("No quote matches the start of {:?}", remaining);
            return None;
        };
        let (temp_id, quote) = available.remove(pos);
        remaining.replace_range(..quote.len(), "");
        used.push(temp_id);
    }

    if remaining.is_empty() {
        Some(used)
    } else {
        debug!("Text remains after {} quotes: {:?}", MAX_QUOTES, remaining);
        None
    }
}
