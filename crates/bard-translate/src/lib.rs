//! bard-translate - Modern lines rendered in Shakespeare's own words
//!
//! A modern line is translated by retrieving candidate quotes at the line,
//! phrase and fragment levels, offering a diverse handful of them to a chat
//! model, and accepting the reply only when it is made of whole offered
//! quotes that check out against the line corpus. Spent quotes are recorded
//! per session so a scene never repeats itself.
//!
//! - [`Selector`]: filtering and MMR ranking of candidates.
//! - [`Assembler`]: the model call and the whole-quote check.
//! - [`Validator`]: ground-truth comparison of the chosen references.
//! - [`TranslationManager`]: the line, scene and file flow with its failsafe.
//! - [`SceneSaver`], [`SessionStore`], [`PlayFormatter`]: files on disk.

mod assembler;
mod format;
mod manager;
pub mod roman;
pub mod scene_file;
mod scene_saver;
mod selector;
mod session;
mod used_map;
mod validator;

pub use assembler::{build_prompt, extract_output, mini_validate, AssembledLine, Assembler};
pub use format::{PlayFormatter, DEFAULT_HTML_FILE, DEFAULT_MARKDOWN_FILE};
pub use manager::{FileTranslation, TranslationManager};
pub use scene_saver::{render_markdown, scene_id, SavedLine, SceneDocument, SceneMetadata, SceneSaver};
pub use selector::{analyze_diversity, DiversityReport, PromptOption, PromptOptions, PromptPlan, Selector};
pub use session::{generate_translation_id, SceneFiles, SceneRecord, SessionInfo, SessionStore};
pub use used_map::{join_indices, UsedMap};
pub use validator::Validator;

/// Local time in ISO 8601 with microseconds.
pub(crate) fn now_iso() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
