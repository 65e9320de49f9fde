//! Application facade over the corpus, retrieval, translation and
//! playwright crates.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use bard_chunk::{Chunker, CorpusFile, FragmentChunker, LineChunker, PhraseChunker};
use bard_core::{
    ApiKeys, BardConfig, BardError, CandidateSet, ChatModel, Embedder, Level, QuoteStore, Reference, Result,
    TranslatedLine,
};
use bard_embed::build_embedder;
use bard_llm::build_model;
use bard_playwright::{CharacterVoices, SceneGenerator, SceneLength, SceneSummary};
use bard_query::SearchEngine;
use bard_store::SqliteStore;
use bard_translate::{PlayFormatter, SessionStore, TranslationManager, DEFAULT_HTML_FILE, DEFAULT_MARKDOWN_FILE};

/// Chunks embedded and written per round while ingesting.
const INGEST_BATCH: usize = 512;

type Translator = TranslationManager<SqliteStore, dyn Embedder>;

/// Bard application state.
pub struct BardApp {
    config: BardConfig,

    store: Arc<SqliteStore>,

    embedder: Arc<dyn Embedder>,

    engine: SearchEngine<SqliteStore, dyn Embedder>,

    /// Translation manager, or why it could not be built.
    translator: std::result::Result<Mutex<Translator>, String>,

    sessions: SessionStore,

    /// Playwright pipeline, or why it could not be built.
    playwright: std::result::Result<SceneGenerator, String>,
}

/// Search request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct SearchParams {
    /// The modern line to find quotes for.
    pub line: String,

    /// Results per query (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Widen the search with keyword neighbours.
    #[serde(default)]
    pub hybrid: bool,
}

fn default_top_k() -> usize {
    5
}

/// Line translation parameters.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TranslateLineParams {
    pub line: String,

    /// Session to translate in; a new one is created when absent.
    pub translation_id: Option<String>,

    /// Search mode override.
    pub hybrid: Option<bool>,
}

/// Scene file translation parameters.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TranslateFileParams {
    pub path: PathBuf,

    pub translation_id: Option<String>,

    pub output_dir: Option<PathBuf>,

    /// Translate again even if the session already has this scene.
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub hybrid: bool,
}

/// New play project parameters.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProjectParams {
    pub title: String,

    #[serde(default)]
    pub thematic_guidelines: String,

    #[serde(default)]
    pub character_voices: CharacterVoices,
}

/// Scene definition parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct SceneParams {
    pub project_id: String,

    #[serde(flatten)]
    pub scene: SceneSummary,
}

/// Tool result.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    /// Whether the operation was successful.
    pub success: bool,

    /// Result message or content.
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Success with the message, or an error prefixed with `context`.
    fn from_result(result: Result<String>, context: &str) -> Self {
        match result {
            Ok(message) => Self::success(message),
            Err(e) => Self::error(format!("{}: {}", context, e)),
        }
    }
}

impl BardApp {
    /// Build the application from configuration. A chat model whose API key
    /// is missing leaves its part unavailable instead of failing here.
    pub fn new(config: BardConfig, keys: &ApiKeys) -> Result<Self> {
        info!("Initializing bard with database at {:?}", config.database.path);

        let embedder = build_embedder(&config.embedding, &config.llm, keys)?;
        let store = Arc::new(SqliteStore::open_with_config(&config.database, embedder.dimension())?);

        let translator_model = build_model(config.translator.provider, &config.translator.model, keys, &config.llm);
        let playwright_model = build_model(config.playwright.provider, &config.playwright.model, keys, &config.llm);

        Self::assemble(config, store, embedder, translator_model, playwright_model)
    }

    /// Build the application around existing components.
    pub fn with_parts(
        config: BardConfig,
        store: Arc<SqliteStore>,
        embedder: Arc<dyn Embedder>,
        translator_model: Arc<dyn ChatModel>,
        playwright_model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        Self::assemble(config, store, embedder, Ok(translator_model), Ok(playwright_model))
    }

    fn assemble(
        config: BardConfig,
        store: Arc<SqliteStore>,
        embedder: Arc<dyn Embedder>,
        translator_model: Result<Arc<dyn ChatModel>>,
        playwright_model: Result<Arc<dyn ChatModel>>,
    ) -> Result<Self> {
        let engine = SearchEngine::new(store.clone(), embedder.clone(), config.search.clone());

        let translator = translator_model
            .map(|model| {
                let engine = SearchEngine::new(store.clone(), embedder.clone(), config.search.clone());
                Mutex::new(TranslationManager::new(engine, model, config.translator.clone()))
            })
            .map_err(|e| {
                warn!("Translator unavailable: {}", e);
                e.to_string()
            });

        let playwright = match playwright_model {
            Ok(model) => Ok(SceneGenerator::new(model, config.playwright.clone())?),
            Err(e) => {
                warn!("Playwright unavailable: {}", e);
                Err(e.to_string())
            }
        };

        let sessions = SessionStore::new(
            &config.translator.translation_sessions_dir,
            &config.translator.base_output_dir,
        );

        Ok(Self {
            config,
            store,
            embedder,
            engine,
            translator,
            sessions,
            playwright,
        })
    }

    pub fn config(&self) -> &BardConfig {
        &self.config
    }

    /// Get the application info.
    pub fn info() -> AppInfo {
        AppInfo {
            name: "bard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Modern lines in Shakespeare's words, and new plays in his shape".to_string(),
        }
    }

    /// List available tools.
    pub fn tools() -> Vec<ToolInfo> {
        [
            ("bard_chunk", "Split the complete works into line, phrase and fragment corpus files"),
            ("bard_ingest", "Embed corpus files into the quote store"),
            ("bard_search", "Find candidate quotes for a modern line"),
            ("bard_translate_line", "Translate one modern line into Shakespeare's words"),
            ("bard_translate_file", "Translate a Markdown scene file"),
            ("bard_sessions", "List, create and delete translation sessions"),
            ("bard_format", "Format a translated session as a Markdown and HTML play"),
            ("bard_play_project", "Create play projects and define their scenes"),
            ("bard_play_generate", "Expand and write scenes of a play project"),
            ("bard_play_adjust", "Revise a written scene against a critique"),
            ("bard_play_combine", "Combine written scenes into one play file"),
            ("bard_stats", "Get statistics about the quote store"),
        ]
        .into_iter()
        .map(|(name, description)| ToolInfo {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
    }

    fn translator(&self) -> Result<&Mutex<Translator>> {
        self.translator
            .as_ref()
            .map_err(|reason| BardError::config(format!("Translator unavailable: {}", reason)))
    }

    fn playwright(&self) -> Result<&SceneGenerator> {
        self.playwright
            .as_ref()
            .map_err(|reason| BardError::config(format!("Playwright unavailable: {}", reason)))
    }

    // ---- corpus ----

    /// Chunk the plain-text complete works into `{output_dir}/lines.json`,
    /// `phrases.json` and `fragments.json`.
    pub fn chunk_corpus(input: &Path, output_dir: &Path) -> ToolResult {
        ToolResult::from_result(chunk_corpus_files(input, output_dir), "Chunking failed")
    }

    /// Embed the corpus files in `corpus_dir` into the store. Chunks whose
    /// text is unchanged are skipped unless `force` rebuilds each level.
    pub async fn ingest(&self, corpus_dir: &Path, force: bool) -> ToolResult {
        ToolResult::from_result(self.ingest_inner(corpus_dir, force).await, "Ingest failed")
    }

    async fn ingest_inner(&self, corpus_dir: &Path, force: bool) -> Result<String> {
        let mut output = String::new();
        let mut found = false;

        for level in Level::ALL {
            let path = corpus_dir.join(format!("{}.json", level.collection()));
            if !path.exists() {
                warn!("No corpus file for {} at {:?}", level, path);
                continue;
            }
            found = true;
            let corpus = CorpusFile::load(&path)?;

            let existing = if force {
                self.store.clear(level).await?;
                Default::default()
            } else {
                self.store.content_hashes(level).await?
            };
            let pending: Vec<_> = corpus
                .chunks
                .iter()
                .filter(|chunk| existing.get(&chunk.chunk_id) != Some(&chunk.content_hash()))
                .cloned()
                .collect();

            for (i, batch) in pending.chunks(INGEST_BATCH).enumerate() {
                let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
                let embeddings = self.embedder.embed_documents(&texts).await?;
                self.store.upsert_chunks(level, batch, &embeddings).await?;
                info!(
                    "Ingested {} batch {} ({}/{})",
                    level,
                    i + 1,
                    (i * INGEST_BATCH + batch.len()).min(pending.len()),
                    pending.len()
                );
            }

            let _ = writeln!(
                output,
                "- {}: {} ingested, {} unchanged",
                level.collection(),
                pending.len(),
                corpus.chunks.len() - pending.len()
            );
        }

        if !found {
            return Err(BardError::not_found("Corpus files", corpus_dir.display().to_string()));
        }
        Ok(format!("Ingested corpus from {}:\n\n{}", corpus_dir.display(), output))
    }

    // ---- retrieval ----

    pub async fn search(&self, params: SearchParams) -> ToolResult {
        info!("Searching for: {:?}", params.line);
        let results = if params.hybrid {
            self.engine.hybrid_search(&params.line, params.top_k).await
        } else {
            self.engine.search_line(&params.line, params.top_k).await
        };

        match results {
            Ok(candidates) => ToolResult::success(format_candidates(&params.line, &candidates, params.hybrid)),
            Err(e) => ToolResult::error(format!("Search failed: {}", e)),
        }
    }

    // ---- translation ----

    pub async fn translate_line(&self, params: TranslateLineParams) -> ToolResult {
        ToolResult::from_result(self.translate_line_inner(params).await, "Translation failed")
    }

    async fn translate_line_inner(&self, params: TranslateLineParams) -> Result<String> {
        if params.line.trim().is_empty() {
            return Err(BardError::invalid_argument("Line is empty"));
        }
        let translation_id = self.session_for(params.translation_id.as_deref(), None)?;

        let mut translator = self.translator()?.lock().await;
        if translator.translation_id() != Some(translation_id.as_str()) {
            translator.start_session(Some(&translation_id));
        }
        let translated = translator
            .translate_text(&params.line, params.hybrid)
            .await?
            .ok_or_else(|| BardError::assembly("No quotes available for this line"))?;

        Ok(format_translated(&translated, &translation_id))
    }

    pub async fn translate_file(&self, params: TranslateFileParams) -> ToolResult {
        ToolResult::from_result(self.translate_file_inner(params).await, "Translation failed")
    }

    async fn translate_file_inner(&self, params: TranslateFileParams) -> Result<String> {
        let translation_id = self.session_for(params.translation_id.as_deref(), params.output_dir.as_deref())?;

        let mut translator = self.translator()?.lock().await;
        translator.start_session(Some(&translation_id));
        let result = translator
            .translate_file(
                &params.path,
                &self.sessions,
                params.output_dir.as_deref(),
                params.force,
                params.hybrid,
            )
            .await?;

        Ok(if result.skipped {
            format!(
                "Act {}, Scene {} was already translated in session {} ({} lines). Use force to translate again.",
                result.act, result.scene, translation_id, result.line_count
            )
        } else {
            format!(
                "Translated Act {}, Scene {}: {} lines saved to {} (session {})",
                result.act,
                result.scene,
                result.line_count,
                result.output_dir.display(),
                translation_id
            )
        })
    }

    /// The given session id, or a newly created session.
    fn session_for(&self, translation_id: Option<&str>, output_dir: Option<&Path>) -> Result<String> {
        match translation_id {
            Some(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            _ => Ok(self.sessions.create(output_dir)?.translation_id),
        }
    }

    // ---- sessions ----

    pub fn list_sessions(&self) -> ToolResult {
        match self.sessions.list() {
            Ok(sessions) if sessions.is_empty() => ToolResult::success("No translation sessions found."),
            Ok(sessions) => {
                let mut output = format!("Found {} translation sessions:\n\n", sessions.len());
                for session in sessions {
                    let _ = writeln!(
                        output,
                        "- {}: {} scenes, updated {}",
                        session.translation_id,
                        session.scenes_translated.len(),
                        session.last_updated
                    );
                }
                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to list sessions: {}", e)),
        }
    }

    pub fn create_session(&self, output_dir: Option<&Path>) -> ToolResult {
        match self.sessions.create(output_dir) {
            Ok(info) => ToolResult::success(format!(
                "Session '{}' created with output directory {}",
                info.translation_id,
                info.output_dir.display()
            )),
            Err(e) => ToolResult::error(format!("Failed to create session: {}", e)),
        }
    }

    pub fn delete_session(&self, translation_id: &str) -> ToolResult {
        match self.sessions.delete(translation_id) {
            Ok(true) => ToolResult::success(format!("Session '{}' deleted.", translation_id)),
            Ok(false) => ToolResult::error(format!("Session '{}' not found.", translation_id)),
            Err(e) => ToolResult::error(format!("Failed to delete session: {}", e)),
        }
    }

    // ---- formatting ----

    /// Format a session's translated scenes as Markdown and HTML plays.
    pub fn format_play(&self, translation_id: &str, output_dir: Option<&Path>) -> ToolResult {
        let result = (|| -> Result<String> {
            let session = self.sessions.load(translation_id);
            let json_dir = if session.has_output_dir() {
                session.output_dir
            } else {
                self.config.translator.output_dir(translation_id)
            };
            let output_dir = output_dir.map(Path::to_path_buf).unwrap_or_else(|| json_dir.clone());

            let formatter = PlayFormatter::new(json_dir, output_dir)?;
            let markdown = formatter.format_markdown(DEFAULT_MARKDOWN_FILE)?;
            let html = formatter.format_html(DEFAULT_HTML_FILE)?;
            Ok(format!("Play written to:\n- {}\n- {}", markdown.display(), html.display()))
        })();
        ToolResult::from_result(result, "Formatting failed")
    }

    // ---- playwright ----

    pub fn create_project(&self, params: ProjectParams) -> ToolResult {
        let result = self.playwright().and_then(|p| {
            p.projects()
                .create(&params.title, &params.thematic_guidelines, params.character_voices)
                .map(|id| format!("Created play project '{}' (ID: {})", params.title, id))
        });
        ToolResult::from_result(result, "Failed to create project")
    }

    pub fn add_scene(&self, params: SceneParams) -> ToolResult {
        let (act, scene) = (params.scene.act.clone(), params.scene.scene.clone());
        let result = self.playwright().and_then(|p| {
            p.projects()
                .add_scene(&params.project_id, params.scene)
                .map(|()| format!("Scene {}.{} saved to project {}", act, scene, params.project_id))
        });
        ToolResult::from_result(result, "Failed to add scene")
    }

    pub fn list_projects(&self) -> ToolResult {
        let result = self.playwright().and_then(|p| p.projects().list()).map(|projects| {
            if projects.is_empty() {
                return "No play projects found.".to_string();
            }
            let mut output = format!("Found {} play projects:\n\n", projects.len());
            for project in projects {
                let _ = writeln!(
                    output,
                    "- {}: {} ({} scenes, {} characters, updated {})",
                    project.id, project.title, project.scenes, project.characters, project.updated_at
                );
            }
            output
        });
        ToolResult::from_result(result, "Failed to list projects")
    }

    pub fn delete_project(&self, project_id: &str) -> ToolResult {
        match self.playwright().and_then(|p| p.projects().delete(project_id)) {
            Ok(true) => ToolResult::success(format!("Project '{}' deleted.", project_id)),
            Ok(false) => ToolResult::error(format!("Project '{}' not found.", project_id)),
            Err(e) => ToolResult::error(format!("Failed to delete project: {}", e)),
        }
    }

    /// Expand scene summary and character voice files into the working story.
    pub async fn expand_story(&self, summaries: &Path, voices: &Path) -> ToolResult {
        let result: Result<String> = async {
            let path = self.playwright()?.expand_story(summaries, voices).await?;
            Ok(format!("Expanded story saved to {}", path.display()))
        }
        .await;
        ToolResult::from_result(result, "Error expanding story")
    }

    /// Write scenes. With a project, one scene (`act` and `scene` given) or
    /// the whole play; without, every scene of the working story.
    pub async fn write_scenes(
        &self,
        project_id: Option<&str>,
        act_scene: Option<(&str, &str)>,
        length: Option<&str>,
    ) -> ToolResult {
        let result: Result<String> = async {
            let playwright = self.playwright()?;
            let length = length.map(SceneLength::from_option).unwrap_or_else(|| playwright.default_length());

            match (project_id, act_scene) {
                (Some(id), Some((act, scene))) => {
                    let generated = playwright.generate_project_scene(id, act, scene, length).await?;
                    Ok(format!("Scene written to {}\n\n{}", generated.path.display(), generated.content))
                }
                (Some(id), None) => {
                    let path = playwright.generate_full_project(id, length).await?;
                    Ok(format!("Full play written to {}", path.display()))
                }
                (None, _) => {
                    let dir = playwright.generate_scenes(length).await?;
                    Ok(format!("Scenes written to {}", dir.display()))
                }
            }
        }
        .await;
        ToolResult::from_result(result, "Error generating scenes")
    }

    pub async fn adjust_scene(&self, scene_path: &Path, critique: &str, output_dir: Option<&Path>) -> ToolResult {
        let result: Result<String> = async { self.playwright()?.adjust_scene(scene_path, critique, output_dir).await }.await;
        ToolResult::from_result(result, "Error adjusting scene")
    }

    /// Combine a project's scenes, or the working directory's generated scenes.
    pub fn combine_scenes(&self, project_id: Option<&str>) -> ToolResult {
        let result = self.playwright().and_then(|p| {
            let exporter = p.exporter();
            match project_id {
                Some(id) => exporter.combine_scenes_in_project(id, None),
                None => exporter.combine_scenes(&p.config().base_output_dir, None),
            }
        });
        ToolResult::from_result(
            result.map(|path| format!("Combined play saved to {}", path.display())),
            "Error combining scenes",
        )
    }

    // ---- stats ----

    pub async fn stats(&self) -> ToolResult {
        match self.store.get_stats().await {
            Ok(stats) => {
                let mut output = String::from("Quote store statistics:\n\n");
                let _ = writeln!(output, "- Lines: {}", stats.lines);
                let _ = writeln!(output, "- Phrases: {}", stats.phrases);
                let _ = writeln!(output, "- Fragments: {}", stats.fragments);
                let _ = writeln!(output, "- Embeddings: {} (dimension {})", stats.embeddings, stats.dimension);
                let _ = writeln!(
                    output,
                    "- Vector index: {}",
                    if stats.vector_index { "sqlite-vec" } else { "brute force" }
                );
                let _ = writeln!(output, "- Storage: {:.2} MB", stats.storage_bytes as f64 / 1024.0 / 1024.0);
                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Failed to get stats: {}", e)),
        }
    }
}

fn chunk_corpus_files(input: &Path, output_dir: &Path) -> Result<String> {
    if !input.exists() {
        return Err(BardError::not_found("Input text", input.display().to_string()));
    }
    let text = std::fs::read_to_string(input)?;

    let mut chunker = LineChunker::new();
    let lines = chunker.chunk_text(&text);
    if lines.is_empty() {
        return Err(BardError::chunking(format!("No lines found in {}", input.display())));
    }

    let phrases = PhraseChunker::new().chunk_lines(&lines)?;
    let fragments = FragmentChunker::new().chunk_lines(&lines)?;

    let counts = [lines.len(), phrases.len(), fragments.len()];
    for (level, chunks) in Level::ALL.into_iter().zip([lines, phrases, fragments]) {
        if chunks.is_empty() {
            warn!("No {} produced", level.collection());
            continue;
        }
        CorpusFile::new(level, chunks).save(&output_dir.join(format!("{}.json", level.collection())))?;
    }

    Ok(format!(
        "Chunked {} lines, {} phrases and {} fragments into {}",
        counts[0],
        counts[1],
        counts[2],
        output_dir.display()
    ))
}

fn format_candidates(line: &str, candidates: &CandidateSet, hybrid: bool) -> String {
    let mut output = format!(
        "Found {} candidates for {:?} ({} search):\n",
        candidates.total(),
        line,
        if hybrid { "hybrid" } else { "standard" }
    );

    for level in Level::ALL {
        let group = candidates.get(level);
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(output, "\n## {}", level.key().to_uppercase());
        let mut seen = HashSet::new();
        for (i, candidate) in group.iter().enumerate() {
            if !seen.insert(candidate.chunk.chunk_id.as_str()) {
                continue;
            }
            let reference = Reference::from_chunk("", &candidate.chunk);
            let _ = writeln!(
                output,
                "[{}] \"{}\" {} (score: {:.4})",
                i + 1,
                candidate.chunk.text,
                reference.formatted(),
                candidate.score
            );
        }
    }
    output
}

fn format_translated(translated: &TranslatedLine, translation_id: &str) -> String {
    let mut output = format!("{}\n\n", translated.text);
    let _ = writeln!(
        output,
        "Session: {} | search: {:?}{}",
        translation_id,
        translated.search_type,
        if translated.is_failsafe { " | failsafe" } else { "" }
    );
    output.push_str("References:\n");
    for reference in &translated.references {
        let _ = writeln!(output, "- [{}] {}", reference.temp_id, reference.formatted());
    }
    output
}

/// App info.
#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Tool info.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bard_core::Provider;
    use bard_embed::MockEmbedder;
    use bard_llm::ScriptedModel;

    const DIM: usize = 32;

    const WORKS: &str = "THE TEMPEST\n\nACT IV\n\nSCENE I\n\n\
PROSPERO\nOur revels now are ended. These our actors,\n\
As I foretold you, were all spirits and\n\
Are melted into air, into thin air:\n\
We are such stuff as dreams are made on, and our little life is rounded with a sleep.\n";

    struct Fixture {
        dir: tempfile::TempDir,
        app: BardApp,
        translator: Arc<ScriptedModel>,
        playwright: Arc<ScriptedModel>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BardConfig::default();
        config.translator.used_map_dir = dir.path().join("used_maps");
        config.translator.base_output_dir = dir.path().join("outputs");
        config.translator.translation_sessions_dir = dir.path().join("sessions");
        config.translator.lines_path = dir.path().join("corpus").join("lines.json");
        config.playwright.projects_dir = dir.path().join("play_projects");
        config.playwright.base_output_dir = dir.path().join("modern_play");

        let translator = Arc::new(ScriptedModel::new(Provider::Anthropic));
        let playwright = Arc::new(ScriptedModel::new(Provider::Anthropic));
        let app = BardApp::with_parts(
            config,
            Arc::new(SqliteStore::open_memory(DIM).unwrap()),
            Arc::new(MockEmbedder::with_config(DIM, 8192)),
            translator.clone(),
            playwright.clone(),
        )
        .unwrap();

        Fixture {
            dir,
            app,
            translator,
            playwright,
        }
    }

    async fn ingested(fixture: &Fixture) -> PathBuf {
        let input = fixture.dir.path().join("works.txt");
        std::fs::write(&input, WORKS).unwrap();
        let corpus = fixture.dir.path().join("corpus");

        let result = BardApp::chunk_corpus(&input, &corpus);
        assert!(result.success, "Chunking failed: {}", result.message);
        let result = fixture.app.ingest(&corpus, false).await;
        assert!(result.success, "Ingest failed: {}", result.message);
        corpus
    }

    #[test]
    fn test_info_and_tools() {
        assert_eq!(BardApp::info().name, "bard");
        let tools = BardApp::tools();
        assert!(tools.iter().any(|t| t.name == "bard_translate_line"));
        assert!(tools.iter().any(|t| t.name == "bard_play_generate"));
    }

    #[tokio::test]
    async fn test_chunk_and_ingest_skips_unchanged() {
        let fixture = fixture();
        let corpus = ingested(&fixture).await;
        assert!(corpus.join("lines.json").exists());
        assert!(corpus.join("fragments.json").exists());

        let stats = fixture.app.stats().await;
        assert!(stats.success);
        assert!(stats.message.contains("- Lines: 4"));

        let again = fixture.app.ingest(&corpus, false).await;
        assert!(again.success);
        assert!(again.message.contains("lines: 0 ingested, 4 unchanged"));

        let forced = fixture.app.ingest(&corpus, true).await;
        assert!(forced.message.contains("lines: 4 ingested, 0 unchanged"));
    }

    #[tokio::test]
    async fn test_ingest_missing_dir() {
        let fixture = fixture();
        let result = fixture.app.ingest(&fixture.dir.path().join("nowhere"), false).await;
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_search() {
        let fixture = fixture();
        ingested(&fixture).await;

        let result = fixture
            .app
            .search(SearchParams {
                line: "Are melted into air, into thin air:".to_string(),
                top_k: 2,
                hybrid: false,
            })
            .await;
        assert!(result.success, "Search failed: {}", result.message);
        assert!(result.message.contains("## LINE"));
        assert!(result.message.contains("THE TEMPEST (IV.I.3)"));
    }

    #[tokio::test]
    async fn test_translate_line_creates_session() {
        let fixture = fixture();
        ingested(&fixture).await;
        fixture.translator.push_reply("Are melted into air, into thin air:");

        let result = fixture
            .app
            .translate_line(TranslateLineParams {
                line: "Are melted into air, into thin air:".to_string(),
                translation_id: None,
                hybrid: Some(false),
            })
            .await;
        assert!(result.success, "Translation failed: {}", result.message);
        assert!(result.message.starts_with("Are melted into air, into thin air:"));
        assert!(result.message.contains("THE TEMPEST (IV.I.3)"));

        let sessions = fixture.app.list_sessions();
        assert!(sessions.message.contains("Found 1 translation sessions"));
    }

    #[tokio::test]
    async fn test_translate_file_and_format() {
        let fixture = fixture();
        ingested(&fixture).await;
        fixture.translator.push_reply("Our revels now are ended. These our actors,");

        let scene = fixture.dir.path().join("act_1_scene_1.md");
        std::fs::write(&scene, "# ACT 1\n\n## SCENE 1\n\nPROSPERO\nOur revels now are ended. These our actors,\n").unwrap();

        let result = fixture
            .app
            .translate_file(TranslateFileParams {
                path: scene,
                translation_id: Some("trans_test".to_string()),
                ..Default::default()
            })
            .await;
        assert!(result.success, "Translation failed: {}", result.message);
        assert!(result.message.contains("1 lines"));

        let formatted = fixture.app.format_play("trans_test", None);
        assert!(formatted.success, "Formatting failed: {}", formatted.message);
        let markdown = fixture.dir.path().join("outputs/trans_test").join(DEFAULT_MARKDOWN_FILE);
        assert!(std::fs::read_to_string(markdown).unwrap().contains("Our revels now are ended"));
    }

    #[test]
    fn test_session_lifecycle() {
        let fixture = fixture();
        let created = fixture.app.create_session(None);
        assert!(created.success);
        let id = created.message.split('\'').nth(1).unwrap().to_string();

        assert!(fixture.app.delete_session(&id).success);
        assert!(!fixture.app.delete_session(&id).success);
        assert!(fixture.app.list_sessions().message.contains("No translation sessions"));
    }

    #[tokio::test]
    async fn test_play_project_flow() {
        let fixture = fixture();
        let created = fixture.app.create_project(ProjectParams {
            title: "Quiet Hours".to_string(),
            thematic_guidelines: "The price of silence".to_string(),
            character_voices: [("EDGAR".to_string(), "Soft".to_string())].into_iter().collect(),
        });
        assert!(created.success);
        let id = created.message.rsplit("ID: ").next().unwrap().trim_end_matches(')').to_string();

        let mut scene = SceneSummary::new("I", "1", "Edgar keeps a secret.");
        scene.characters = vec!["EDGAR".to_string()];
        assert!(fixture.app.add_scene(SceneParams { project_id: id.clone(), scene }).success);
        assert!(fixture.app.list_projects().message.contains("Quiet Hours (1 scenes"));

        fixture.playwright.push_reply(
            r#"{"act": "I", "scene": "1", "setting": "A lab", "characters": ["EDGAR"], "beats": ["Alone"]}"#,
        );
        fixture.playwright.push_reply("EDGAR\nI will say nothing.");
        let written = fixture.app.write_scenes(Some(&id), None, Some("short")).await;
        assert!(written.success, "Generation failed: {}", written.message);
        assert!(written.message.contains("Quiet Hours_full.md"));

        let combined = fixture.app.combine_scenes(Some(&id));
        assert!(combined.success);
        assert!(fixture.app.delete_project(&id).success);
    }

    #[tokio::test]
    async fn test_unavailable_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BardConfig::default();
        config.translator.translation_sessions_dir = dir.path().join("sessions");
        config.playwright.projects_dir = dir.path().join("play_projects");
        config.playwright.base_output_dir = dir.path().join("modern_play");

        let app = BardApp::assemble(
            config,
            Arc::new(SqliteStore::open_memory(DIM).unwrap()),
            Arc::new(MockEmbedder::with_config(DIM, 8192)),
            Err(BardError::config("ANTHROPIC_API_KEY is not set")),
            Err(BardError::config("ANTHROPIC_API_KEY is not set")),
        )
        .unwrap();

        let result = app
            .translate_line(TranslateLineParams {
                line: "Hello".to_string(),
                translation_id: Some("t".to_string()),
                hybrid: None,
            })
            .await;
        assert!(!result.success);
        assert!(result.message.contains("ANTHROPIC_API_KEY"));
        assert!(!app.list_projects().success);
        assert!(app.stats().await.success);
    }
}
