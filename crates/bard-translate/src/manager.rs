//! Line, scene and file translation over one session's used-quote map.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use bard_chunk::text::line_syllables;
use bard_core::{
    BardError, CandidateQuote, CandidateSet, ChatModel, Embedder, QuoteStore, Reference, Result, SearchType,
    TranslatedLine, TranslatorConfig,
};
use bard_query::SearchEngine;

use crate::assembler::Assembler;
use crate::scene_file::{extract_act_scene_from_filename, parse_markdown_scene};
use crate::scene_saver::{SceneDocument, SceneSaver};
use crate::selector::{PromptPlan, Selector};
use crate::session::SessionStore;
use crate::used_map::UsedMap;
use crate::validator::Validator;

const INITIAL_HYBRID_TOP_K: usize = 15;
const EXTENDED_HYBRID_TOP_K: usize = 25;
const EXTENDED_STANDARD_TOP_K: usize = 20;
const MIN_OPTIONS: usize = 3;
const FAILSAFE_ID: &str = "failsafe_1";

/// Result of translating one scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTranslation {
    pub act: String,
    pub scene: String,
    pub output_dir: PathBuf,
    pub line_count: usize,
    /// The scene was already translated in this session and was left alone.
    pub skipped: bool,
}

enum Attempt {
    Done(Option<TranslatedLine>),
    RetryHybrid,
}

pub struct TranslationManager<S: ?Sized, E: ?Sized> {
    engine: SearchEngine<S, E>,
    assembler: Assembler,
    validator: Option<Validator>,
    used_map: UsedMap,
    config: TranslatorConfig,
    translation_id: Option<String>,
}

impl<S, E> TranslationManager<S, E>
where
    S: QuoteStore + ?Sized,
    E: Embedder + ?Sized,
{
    /// Build a manager; the validator is loaded from `lines_path` when
    /// validation is enabled and the corpus file can be read.
    pub fn new(engine: SearchEngine<S, E>, model: Arc<dyn ChatModel>, config: TranslatorConfig) -> Self {
        let validator = if config.validation_enabled {
            match Validator::load(&config.lines_path) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Validation disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            assembler: Assembler::new(model, config.temperature, config.random_seed),
            used_map: UsedMap::new(&config.used_map_dir, ""),
            engine,
            validator,
            config,
            translation_id: None,
        }
    }

    pub fn with_validator(mut self, validator: Option<Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn translation_id(&self) -> Option<&str> {
        self.translation_id.as_deref()
    }

    pub fn used_map(&self) -> &UsedMap {
        &self.used_map
    }

    pub fn engine(&self) -> &SearchEngine<S, E> {
        &self.engine
    }

    /// Start or resume a session; a new id is the first 8 hex digits of a v4 UUID.
    pub fn start_session(&mut self, translation_id: Option<&str>) -> &str {
        let id = translation_id
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..8].to_string());
        info!("Starting translation session: {}", id);
        self.used_map = UsedMap::load(&self.config.used_map_dir, &id);
        self.translation_id.insert(id)
    }

    fn session_id(&self) -> Result<String> {
        self.translation_id
            .clone()
            .ok_or_else(|| BardError::invalid_argument("Translation session not started"))
    }

    /// Translate one modern line. `hybrid` defaults to the configured search mode.
    ///
    /// Returns `None` only when even the failsafe finds nothing to quote.
    pub async fn translate_line(
        &mut self,
        modern_line: &str,
        candidates: CandidateSet,
        hybrid: Option<bool>,
    ) -> Result<Option<TranslatedLine>> {
        self.session_id()?;
        let mut hybrid = hybrid.unwrap_or(self.config.default_search_mode.is_hybrid());
        let mut candidates = candidates;

        loop {
            match self.attempt(modern_line, candidates, hybrid).await {
                Attempt::Done(result) => return Ok(result),
                Attempt::RetryHybrid => {
                    info!("[STANDARD] Assembly failed, retrying with hybrid search");
                    hybrid = true;
                    candidates = CandidateSet::default();
                }
            }
        }
    }

    async fn attempt(&mut self, modern_line: &str, mut candidates: CandidateSet, hybrid: bool) -> Attempt {
        let search_type = if hybrid { SearchType::Hybrid } else { SearchType::Standard };
        info!("Translating line using {:?} search: {:?}", search_type, modern_line);

        if hybrid && candidates.is_empty() {
            match self.engine.hybrid_search(modern_line, INITIAL_HYBRID_TOP_K).await {
                Ok(found) if !found.is_empty() => candidates = found,
                Ok(_) => {
                    warn!("[HYBRID] No candidates returned from hybrid search");
                    return Attempt::Done(self.failsafe(modern_line, &CandidateSet::default(), search_type).await);
                }
                Err(e) => {
                    error!("[HYBRID] Error performing hybrid search: {}", e);
                    return Attempt::Done(self.failsafe(modern_line, &CandidateSet::default(), search_type).await);
                }
            }
        }

        match self.compose(modern_line, &candidates, hybrid).await {
            Ok(Some(line)) => Attempt::Done(Some(line)),
            Ok(None) if !hybrid => Attempt::RetryHybrid,
            Ok(None) => {
                warn!("[HYBRID] Assembly failed, using failsafe");
                Attempt::Done(self.failsafe(modern_line, &candidates, search_type).await)
            }
            Err(e) => {
                error!("[{:?}] Error in translation process: {}", search_type, e);
                Attempt::Done(self.failsafe(modern_line, &candidates, search_type).await)
            }
        }
    }

    fn prepare(&self, candidates: &CandidateSet) -> PromptPlan {
        Selector::new(&self.used_map, self.config.mmr_lambda).prepare_prompt_structure(candidates)
    }

    /// Select, assemble, check and record. `Ok(None)` means the model never
    /// produced a line built from the offered quotes.
    async fn compose(&mut self, modern_line: &str, candidates: &CandidateSet, hybrid: bool) -> Result<Option<TranslatedLine>> {
        let mut plan = self.prepare(candidates);
        let target_syllables = line_syllables(modern_line);
        info!("Modern line has {} syllables", target_syllables);

        if plan.options.total() < MIN_OPTIONS {
            warn!("Only {} valid candidates, retrieving more", plan.options.total());
            let extended = if hybrid {
                self.engine.hybrid_search(modern_line, EXTENDED_HYBRID_TOP_K).await
            } else {
                self.engine.search_line(modern_line, EXTENDED_STANDARD_TOP_K).await
            };
            plan = match extended {
                Ok(found) => self.prepare(&found),
                Err(e) => {
                    error!("Error in extended search: {}", e);
                    PromptPlan::default()
                }
            };
            if plan.options.is_empty() {
                return Err(BardError::assembly("Insufficient candidates after extended search"));
            }
        }

        let max_retries = if hybrid { 0 } else { 1 };
        let Some(assembled) = self
            .assembler
            .assemble_line(modern_line, &plan.options, target_syllables, max_retries)
            .await
        else {
            return Ok(None);
        };

        let text = assembled.text.trim().to_string();
        if text.is_empty() || assembled.temp_ids.is_empty() {
            return Err(BardError::assembly("Missing text or temp_ids in assembler output"));
        }

        let unknown: Vec<&String> = assembled
            .temp_ids
            .iter()
            .filter(|id| !plan.chunk_map.contains_key(*id))
            .collect();
        if !unknown.is_empty() {
            return Err(BardError::validation(format!("Invalid temp_ids in result: {:?}", unknown)));
        }

        let used: Vec<(&String, &CandidateQuote)> = assembled
            .temp_ids
            .iter()
            .filter_map(|id| plan.chunk_map.get(id).map(|c| (id, c)))
            .collect();

        if let Some(validator) = &self.validator {
            let raw: Vec<Reference> = used
                .iter()
                .map(|(id, c)| Reference {
                    word_index: c.chunk.word_index.clone(),
                    ..Reference::from_chunk(id.as_str(), &c.chunk)
                })
                .collect();
            if !validator.validate_line(&text, &raw) {
                return Err(BardError::validation("Validator failed on assembled line"));
            }
        }

        for (_, candidate) in &used {
            self.mark_used(candidate);
        }
        self.used_map.save()?;
        info!("Line translated and validated successfully");

        Ok(Some(TranslatedLine {
            text,
            temp_ids: assembled.temp_ids.clone(),
            references: used.iter().map(|(id, c)| Reference::from_chunk(id.as_str(), &c.chunk)).collect(),
            original_modern_line: modern_line.to_string(),
            search_type: if hybrid { SearchType::Hybrid } else { SearchType::Standard },
            is_failsafe: false,
        }))
    }

    fn mark_used(&mut self, candidate: &CandidateQuote) {
        let chunk = &candidate.chunk;
        match chunk.word_range() {
            Some(range) => {
                let indices: Vec<usize> = range.collect();
                self.used_map.mark_used(&chunk.reference_key(), &indices);
            }
            None => warn!("Missing or invalid word_index for {}", chunk.reference_key()),
        }
    }

    /// The best-scoring line candidate quoted verbatim, or the best line from
    /// a fresh single-result search.
    async fn failsafe(&mut self, modern_line: &str, candidates: &CandidateSet, search_type: SearchType) -> Option<TranslatedLine> {
        let quote = match candidates.best_line() {
            Some(quote) => quote.clone(),
            None => match self.engine.search_line(modern_line, 1).await {
                Ok(found) => match found.line.into_iter().next() {
                    Some(quote) => quote,
                    None => {
                        error!("[{:?}] All translation attempts failed, including failsafe", search_type);
                        return None;
                    }
                },
                Err(e) => {
                    error!("[{:?}] Error in failsafe search: {}", search_type, e);
                    return None;
                }
            },
        };

        info!("Creating FAILSAFE result from single quote: {:?}", quote.text());
        self.mark_used(&quote);
        if let Err(e) = self.used_map.save() {
            warn!("Failed to save used map: {}", e);
        }

        Some(TranslatedLine {
            text: quote.chunk.text.clone(),
            temp_ids: vec![FAILSAFE_ID.to_string()],
            references: vec![Reference::from_chunk(FAILSAFE_ID, &quote.chunk)],
            original_modern_line: modern_line.to_string(),
            search_type,
            is_failsafe: true,
        })
    }

    /// Retrieve candidates for `modern_line` and translate it.
    pub async fn translate_text(&mut self, modern_line: &str, hybrid: Option<bool>) -> Result<Option<TranslatedLine>> {
        let hybrid = hybrid.unwrap_or(self.config.default_search_mode.is_hybrid());
        let top_k = if hybrid {
            self.engine.config().hybrid_top_k
        } else {
            self.engine.config().line_top_k
        };
        let candidates = self.engine.retrieve_all(modern_line, top_k, hybrid).await?;
        self.translate_line(modern_line, candidates, Some(hybrid)).await
    }

    /// Translate several lines, each with fresh candidates. Lines that yield
    /// nothing are dropped.
    pub async fn translate_group(&mut self, lines: &[String], hybrid: bool) -> Result<Vec<TranslatedLine>> {
        info!("Translating group of {} lines with hybrid_search={}", lines.len(), hybrid);
        let search = self.engine.config().clone();
        let mut results = Vec::new();

        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            let candidates = if hybrid {
                self.engine.hybrid_search(line, search.hybrid_top_k).await
            } else {
                self.engine.retrieve_all(line, search.line_top_k, false).await
            };
            let candidates = candidates.unwrap_or_else(|e| {
                warn!("Search failed for {:?}: {}", line, e);
                CandidateSet::default()
            });
            if let Some(translated) = self.translate_line(line, candidates, Some(hybrid)).await? {
                results.push(translated);
            }
        }
        Ok(results)
    }

    /// Translate a scene in the configured search mode, skipping failed lines.
    pub async fn translate_scene(&mut self, lines: &[String]) -> Result<Vec<TranslatedLine>> {
        info!("Starting scene translation: {} lines", lines.len());
        let hybrid = self.config.default_search_mode.is_hybrid();
        let top_k = self.engine.config().line_top_k;
        let mut translated = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            info!("Translating line {}/{}", i + 1, lines.len());
            let candidates = self.engine.retrieve_all(line, top_k, hybrid).await?;
            match self.translate_line(line, candidates, Some(hybrid)).await? {
                Some(result) => translated.push(result),
                None => warn!("Line {} failed translation and was skipped", i + 1),
            }
        }

        info!("Completed scene translation: {} lines generated", translated.len());
        Ok(translated)
    }

    /// Save into the session's configured output directory.
    pub fn save_translated_scene(
        &self,
        act: &str,
        scene: &str,
        translated: &[TranslatedLine],
        original_lines: Option<&[String]>,
    ) -> Result<PathBuf> {
        let output_dir = self.config.output_dir(&self.session_id()?);
        SceneSaver::new(&output_dir, self.config.checkpoint_interval)?.save_scene(act, scene, translated, original_lines)?;
        info!("Saved translated scene to {:?}", output_dir);
        Ok(output_dir)
    }

    /// Translate a Markdown scene file and record it in the session.
    pub async fn translate_file(
        &mut self,
        path: &Path,
        sessions: &SessionStore,
        output_dir: Option<&Path>,
        force: bool,
        hybrid: bool,
    ) -> Result<FileTranslation> {
        let translation_id = self.session_id()?;
        if !path.exists() {
            return Err(BardError::not_found("Scene file", path.display().to_string()));
        }

        let (act, scene) = extract_act_scene_from_filename(path);
        info!("Translating file {:?} (Act {}, Scene {})", path, act, scene);
        let session = sessions.load(&translation_id);

        if !force && sessions.is_scene_translated(&translation_id, &act, &scene) {
            info!("Act {}, Scene {} has already been translated", act, scene);
            let line_count = sessions
                .scene_files(&translation_id, &act, &scene)
                .json
                .and_then(|json| SceneDocument::load(&json).ok())
                .map(|doc| doc.translated_lines.len())
                .unwrap_or(0);
            return Ok(FileTranslation {
                act,
                scene,
                output_dir: session.output_dir,
                line_count,
                skipped: true,
            });
        }

        let lines = parse_markdown_scene(path)?;
        if lines.is_empty() {
            return Err(BardError::invalid_argument(format!("No dialogue lines found in {}", path.display())));
        }
        info!("Extracted {} dialogue lines", lines.len());

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None if !session.output_dir.as_os_str().is_empty() => session.output_dir.clone(),
            None => self.config.output_dir(&translation_id),
        };

        let translated = self.translate_group(&lines, hybrid).await?;
        if translated.is_empty() {
            return Err(BardError::assembly("Translation failed - no lines translated"));
        }
        info!("Successfully translated {}/{} lines", translated.len(), lines.len());

        SceneSaver::new(&output_dir, self.config.checkpoint_interval)?.save_scene(&act, &scene, &translated, Some(&lines))?;

        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        sessions.update_scene_info(&translation_id, &act, &scene, filename, translated.len())?;

        Ok(FileTranslation {
            act,
            scene,
            output_dir,
            line_count: translated.len(),
            skipped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bard_core::{Embedder, Level, Provider, QuoteChunk, SearchConfig};
    use bard_embed::MockEmbedder;
    use bard_llm::ScriptedModel;
    use bard_store::SqliteStore;

    const DIM: usize = 32;

    const LINES: [&str; 3] = [
        "We are such stuff as dreams are made on",
        "our little life is rounded with a sleep",
        "the cloud-capp'd towers and the gorgeous palaces",
    ];

    fn corpus() -> Vec<QuoteChunk> {
        LINES
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut chunk = QuoteChunk::new(format!("chunk_{}", i), "THE TEMPEST", Some("IV"), Some("I"), i as u32 + 1, *text);
                let words = bard_chunk::text::tokenize(text).len();
                chunk.word_index = format!("0,{}", words - 1);
                chunk
            })
            .collect()
    }

    async fn manager(dir: &Path, model: Arc<ScriptedModel>) -> TranslationManager<SqliteStore, MockEmbedder> {
        let store = Arc::new(SqliteStore::open_memory(DIM).unwrap());
        let embedder = Arc::new(MockEmbedder::with_config(DIM, 8192));
        let chunks = corpus();
        let embeddings = embedder.embed_documents(&LINES).await.unwrap();
        store.upsert_chunks(Level::Line, &chunks, &embeddings).await.unwrap();

        let config = TranslatorConfig {
            used_map_dir: dir.join("used_maps"),
            base_output_dir: dir.join("outputs"),
            lines_path: dir.join("missing_lines.json"),
            ..TranslatorConfig::default()
        };
        let engine = SearchEngine::new(store, embedder, SearchConfig::default());
        TranslationManager::new(engine, model, config).with_validator(Some(Validator::new(corpus())))
    }

    #[tokio::test]
    async fn test_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = manager(dir.path(), Arc::new(ScriptedModel::new(Provider::Anthropic))).await;
        let err = manager
            .translate_line("We dream", CandidateSet::default(), Some(false))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_translate_line_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::with_replies(Provider::Anthropic, [LINES[0]]));
        let mut manager = manager(dir.path(), model.clone()).await;
        manager.start_session(Some("t1"));

        let candidates = manager.engine.retrieve_all(LINES[0], 3, false).await.unwrap();
        let result = manager
            .translate_line("We are made of dreams", candidates, Some(false))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.text, LINES[0]);
        assert_eq!(result.temp_ids.len(), 1);
        assert!(!result.is_failsafe);
        assert_eq!(result.search_type, SearchType::Standard);
        assert_eq!(result.references[0].reference_key(), "THE TEMPEST|IV|I|1");
        assert_eq!(result.original_modern_line, "We are made of dreams");

        let used = UsedMap::load(dir.path().join("used_maps"), "t1");
        assert!(used.was_used("THE TEMPEST|IV|I|1", &(0..=8).collect::<Vec<_>>()));
        assert_eq!(model.remaining(), 0);
    }

    #[tokio::test]
    async fn test_failsafe_quotes_best_scoring_line() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::with_replies(Provider::Anthropic, ["nothing like the quotes"]));
        let mut manager = manager(dir.path(), model).await;
        manager.start_session(Some("t3"));

        let chunks = corpus();
        let mut candidates = CandidateSet::default();
        candidates.line.push(CandidateQuote::new(chunks[1].clone(), 0.9));
        candidates.line.push(CandidateQuote::new(chunks[0].clone(), 0.1));

        let result = manager
            .translate_line("We are made of dreams", candidates, Some(true))
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_failsafe);
        assert_eq!(result.text, LINES[0]);
        assert_eq!(result.references[0].reference_key(), "THE TEMPEST|IV|I|1");
    }

    #[tokio::test]
    async fn test_failsafe_after_failed_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::with_replies(
            Provider::OpenAi,
            ["nothing like the quotes", "still nothing", "and again nothing"],
        ));
        let mut manager = manager(dir.path(), model.clone()).await;
        manager.start_session(Some("t2"));

        let candidates = manager.engine.retrieve_all(LINES[1], 3, false).await.unwrap();
        let result = manager
            .translate_line("Life ends in sleep", candidates, Some(false))
            .await
            .unwrap()
            .unwrap();

        // two standard attempts, then one hybrid attempt, then the failsafe
        assert_eq!(model.requests().len(), 3);
        assert!(result.is_failsafe);
        assert_eq!(result.temp_ids, vec!["failsafe_1"]);
        assert_eq!(result.search_type, SearchType::Hybrid);
        assert!(LINES.contains(&result.text.as_str()));
        assert!(!manager.used_map().is_empty());
    }

    #[tokio::test]
    async fn test_translate_file_records_session() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(Provider::Anthropic));
        let mut manager = manager(dir.path(), model).await;
        let sessions = SessionStore::new(dir.path().join("sessions"), dir.path().join("outputs"));
        let session = sessions.create(None).unwrap();
        manager.start_session(Some(&session.translation_id));

        let scene = dir.path().join("act_1_scene_2.md");
        std::fs::write(&scene, "# ACT 1\n\n## SCENE 2\n\nPROSPERO\nWe are made of dreams.\n\n[He sleeps.]\nIt all ends in sleep.\n").unwrap();

        let first = manager.translate_file(&scene, &sessions, None, false, false).await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.line_count, 2);
        assert_eq!(first.output_dir, session.output_dir);
        assert!(session.output_dir.join("act_1_scene_2.json").exists());
        assert!(sessions.is_scene_translated(&session.translation_id, "1", "2"));

        let second = manager.translate_file(&scene, &sessions, None, false, false).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.line_count, 2);
    }
}
