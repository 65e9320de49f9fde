//! Translation sessions: one info file per session plus its output directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bard_core::Result;

use crate::now_iso;
use crate::scene_saver::scene_id;

const INFO_FILE: &str = "translation_info.json";

/// A scene recorded as translated within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub act: String,
    pub scene: String,
    pub filename: String,
    pub translated_at: String,
    pub line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub translation_id: String,
    #[serde(default)]
    pub scenes_translated: Vec<SceneRecord>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_updated: String,
    /// Empty when the session has no output directory yet.
    #[serde(default)]
    pub output_dir: PathBuf,
}

impl SessionInfo {
    fn fresh(translation_id: &str) -> Self {
        let now = now_iso();
        Self {
            translation_id: translation_id.to_string(),
            scenes_translated: Vec::new(),
            created_at: now.clone(),
            last_updated: now,
            output_dir: PathBuf::new(),
        }
    }

    pub fn has_output_dir(&self) -> bool {
        !self.output_dir.as_os_str().is_empty() && self.output_dir.exists()
    }
}

/// Paths of a translated scene's files, when they exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFiles {
    pub json: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
}

/// `trans_{YYYYmmdd_HHMM}_{6 hex}`.
pub fn generate_translation_id() -> String {
    let uuid = uuid::Uuid::new_v4().to_string();
    format!("trans_{}_{}", chrono::Local::now().format("%Y%m%d_%H%M"), &uuid[..6])
}

/// Session info files under one directory.
pub struct SessionStore {
    dir: PathBuf,
    base_output_dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>, base_output_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            base_output_dir: base_output_dir.into(),
        }
    }

    pub fn info_path(&self, translation_id: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", translation_id, INFO_FILE))
    }

    /// Session info; a missing file yields a fresh record, an unreadable one
    /// a record with `unknown` timestamps.
    pub fn load(&self, translation_id: &str) -> SessionInfo {
        let path = self.info_path(translation_id);
        if !path.exists() {
            return SessionInfo::fresh(translation_id);
        }

        match std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<SessionInfo>(&content).ok())
        {
            Some(info) => info,
            None => {
                warn!("Error loading session info for {}", translation_id);
                SessionInfo {
                    created_at: "unknown".to_string(),
                    last_updated: "unknown".to_string(),
                    ..SessionInfo::fresh(translation_id)
                }
            }
        }
    }

    /// Write the info file, stamping `last_updated`; mirrored into the
    /// output directory when it exists.
    pub fn save(&self, info: &mut SessionInfo) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        info.last_updated = now_iso();
        let content = serde_json::to_string_pretty(info)?;
        std::fs::write(self.info_path(&info.translation_id), &content)?;
        if info.has_output_dir() {
            std::fs::write(info.output_dir.join(INFO_FILE), &content)?;
        }
        Ok(())
    }

    /// Start a session; its output directory defaults to `{base}/{id}`.
    pub fn create(&self, output_dir: Option<&Path>) -> Result<SessionInfo> {
        let translation_id = generate_translation_id();
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_output_dir.join(&translation_id));
        std::fs::create_dir_all(&output_dir)?;

        let mut info = SessionInfo {
            output_dir,
            ..SessionInfo::fresh(&translation_id)
        };
        self.save(&mut info)?;
        info!("Created translation session {}", translation_id);
        Ok(info)
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let suffix = format!("_{}", INFO_FILE);
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(id) = name.strip_suffix(&suffix) else {
                continue;
            };
            match std::fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str::<SessionInfo>(&c).ok())
            {
                Some(mut info) => {
                    if info.translation_id.is_empty() {
                        info.translation_id = id.to_string();
                    }
                    sessions.push(info);
                }
                None => warn!("Error loading session info from {:?}", path),
            }
        }

        sessions.sort_by(|a, b| sort_stamp(b).cmp(sort_stamp(a)));
        Ok(sessions)
    }

    /// Record a translated scene, replacing an earlier record for the same act and scene.
    pub fn update_scene_info(
        &self,
        translation_id: &str,
        act: &str,
        scene: &str,
        filename: &str,
        line_count: usize,
    ) -> Result<()> {
        let mut info = self.load(translation_id);
        let record = SceneRecord {
            act: act.to_string(),
            scene: scene.to_string(),
            filename: filename.to_string(),
            translated_at: now_iso(),
            line_count,
        };
        match info
            .scenes_translated
            .iter_mut()
            .find(|s| s.act == act && s.scene == scene)
        {
            Some(existing) => *existing = record,
            None => info.scenes_translated.push(record),
        }
        self.save(&mut info)
    }

    pub fn is_scene_translated(&self, translation_id: &str, act: &str, scene: &str) -> bool {
        self.load(translation_id)
            .scenes_translated
            .iter()
            .any(|s| s.act == act && s.scene == scene)
    }

    /// Remove the info file; `false` when there was none.
    pub fn delete(&self, translation_id: &str) -> Result<bool> {
        let path = self.info_path(translation_id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        info!("Deleted translation session {}", translation_id);
        Ok(true)
    }

    pub fn scene_files(&self, translation_id: &str, act: &str, scene: &str) -> SceneFiles {
        let info = self.load(translation_id);
        if !info.has_output_dir() {
            return SceneFiles::default();
        }
        let stem = scene_id(act, &scene.to_lowercase());
        let existing = |ext: &str| {
            let path = info.output_dir.join(format!("{}.{}", stem, ext));
            path.exists().then_some(path)
        };
        SceneFiles {
            json: existing("json"),
            markdown: existing("md"),
        }
    }
}

fn sort_stamp(info: &SessionInfo) -> &str {
    if info.last_updated.is_empty() {
        &info.created_at
    } else {
        &info.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> SessionStore {
        SessionStore::new(dir.join("sessions"), dir.join("outputs"))
    }

    #[test]
    fn test_generate_translation_id() {
        let id = generate_translation_id();
        assert!(id.starts_with("trans_"));
        // trans_ + YYYYmmdd_HHMM + _ + 6
        assert_eq!(id.len(), 6 + 13 + 1 + 6);
    }

    #[test]
    fn test_create_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let info = store.create(None).unwrap();

        assert_eq!(info.output_dir, dir.path().join("outputs").join(&info.translation_id));
        assert!(info.output_dir.join("translation_info.json").exists());

        let loaded = store.load(&info.translation_id);
        assert_eq!(loaded.translation_id, info.translation_id);
        assert!(loaded.scenes_translated.is_empty());
    }

    #[test]
    fn test_missing_session_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let info = store(dir.path()).load("nope");
        assert_eq!(info.translation_id, "nope");
        assert!(info.output_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_update_scene_info_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let id = store.create(None).unwrap().translation_id;

        store.update_scene_info(&id, "1", "2", "act_1_scene_2.md", 10).unwrap();
        store.update_scene_info(&id, "1", "2", "act_1_scene_2.md", 12).unwrap();
        store.update_scene_info(&id, "1", "3", "act_1_scene_3.md", 4).unwrap();

        let info = store.load(&id);
        assert_eq!(info.scenes_translated.len(), 2);
        assert_eq!(info.scenes_translated[0].line_count, 12);
        assert!(store.is_scene_translated(&id, "1", "3"));
        assert!(!store.is_scene_translated(&id, "2", "1"));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        std::fs::create_dir_all(dir.path().join("sessions")).unwrap();
        std::fs::write(
            store.info_path("trans_older"),
            r#"{"translation_id": "trans_older", "created_at": "2024-01-01T00:00:00", "last_updated": "2024-01-02T00:00:00"}"#,
        )
        .unwrap();
        let newer = store.create(None).unwrap();

        let sessions = store.list().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].translation_id, newer.translation_id);

        assert!(store.delete("trans_older").unwrap());
        assert!(!store.delete("trans_older").unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_scene_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let info = store.create(None).unwrap();
        std::fs::write(info.output_dir.join("act_ii_scene_iii.json"), "{}").unwrap();

        let files = store.scene_files(&info.translation_id, "II", "III");
        assert!(files.json.is_some());
        assert!(files.markdown.is_none());
    }
}
