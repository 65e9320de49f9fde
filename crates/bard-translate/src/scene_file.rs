//! Modern-language scene files: act and scene from file names, dialogue
//! lines from Markdown, and previews of translated scenes.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use bard_core::Result;

use crate::roman::act_to_int;
use crate::scene_saver::SceneDocument;

static FILENAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)act_?(\w+)_?scene_?(\w+)", r"(?i)a(\w+)s(\w+)", r"(?i)(\w+)_(\w+)"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Act and scene named by a file such as `act_1_scene_2.md`, `a1s2.md` or
/// `I_1.md`; `("unknown", "unknown")` when none of the forms match.
pub fn extract_act_scene_from_filename(path: &Path) -> (String, String) {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    for pattern in FILENAME_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(name) {
            let act = caps.get(1).map_or("", |m| m.as_str()).trim_end_matches('_');
            let scene = caps.get(2).map_or("", |m| m.as_str()).trim_end_matches('_');
            return (act.to_string(), scene.to_string());
        }
    }
    ("unknown".to_string(), "unknown".to_string())
}

/// True when the line has cased characters and all of them are uppercase.
fn is_all_upper(line: &str) -> bool {
    let mut cased = line.chars().filter(|c| c.is_lowercase() || c.is_uppercase()).peekable();
    cased.peek().is_some() && cased.all(char::is_uppercase)
}

/// Dialogue lines of a Markdown scene: headings, rules, `[stage directions]`
/// and all-caps speaker names are skipped.
pub fn parse_scene_text(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !(line.is_empty()
                || line.starts_with('#')
                || line.starts_with("---")
                || (line.starts_with('[') && line.ends_with(']'))
                || is_all_upper(line))
        })
        .map(String::from)
        .collect()
}

pub fn parse_markdown_scene(path: &Path) -> Result<Vec<String>> {
    Ok(parse_scene_text(&std::fs::read_to_string(path)?))
}

/// A scene file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFileEntry {
    pub path: PathBuf,
    pub act: String,
    pub scene: String,
}

/// Markdown scene files in `dir` with a recognisable act and scene, in play order.
pub fn gather_scene_files(dir: &Path) -> Result<Vec<SceneFileEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let (act, scene) = extract_act_scene_from_filename(&path);
        if act == "unknown" || scene == "unknown" {
            warn!("Skipping {:?}: no act and scene in file name", path);
            continue;
        }
        entries.push(SceneFileEntry { path, act, scene });
    }

    entries.sort_by(|a, b| {
        (act_to_int(&a.act), act_to_int(&a.scene), &a.act, &a.scene)
            .cmp(&(act_to_int(&b.act), act_to_int(&b.scene), &b.act, &b.scene))
    });
    Ok(entries)
}

/// Text preview of the first `max_lines` lines of a translated scene.
pub fn translation_preview(path: &Path, max_lines: usize) -> Result<String> {
    let document = SceneDocument::load(path)?;
    if document.translated_lines.is_empty() {
        return Ok("No translation data available.".to_string());
    }

    let mut out = Vec::new();
    for (i, saved) in document.translated_lines.iter().take(max_lines).enumerate() {
        let modern = document
            .original_lines
            .get(i)
            .filter(|l| !l.is_empty())
            .unwrap_or(&saved.line.original_modern_line);
        out.push(format!("Line {}:", i + 1));
        out.push(format!("Shakespeare: {}", saved.line.text));
        out.push(format!("Modern: {}", modern));
        out.push(String::new());
    }

    let total = document.translated_lines.len();
    if total < max_lines {
        out.push(format!("Total lines: {}", total));
    } else {
        out.push(format!("Preview of {} lines (total: {})", max_lines, total));
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act_scene(name: &str) -> (String, String) {
        extract_act_scene_from_filename(Path::new(name))
    }

    #[test]
    fn test_extract_act_scene() {
        assert_eq!(act_scene("scenes/act_1_scene_2.md"), ("1".into(), "2".into()));
        assert_eq!(act_scene("ACT_II_SCENE_3.md"), ("II".into(), "3".into()));
        assert_eq!(act_scene("act3scene1.md"), ("3".into(), "1".into()));
        assert_eq!(act_scene("a1s2.md"), ("1".into(), "2".into()));
        assert_eq!(act_scene("I_1.md"), ("I".into(), "1".into()));
        assert_eq!(act_scene("notes.md"), ("unknown".into(), "unknown".into()));
    }

    #[test]
    fn test_parse_scene_text() {
        let content = "# ACT I\n\n## SCENE 1\n\n[A kitchen. Morning.]\n\nMAYA\nI can't find my keys again.\n---\nJORDAN\n  Did you check the fridge?  \n";
        assert_eq!(
            parse_scene_text(content),
            vec!["I can't find my keys again.".to_string(), "Did you check the fridge?".to_string()]
        );
    }

    #[test]
    fn test_all_upper() {
        assert!(is_all_upper("HAMLET."));
        assert!(!is_all_upper("I am"));
        assert!(!is_all_upper("1234"));
    }

    #[test]
    fn test_gather_scene_files_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["act_ii_scene_1.md", "act_i_scene_2.md", "act_i_scene_10.md", "act_i_scene_1.md", "readme.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), "Hello there").unwrap();
        }
        let files = gather_scene_files(dir.path()).unwrap();
        let order: Vec<(String, String)> = files.into_iter().map(|f| (f.act, f.scene)).collect();
        assert_eq!(
            order,
            vec![
                ("i".to_string(), "1".to_string()),
                ("i".to_string(), "2".to_string()),
                ("i".to_string(), "10".to_string()),
                ("ii".to_string(), "1".to_string()),
            ]
        );
    }
}
