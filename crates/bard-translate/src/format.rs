//! Renders a session's translated scenes as one Markdown or HTML play.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use bard_core::{Reference, Result};

use crate::roman::act_to_int;

pub const DEFAULT_MARKDOWN_FILE: &str = "translated_play.md";
pub const DEFAULT_HTML_FILE: &str = "translated_play.html";

static SCENE_FILE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^act_([^_]+)_scene_(\w+)\.json$").ok());

#[derive(Debug, Default, Deserialize)]
struct SceneRows {
    #[serde(default)]
    translated_lines: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    text: String,
    #[serde(default)]
    formatted_references: Vec<String>,
    #[serde(default)]
    references: Vec<Reference>,
    #[serde(default)]
    original_modern_line: String,
}

impl Row {
    fn reference_labels(&self) -> Vec<String> {
        self.references.iter().map(Reference::formatted).collect()
    }
}

struct LoadedScene {
    act: String,
    scene: String,
    rows: Vec<Row>,
}

/// Collects `act_*_scene_*.json` files from one directory.
pub struct PlayFormatter {
    json_dir: PathBuf,
    output_dir: PathBuf,
}

impl PlayFormatter {
    pub fn new(json_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            json_dir: json_dir.into(),
            output_dir,
        })
    }

    fn load_scenes(&self) -> Result<Vec<LoadedScene>> {
        let mut scenes = Vec::new();
        for entry in std::fs::read_dir(&self.json_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(caps) = SCENE_FILE.as_ref().and_then(|re| re.captures(name)) else {
                continue;
            };
            let (act, scene) = (caps[1].to_string(), caps[2].to_string());

            let parsed = std::fs::read_to_string(&path)
                .map_err(bard_core::BardError::from)
                .and_then(|content| Ok(serde_json::from_str::<SceneRows>(&content)?));
            match parsed {
                Ok(rows) => scenes.push(LoadedScene {
                    act,
                    scene,
                    rows: rows.translated_lines,
                }),
                Err(e) => warn!("Error loading {:?}: {}", path, e),
            }
        }

        scenes.sort_by(|a, b| {
            (act_to_int(&a.act), act_to_int(&a.scene), &a.act, &a.scene)
                .cmp(&(act_to_int(&b.act), act_to_int(&b.scene), &b.act, &b.scene))
        });
        Ok(scenes)
    }

    /// Markdown play with one three-column table per scene.
    pub fn format_markdown(&self, file_name: &str) -> Result<PathBuf> {
        let mut out = String::from("# The Translated Play\n\n");
        for scene in self.load_scenes()? {
            out.push_str(&format!("## ACT {}\n\n", scene.act.to_uppercase()));
            out.push_str(&format!("### SCENE {}\n\n", scene.scene.to_uppercase()));
            out.push_str("| Shakespearean Text | Source References | Modern Text |\n");
            out.push_str("|-------------------|-------------------|------------|\n");
            for row in &scene.rows {
                let refs = if row.formatted_references.is_empty() {
                    row.reference_labels()
                } else {
                    row.formatted_references.clone()
                };
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    md_cell(&row.text),
                    md_cell(&refs.join("<br>")),
                    md_cell(&row.original_modern_line)
                ));
            }
            out.push_str("\n---\n\n");
        }
        self.write(file_name, &out)
    }

    pub fn format_html(&self, file_name: &str) -> Result<PathBuf> {
        let mut out = String::from(HTML_HEAD);
        for scene in self.load_scenes()? {
            out.push_str(&format!("    <h2>ACT {}</h2>\n", scene.act.to_uppercase()));
            out.push_str(&format!("    <h3>SCENE {}</h3>\n", scene.scene.to_uppercase()));
            out.push_str("    <table>\n        <tr>\n");
            out.push_str("            <th class=\"shakespeare\">Shakespearean Text</th>\n");
            out.push_str("            <th class=\"references\">Source References</th>\n");
            out.push_str("            <th class=\"modern\">Modern Text</th>\n");
            out.push_str("        </tr>\n");
            for row in &scene.rows {
                let refs: Vec<String> = row.reference_labels().iter().map(|r| html_escape(r)).collect();
                out.push_str("        <tr>\n");
                out.push_str(&format!("            <td class=\"shakespeare\">{}</td>\n", html_escape(&row.text)));
                out.push_str(&format!("            <td class=\"references\">{}</td>\n", refs.join("<br>")));
                out.push_str(&format!("            <td class=\"modern\">{}</td>\n", html_escape(&row.original_modern_line)));
                out.push_str("        </tr>\n");
            }
            out.push_str("    </table>\n    <div class=\"separator\"></div>\n");
        }
        out.push_str("</body>\n</html>");
        self.write(file_name, &out)
    }

    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, content)?;
        info!("Formatted play saved to {:?}", path);
        Ok(path)
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }
}

fn md_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

fn html_escape(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Translated Shakespeare Play</title>
    <style>
        body { font-family: 'Garamond', serif; margin: 40px; line-height: 1.6; }
        h1 { text-align: center; margin-bottom: 40px; }
        h2 { color: #4a4a4a; margin-top: 30px; }
        h3 { color: #666; }
        table { width: 100%; border-collapse: collapse; margin-bottom: 30px; }
        th { background-color: #f2f2f2; padding: 10px; text-align: left; border-bottom: 2px solid #ddd; }
        td { padding: 10px; border-bottom: 1px solid #ddd; vertical-align: top; }
        .shakespeare { width: 40%; }
        .references { width: 20%; font-size: 0.9em; color: #666; }
        .modern { width: 40%; }
        .separator { margin: 40px 0; border-top: 1px dashed #ccc; }
    </style>
</head>
<body>
    <h1>Translated Shakespeare Play</h1>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_saver::SceneSaver;
    use bard_core::{SearchType, TranslatedLine};

    fn line(text: &str, modern: &str) -> TranslatedLine {
        TranslatedLine {
            text: text.to_string(),
            temp_ids: vec!["line_1".to_string()],
            references: vec![Reference {
                temp_id: "line_1".to_string(),
                title: "AS YOU LIKE IT".to_string(),
                act: Some("II".to_string()),
                scene: Some("VII".to_string()),
                line: 139,
                word_index: "0,5".to_string(),
            }],
            original_modern_line: modern.to_string(),
            search_type: SearchType::Hybrid,
            is_failsafe: false,
        }
    }

    #[test]
    fn test_markdown_orders_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let saver = SceneSaver::new(dir.path().join("json"), 5).unwrap();
        saver.save_scene("II", "1", &[line("All the world's a stage", "Life is a show")], None).unwrap();
        saver.save_scene("I", "2", &[line("And all the men and women merely players", "We act")], None).unwrap();
        std::fs::write(dir.path().join("json/notes.json"), "{}").unwrap();

        let formatter = PlayFormatter::new(dir.path().join("json"), dir.path().join("formatted")).unwrap();
        let path = formatter.format_markdown(DEFAULT_MARKDOWN_FILE).unwrap();
        let md = std::fs::read_to_string(path).unwrap();

        assert!(md.starts_with("# The Translated Play\n\n## ACT I\n\n### SCENE 2\n\n"));
        let first = md.find("## ACT I\n").unwrap();
        let second = md.find("## ACT II\n").unwrap();
        assert!(first < second);
        assert!(md.contains("| All the world's a stage | AS YOU LIKE IT (II.VII.139) | Life is a show |"));
        assert_eq!(md.matches("\n---\n").count(), 2);
    }

    #[test]
    fn test_html_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let saver = SceneSaver::new(dir.path(), 5).unwrap();
        saver.save_scene("1", "1", &[line("<exit>", "bye")], None).unwrap();

        let formatter = PlayFormatter::new(dir.path(), dir.path().join("html")).unwrap();
        let html = std::fs::read_to_string(formatter.format_html(DEFAULT_HTML_FILE).unwrap()).unwrap();
        assert!(html.contains("<td class=\"shakespeare\">&lt;exit&gt;</td>"));
        assert!(html.contains("<h2>ACT 1</h2>"));
        assert!(html.ends_with("</html>"));
    }
}
