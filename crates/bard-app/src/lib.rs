//! bard-app - Application facade
//!
//! [`BardApp`] owns the quote store, the embedder, the chat models and the
//! configuration, and exposes every user-facing operation as a tool that
//! returns a [`ToolResult`].
//!
//! # Tools
//!
//! - `bard_chunk` / `bard_ingest` - Build the quote corpus and load it
//! - `bard_search` - Candidate quotes for a modern line
//! - `bard_translate_line` / `bard_translate_file` - Translation
//! - `bard_sessions` - Translation session bookkeeping
//! - `bard_format` - Whole-play Markdown and HTML output
//! - `bard_play_*` - Playwright projects, generation, revision and combining
//! - `bard_stats` - Statistics about the quote store

mod app;

pub use app::{
    AppInfo, BardApp, ProjectParams, SceneParams, SearchParams, ToolInfo, ToolResult, TranslateFileParams,
    TranslateLineParams,
};
