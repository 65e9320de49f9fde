//! Bard CLI - translate modern lines into Shakespeare's own words and write
//! new plays scene by scene.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bard_app::{
    BardApp, ProjectParams, SceneParams, SearchParams, ToolResult, TranslateFileParams, TranslateLineParams,
};
use bard_core::{ApiKeys, BardConfig};
use bard_playwright::{CharacterVoices, SceneSummary};

/// Bard - modern lines in Shakespeare's words, and new plays in his manner
#[derive(Parser)]
#[command(name = "bard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (overrides the configured one)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Configuration file (default: ~/.config/bard/config.toml, then ./bard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file and create the quote database
    Init,

    /// Split a plays text into lines, phrases and fragments
    Chunk {
        /// Plain-text collected works
        input: PathBuf,

        /// Directory for lines.json, phrases.json and fragments.json
        #[arg(short, long, default_value = "data/processed_chunks")]
        output: PathBuf,
    },

    /// Embed chunk files into the quote database
    Ingest {
        /// Directory holding the chunk files
        #[arg(default_value = "data/processed_chunks")]
        corpus_dir: PathBuf,

        /// Re-embed everything, even unchanged chunks
        #[arg(short, long)]
        force: bool,
    },

    /// Find Shakespearean quotes for a modern line
    Search {
        /// Modern line
        line: String,

        /// Maximum number of results per level
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Combine vector and keyword search
        #[arg(long)]
        hybrid: bool,
    },

    /// Translate modern text into Shakespearean quotes
    Translate {
        #[command(subcommand)]
        action: TranslateAction,
    },

    /// Manage translation sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Format a session's translated scenes as Markdown and HTML
    Format {
        /// Translation session id
        translation_id: String,

        /// Output directory (default: the session's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write new plays
    Play {
        #[command(subcommand)]
        action: PlayAction,
    },

    /// Show statistics
    Stats,
}

#[derive(Subcommand)]
enum TranslateAction {
    /// Translate a single line
    Line {
        /// Modern line
        line: String,

        /// Session to record the translation in (a new one if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Override the configured hybrid setting
        #[arg(long)]
        hybrid: Option<bool>,
    },

    /// Translate a scene file of modern lines
    File {
        /// Scene file, e.g. act_i_scene_1.md
        path: PathBuf,

        /// Session to record the translation in (a new one if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Output directory for the translated scene
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Translate again even if the output exists
        #[arg(short, long)]
        force: bool,

        /// Combine vector and keyword search
        #[arg(long)]
        hybrid: bool,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List translation sessions
    List,

    /// Create a translation session
    Create {
        /// Directory for the session's output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a translation session
    Delete {
        /// Translation session id
        translation_id: String,
    },
}

#[derive(Subcommand)]
enum PlayAction {
    /// Create a play project
    New {
        /// Play title
        title: String,

        /// Thematic guidelines for every scene
        #[arg(short, long, default_value = "")]
        guidelines: String,

        /// JSON file mapping character names to voice descriptions
        #[arg(long)]
        voices: Option<PathBuf>,
    },

    /// Add or replace a scene in a project
    AddScene {
        /// Project id
        project_id: String,

        /// Act label, e.g. I
        act: String,

        /// Scene label, e.g. 1
        scene: String,

        /// What happens in the scene
        overview: String,

        #[arg(long, default_value = "")]
        setting: String,

        /// Characters on stage (repeatable)
        #[arg(long = "character")]
        characters: Vec<String>,

        #[arg(long, default_value = "")]
        instructions: String,
    },

    /// Expand scene summaries into a detailed story outline
    Expand {
        /// Scene summaries JSON file
        summaries: PathBuf,

        /// Character voices JSON file
        voices: PathBuf,
    },

    /// Write scenes of the working story, or of a project
    Write {
        /// Project to write (the working story if omitted)
        #[arg(short, long)]
        project: Option<String>,

        /// Act of the single project scene to write
        #[arg(long, requires = "scene")]
        act: Option<String>,

        /// Scene of the single project scene to write
        #[arg(long, requires = "act")]
        scene: Option<String>,

        /// Scene length: short, medium or long
        #[arg(short, long)]
        length: Option<String>,
    },

    /// Revise a written scene against a critique
    Adjust {
        /// Scene Markdown file
        path: PathBuf,

        /// What to change
        critique: String,

        /// Directory for the revision (default: final_edits)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Combine written scenes into one play file
    Combine {
        /// Project to combine (the working directory if omitted)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// List play projects
    List,

    /// Delete a play project
    Delete {
        /// Project id
        project_id: String,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&Path>, database: Option<PathBuf>) -> Result<BardConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) if path.exists() => BardConfig::load(path)?,
        Some(path) => {
            tracing::warn!("Config file {:?} not found, using defaults", path);
            BardConfig::default()
        }
        None => BardConfig::load_default()?,
    };
    if let Some(database) = database {
        config.database.path = database;
    }
    Ok(config)
}

fn config_path(path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path {
        return path;
    }
    dirs::config_dir()
        .map(|dir| dir.join("bard").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("bard.toml"))
}

fn report(result: ToolResult) {
    if result.success {
        println!("{}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        std::process::exit(1);
    }
}

fn read_voices(path: &Path) -> Result<CharacterVoices, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.database)?;

    // Chunking and init need no models.
    match cli.command {
        Commands::Init => {
            let path = config_path(cli.config);
            init(&config, &path)?;
            return Ok(());
        }
        Commands::Chunk { input, output } => {
            report(BardApp::chunk_corpus(&input, &output));
            return Ok(());
        }
        command => {
            let app = get_app(config)?;
            run(&app, command).await?;
        }
    }

    Ok(())
}

fn init(config: &BardConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Using existing configuration at: {}", path.display());
    } else {
        config.save(path)?;
        println!("Wrote configuration to: {}", path.display());
    }

    let _app = get_app(config.clone())?;
    println!("Initialized database at: {}", config.database.path.display());
    Ok(())
}

fn get_app(config: BardConfig) -> Result<BardApp, Box<dyn std::error::Error>> {
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let keys = ApiKeys::resolve(Path::new(".env"));
    Ok(BardApp::new(config, &keys)?)
}

async fn run(app: &BardApp, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init | Commands::Chunk { .. } => {}
        Commands::Ingest { corpus_dir, force } => {
            report(app.ingest(&corpus_dir, force).await);
        }
        Commands::Search { line, top_k, hybrid } => {
            report(app.search(SearchParams { line, top_k, hybrid }).await);
        }
        Commands::Translate { action } => match action {
            TranslateAction::Line { line, session, hybrid } => {
                let params = TranslateLineParams {
                    line,
                    translation_id: session,
                    hybrid,
                };
                report(app.translate_line(params).await);
            }
            TranslateAction::File {
                path,
                session,
                output,
                force,
                hybrid,
            } => {
                let params = TranslateFileParams {
                    path,
                    translation_id: session,
                    output_dir: output,
                    force,
                    hybrid,
                };
                report(app.translate_file(params).await);
            }
        },
        Commands::Session { action } => match action {
            SessionAction::List => report(app.list_sessions()),
            SessionAction::Create { output } => report(app.create_session(output.as_deref())),
            SessionAction::Delete { translation_id } => report(app.delete_session(&translation_id)),
        },
        Commands::Format { translation_id, output } => {
            report(app.format_play(&translation_id, output.as_deref()));
        }
        Commands::Play { action } => play(app, action).await?,
        Commands::Stats => report(app.stats().await),
    }
    Ok(())
}

async fn play(app: &BardApp, action: PlayAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PlayAction::New {
            title,
            guidelines,
            voices,
        } => {
            let character_voices = match voices {
                Some(path) => read_voices(&path)?,
                None => CharacterVoices::new(),
            };
            report(app.create_project(ProjectParams {
                title,
                thematic_guidelines: guidelines,
                character_voices,
            }));
        }
        PlayAction::AddScene {
            project_id,
            act,
            scene,
            overview,
            setting,
            characters,
            instructions,
        } => {
            let mut summary = SceneSummary::new(act, scene, overview);
            summary.setting = setting;
            summary.characters = characters;
            summary.additional_instructions = instructions;
            report(app.add_scene(SceneParams {
                project_id,
                scene: summary,
            }));
        }
        PlayAction::Expand { summaries, voices } => {
            report(app.expand_story(&summaries, &voices).await);
        }
        PlayAction::Write {
            project,
            act,
            scene,
            length,
        } => {
            let act_scene = act.as_deref().zip(scene.as_deref());
            report(app.write_scenes(project.as_deref(), act_scene, length.as_deref()).await);
        }
        PlayAction::Adjust { path, critique, output } => {
            report(app.adjust_scene(&path, &critique, output.as_deref()).await);
        }
        PlayAction::Combine { project } => report(app.combine_scenes(project.as_deref())),
        PlayAction::List => report(app.list_projects()),
        PlayAction::Delete { project_id } => report(app.delete_project(&project_id)),
    }
    Ok(())
}
