//! `tb build` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tb_config::{CliSettings, Config};
use tb_renderer::{CompileOutput, Compiler, CrossReferences, Document, plain_text};
use tokio::task::JoinSet;

use super::compile_options;
use crate::error::CliError;
use crate::math::MathRenderer;
use crate::output::Output;

/// Chapter source file inside each chapter directory.
const CHAPTER_FILE: &str = "content.md";

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover textbook.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content directory with one subdirectory per chapter (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// External equation renderer program (overrides config).
    #[arg(long)]
    math_command: Option<String>,

    /// Also write a plain-text rendition of every chapter.
    #[arg(long)]
    text: bool,

    /// Disable the equation cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// `data.json` of a chapter.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChapterData<'a> {
    #[serde(flatten)]
    document: &'a Document,
    references: &'a CrossReferences,
}

/// A chapter directory and its source.
struct Chapter {
    id: String,
    dir: PathBuf,
    source: String,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a chapter cannot be read or
    /// written, or a chapter has a fatal compile error.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            cache_enabled: self.no_cache.then_some(false),
            math_command: self.math_command,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source_dir = &config.content_resolved.source_dir;
        let output_dir = &config.content_resolved.output_dir;

        let renderer = MathRenderer::from_config(&config, version);
        output.info(&format!("Source: {}", source_dir.display()));
        output.info(&format!("Output: {}", output_dir.display()));
        output.info(&format!("Equations: {}", renderer.describe()));

        let chapters = find_chapters(source_dir)?;
        if chapters.is_empty() {
            return Err(CliError::Validation(format!(
                "no chapters ({CHAPTER_FILE}) found in {}",
                source_dir.display()
            )));
        }

        let compiler = Arc::new(Compiler::new(renderer).with_options(compile_options(&config)));
        let mut tasks = JoinSet::new();
        for chapter in chapters {
            let compiler = Arc::clone(&compiler);
            tasks.spawn(async move {
                let result = compiler
                    .compile(&chapter.id, &chapter.source, &chapter.dir)
                    .await;
                (chapter, result)
            });
        }

        let mut compiled = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (chapter, result) = joined.map_err(|e| CliError::Task(e.to_string()))?;
            let compile_output = result.map_err(|source| CliError::Compile {
                path: chapter.dir.join(CHAPTER_FILE),
                source,
            })?;
            compiled.push((chapter, compile_output));
        }
        compiled.sort_by(|a, b| a.0.id.cmp(&b.0.id));

        let mut warnings = 0;
        for (chapter, compile_output) in &compiled {
            for warning in &compile_output.warnings {
                output.warning(
                    &format!("{}: {}", chapter.id, warning.message),
                    warning.snippet.as_deref(),
                );
            }
            warnings += compile_output.warnings.len();

            let text = self.text.then(|| plain_text(&chapter.source));
            write_chapter(
                &output_dir.join(&chapter.id),
                compile_output,
                text.as_deref(),
            )?;
            tracing::info!(chapter = %chapter.id, "chapter written");
        }

        output.success(&format!(
            "Built {} chapter(s) to {} with {warnings} warning(s)",
            compiled.len(),
            output_dir.display()
        ));
        Ok(())
    }
}

/// Chapter directories under `source_dir`, sorted by name.
fn find_chapters(source_dir: &Path) -> Result<Vec<Chapter>, CliError> {
    let mut chapters = Vec::new();
    for entry in std::fs::read_dir(source_dir)? {
        let dir = entry?.path();
        let file = dir.join(CHAPTER_FILE);
        if !file.is_file() {
            continue;
        }
        let Some(id) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        chapters.push(Chapter {
            id: id.to_owned(),
            source: std::fs::read_to_string(&file)?,
            dir,
        });
    }
    chapters.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(chapters)
}

/// Write `data.json`, `steps/*.html`, `sections/*.html` and optionally
/// `content.txt` into `dir`.
fn write_chapter(dir: &Path, output: &CompileOutput, text: Option<&str>) -> Result<(), CliError> {
    let steps_dir = dir.join("steps");
    let sections_dir = dir.join("sections");
    std::fs::create_dir_all(&steps_dir)?;
    std::fs::create_dir_all(&sections_dir)?;

    let data = ChapterData {
        document: &output.document,
        references: &output.references,
    };
    std::fs::write(dir.join("data.json"), serde_json::to_string_pretty(&data)?)?;

    for (id, html) in &output.steps_html {
        std::fs::write(steps_dir.join(format!("{id}.html")), html)?;
    }
    for (id, html) in &output.sections_html {
        std::fs::write(sections_dir.join(format!("{id}.html")), html)?;
    }
    if let Some(text) = text {
        std::fs::write(dir.join("content.txt"), text)?;
    }
    Ok(())
}
