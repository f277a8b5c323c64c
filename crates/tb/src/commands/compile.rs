//! `tb compile` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use tb_config::{CliSettings, Config};
use tb_renderer::Compiler;

use super::compile_options;
use crate::error::CliError;
use crate::math::MathRenderer;
use crate::output::Output;

/// Arguments for the compile command.
#[derive(Args)]
pub(crate) struct CompileArgs {
    /// Markdown file to compile.
    file: PathBuf,

    /// Document id used in resource URLs (default: the chapter directory name).
    #[arg(long)]
    id: Option<String>,

    /// Compile as a fragment without steps or sections.
    #[arg(long)]
    fragment: bool,

    /// Print compact instead of pretty JSON.
    #[arg(long)]
    compact: bool,

    /// Path to configuration file (default: auto-discover textbook.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External equation renderer program (overrides config).
    #[arg(long)]
    math_command: Option<String>,

    /// Disable the equation cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CompileArgs {
    /// Execute the compile command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the file cannot be read or
    /// the document has a fatal compile error.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            cache_enabled: self.no_cache.then_some(false),
            math_command: self.math_command.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let json = self.compile_to_json(&config, version).await?;
        output.data(&json)?;
        Ok(())
    }

    async fn compile_to_json(&self, config: &Config, version: &str) -> Result<String, CliError> {
        let source = std::fs::read_to_string(&self.file)?;
        let base_dir = self.file.parent().unwrap_or(Path::new("."));
        let compiler = Compiler::new(MathRenderer::from_config(config, version))
            .with_options(compile_options(config));
        let compile_error = |source| CliError::Compile {
            path: self.file.clone(),
            source,
        };

        let value = if self.fragment {
            let fragment = compiler
                .compile_fragment(&source, base_dir)
                .await
                .map_err(compile_error)?;
            serde_json::to_value(fragment)?
        } else {
            let id = self.id.clone().unwrap_or_else(|| document_id(&self.file));
            let compiled = compiler
                .compile(&id, &source, base_dir)
                .await
                .map_err(compile_error)?;
            serde_json::to_value(compiled)?
        };

        Ok(if self.compact {
            serde_json::to_string(&value)?
        } else {
            serde_json::to_string_pretty(&value)?
        })
    }
}

/// Chapter directory name for `content.md`, the file stem otherwise.
fn document_id(file: &Path) -> String {
    let name = if file.file_name().is_some_and(|name| name == "content.md") {
        file.parent().and_then(Path::file_name)
    } else {
        file.file_stem()
    };
    name.map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(file: PathBuf, fragment: bool) -> CompileArgs {
        CompileArgs {
            file,
            id: None,
            fragment,
            compact: true,
            config: None,
            math_command: None,
            no_cache: true,
            verbose: false,
        }
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(Path::new("content/circles/content.md")), "circles");
        assert_eq!(document_id(Path::new("hints.md")), "hints");
    }

    #[tokio::test]
    async fn test_compile_document_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("light").join("content.md");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "# Light\n\n![beam](images/beam.png)").unwrap();

        let json = args(file, false)
            .compile_to_json(&Config::default(), "test")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["document"]["title"], "Light");
        let step = value["stepsHtml"]["step-0"].as_str().unwrap();
        assert!(step.contains(r#"src="/resources/light/images/beam.png""#));
    }

    #[tokio::test]
    async fn test_compile_fragment_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hint.md");
        std::fs::write(&file, "See [bio](bio:euler).").unwrap();

        let json = args(file, true)
            .compile_to_json(&Config::default(), "test")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["references"]["bios"], serde_json::json!(["euler"]));
        assert_eq!(
            value["html"],
            r#"<p>See <x-bio xid="euler">bio</x-bio>.</p>"#
        );
    }
}
