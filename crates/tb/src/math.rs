//! Equation renderer selected by configuration.

use tb_config::Config;
use tb_math::{
    CachedRenderer, CommandRenderer, DelimitedTexRenderer, EquationCache, EquationRenderer,
    FileEquationCache, MathError, NullEquationCache,
};

/// Renderer used by the CLI.
///
/// An external command when `math.command` is set, memoized through the
/// persisted cache; delimited TeX otherwise.
pub(crate) enum MathRenderer {
    Command(CachedRenderer<CommandRenderer>),
    Delimited(DelimitedTexRenderer),
}

impl MathRenderer {
    pub(crate) fn from_config(config: &Config, version: &str) -> Self {
        let Some(program) = &config.math.command else {
            return Self::Delimited(DelimitedTexRenderer);
        };

        let command = CommandRenderer::new(program.clone())
            .with_args(config.math.args.clone())
            .with_inline_args(config.math.inline_args.clone());
        let cache: Box<dyn EquationCache> = if config.cache_resolved.enabled {
            let dir = config.cache_resolved.equations_dir();
            tracing::info!(dir = %dir.display(), "using equation cache");
            Box::new(FileEquationCache::new(dir, version))
        } else {
            Box::new(NullEquationCache)
        };
        Self::Command(CachedRenderer::new(command, cache))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Command(_) => "external command".to_owned(),
            Self::Delimited(_) => "delimited TeX".to_owned(),
        }
    }
}

impl EquationRenderer for MathRenderer {
    async fn render(&self, source: &str, inline: bool) -> Result<String, MathError> {
        match self {
            Self::Command(renderer) => renderer.render(source, inline).await,
            Self::Delimited(renderer) => renderer.render(source, inline).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_default_config_uses_delimited_tex() {
        let renderer = MathRenderer::from_config(&Config::default(), "test");
        assert_eq!(renderer.describe(), "delimited TeX");
        assert_eq!(
            renderer.render("x", true).await.unwrap(),
            r#"<span class="math">\(x\)</span>"#
        );
    }
}
