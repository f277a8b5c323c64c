//! Compile entry points.

use std::collections::BTreeMap;
use std::path::Path;

use tb_math::{EquationFailure, EquationRenderer};

use crate::attributes::inject_attributes;
use crate::context::Session;
use crate::directive::DirectivePreprocessor;
use crate::document::{CompileOutput, FragmentOutput};
use crate::dom::{TreeNode, parse_fragment, to_html};
use crate::error::CompileError;
use crate::extensions::{Mode, TextbookHooks};
use crate::inline::unescape;
use crate::options::CompileOptions;
use crate::postprocess::{apply_parent_classes, clean_tables, render_nested_markdown};
use crate::renderer::MarkdownRenderer;
use crate::segment::segment;
use crate::source::rewrite_source;
use crate::template::{TagTemplates, TemplateEngine};

/// Compiler for textbook Markdown.
///
/// Holds only configuration; all per-document state lives in the compile
/// call, so one compiler can serve concurrent compiles.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use tb_math::DelimitedTexRenderer;
/// use tb_renderer::Compiler;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let compiler = Compiler::new(DelimitedTexRenderer);
/// let output = compiler
///     .compile("circles", "# Circles\n\nA [[circle|square]].", Path::new("."))
///     .await
///     .unwrap();
///
/// assert_eq!(output.document.title, "Circles");
/// assert_eq!(output.document.steps[0].goals, vec!["blank-0"]);
/// # });
/// ```
pub struct Compiler<R> {
    renderer: R,
    templates: Box<dyn TemplateEngine>,
    options: CompileOptions,
}

impl<R: EquationRenderer> Compiler<R> {
    /// Create a compiler rendering equations with `renderer`.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            templates: Box::new(TagTemplates::new()),
            options: CompileOptions::default(),
        }
    }

    /// Use a different templating engine.
    #[must_use]
    pub fn with_templates(mut self, templates: impl TemplateEngine + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    /// Set compile options.
    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile options in use.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Equation renderer in use.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Compile a document.
    ///
    /// `document_id` namespaces asset URLs; `base_dir` resolves template
    /// includes.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed or duplicate step/section ids,
    /// directive bodies that are not valid tag syntax and template blocks
    /// that fail to render. Everything else becomes a warning.
    pub async fn compile(
        &self,
        document_id: &str,
        source: &str,
        base_dir: &Path,
    ) -> Result<CompileOutput, CompileError> {
        tracing::debug!(document = document_id, "compiling document");
        let mut session = self.session(document_id, base_dir);

        let source = rewrite_source(source, document_id, &self.options.resource_prefix);
        let source = self.expand_directives(&source, &mut session, base_dir)?;

        let mut hooks = TextbookHooks::new(&mut session, Mode::Document);
        let html = MarkdownRenderer::new(&mut hooks).render(&source)?;
        let (document_meta, step_metas) = hooks.into_metadata();

        let html = unescape(&html);
        let mut root = parse_fragment(&format!("<x-step>{html}</x-step>"));
        Self::rewrite_tree(&mut root, &mut session)?;

        let mut document = segment(
            &mut root,
            document_meta,
            &step_metas,
            &self.options.duration,
        )?;

        let mut parts: Vec<String> = document
            .steps
            .iter_mut()
            .map(|step| std::mem::take(&mut step.html))
            .collect();
        let failures = session
            .equations
            .resolve_all(&mut parts, &self.renderer)
            .await;
        record_failures(&mut session, failures);
        session.equations.clear();

        let mut steps_html = BTreeMap::new();
        let mut sections_html: BTreeMap<String, String> = BTreeMap::new();
        for (step, html) in document.steps.iter_mut().zip(parts) {
            if let Some(section) = &step.section_id {
                sections_html.entry(section.clone()).or_default().push_str(&html);
            }
            steps_html.insert(step.id.clone(), html.clone());
            step.html = html;
        }

        tracing::info!(
            document = document_id,
            steps = document.steps.len(),
            sections = document.sections.len(),
            goals = document.total_goals,
            warnings = session.warnings.len(),
            "compiled document"
        );

        Ok(CompileOutput {
            document,
            steps_html,
            sections_html,
            references: session.references,
            warnings: session.warnings,
        })
    }

    /// Compile a snippet (a hint, a glossary entry) without steps or
    /// sections.
    ///
    /// Rules and block quotes render as plain markup. The result is
    /// minified and has every equation resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if a template block fails to render.
    pub async fn compile_fragment(
        &self,
        source: &str,
        base_dir: &Path,
    ) -> Result<FragmentOutput, CompileError> {
        let mut session = self.session("", base_dir);

        let source = source.replace(r"\$", r"\\$");
        let html = {
            let mut hooks = TextbookHooks::new(&mut session, Mode::Fragment);
            MarkdownRenderer::new(&mut hooks).render(&source)?
        };

        let html = unescape(&html);
        let mut root = parse_fragment(&html);
        Self::rewrite_tree(&mut root, &mut session)?;

        let html = to_html(&root, true);
        let resolved = session.equations.resolve(&html, &self.renderer).await;
        record_failures(&mut session, resolved.failures);

        Ok(FragmentOutput {
            html: resolved.html,
            references: session.references,
            warnings: session.warnings,
        })
    }

    fn session<'a>(&'a self, document_id: &'a str, base_dir: &'a Path) -> Session<'a> {
        Session::new(document_id, base_dir, &self.options, self.templates.as_ref())
    }

    fn expand_directives(
        &self,
        source: &str,
        session: &mut Session<'_>,
        base_dir: &Path,
    ) -> Result<String, CompileError> {
        let mut preprocessor = DirectivePreprocessor::new(self.templates.as_ref(), base_dir);
        let expanded = preprocessor.process(source)?;
        for warning in preprocessor.into_warnings() {
            session.warn(warning, None);
        }
        Ok(expanded)
    }

    /// Tree passes shared by documents and fragments.
    fn rewrite_tree(root: &mut TreeNode, session: &mut Session<'_>) -> Result<(), CompileError> {
        inject_attributes(root, session);
        render_nested_markdown(root, session)?;
        apply_parent_classes(root);
        clean_tables(root);
        Ok(())
    }
}

fn record_failures(session: &mut Session<'_>, failures: Vec<EquationFailure>) {
    for failure in failures {
        session.warn(
            format!("equation failed to render: {}", failure.message),
            Some(&failure.source),
        );
    }
}
