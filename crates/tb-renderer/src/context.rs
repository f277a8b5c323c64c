//! Per-compile state.

use std::path::Path;

use tb_math::EquationTable;

use crate::document::{CrossReferences, Warning};
use crate::options::CompileOptions;
use crate::template::TemplateEngine;

/// Mutable state scoped to a single compile call.
///
/// Nothing in here outlives the call, so independent documents can be
/// compiled concurrently with the same [`Compiler`](crate::Compiler).
pub(crate) struct Session<'a> {
    pub(crate) document_id: &'a str,
    pub(crate) base_dir: &'a Path,
    pub(crate) options: &'a CompileOptions,
    pub(crate) templates: &'a dyn TemplateEngine,
    pub(crate) equations: EquationTable,
    pub(crate) references: CrossReferences,
    /// Mixin definitions from earlier template blocks.
    pub(crate) prelude: String,
    pub(crate) warnings: Vec<Warning>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        document_id: &'a str,
        base_dir: &'a Path,
        options: &'a CompileOptions,
        templates: &'a dyn TemplateEngine,
    ) -> Self {
        Self {
            document_id,
            base_dir,
            options,
            templates,
            equations: EquationTable::new(),
            references: CrossReferences::default(),
            prelude: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Log and record a recoverable problem.
    pub(crate) fn warn(&mut self, message: impl Into<String>, snippet: Option<&str>) {
        let message = message.into();
        tracing::warn!(
            document = self.document_id,
            snippet = snippet.unwrap_or_default(),
            "{message}"
        );
        self.warnings.push(Warning {
            message,
            snippet: snippet.map(str::to_owned),
        });
    }
}
