//! Compile output types.
//!
//! Everything here serializes to camelCase JSON, the shape consumed by the
//! textbook front end.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Structured model of a compiled document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Title from metadata or the first level-1 heading.
    pub title: String,
    /// Sections in source order.
    pub sections: Vec<Section>,
    /// Steps in source order.
    pub steps: Vec<Step>,
    /// Sum of all section goal counts.
    pub total_goals: usize,
    /// Free-form document metadata.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A group of consecutive steps starting at a level-1 heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Section id (slug of the title unless overridden).
    pub id: String,
    /// Heading text.
    pub title: String,
    /// Status from `sectionStatus` metadata, empty by default.
    pub status: String,
    /// Background from `sectionBackground` metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Number of goals across the section's steps.
    pub goal_count: usize,
    /// Estimated minutes.
    pub duration_minutes: u32,
    /// Ids of the section's steps.
    pub step_ids: Vec<String>,
}

/// The smallest navigable unit, delimited by horizontal rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step id (`step-<index>` unless overridden).
    pub id: String,
    /// Classes from metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Owning section; `None` when the document has no sections.
    pub section_id: Option<String>,
    /// Goal ids, explicit ones first.
    pub goals: Vec<String>,
    /// Minified markup of the step container.
    #[serde(skip)]
    pub html: String,
    /// Free-form step metadata.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Identifiers referenced through `gloss:` and `bio:` links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossReferences {
    /// Glossary term ids.
    pub glossary: BTreeSet<String>,
    /// Biography ids.
    pub bios: BTreeSet<String>,
}

impl CrossReferences {
    /// Add all identifiers from `other`.
    pub fn extend(&mut self, other: CrossReferences) {
        self.glossary.extend(other.glossary);
        self.bios.extend(other.bios);
    }
}

/// A recoverable problem that did not stop compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// What went wrong.
    pub message: String,
    /// The offending source or markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Result of compiling one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    /// Structured document model.
    pub document: Document,
    /// Markup per step id.
    pub steps_html: BTreeMap<String, String>,
    /// Concatenated step markup per section id.
    pub sections_html: BTreeMap<String, String>,
    /// Cross-references used by the document.
    pub references: CrossReferences,
    /// Recoverable problems, in detection order.
    pub warnings: Vec<Warning>,
}

/// Result of compiling a snippet without steps or sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentOutput {
    /// Minified markup.
    pub html: String,
    /// Cross-references used by the snippet.
    pub references: CrossReferences,
    /// Recoverable problems.
    pub warnings: Vec<Warning>,
}
