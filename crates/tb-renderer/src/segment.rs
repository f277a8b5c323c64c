//! Partition of the rendered tree into steps and sections.
//!
//! The tree root holds one `x-step` per horizontal-rule-delimited unit. A
//! step whose first heading is a level-1 heading starts a new section; the
//! heading becomes the section title and is removed from the step. Steps
//! before the first section join it.

use std::collections::{BTreeMap, HashSet};

use crate::document::{Document, Section, Step};
use crate::dom::{TreeNode, outer_html};
use crate::error::{CompileError, IdKind};
use crate::goals::{step_goals, word_count};
use crate::metadata::Metadata;
use crate::options::DurationSettings;
use crate::util::section_slug;

/// Build the document model from a tree of `x-step` elements.
///
/// Sets `id`, `class` and `goals` attributes on every step container and
/// records its minified markup in [`Step::html`].
pub(crate) fn segment(
    root: &mut TreeNode,
    document_meta: Metadata,
    step_metas: &[Metadata],
    duration: &DurationSettings,
) -> Result<Document, CompileError> {
    let mut segmenter = Segmenter {
        title: document_meta.title,
        ..Segmenter::default()
    };

    let containers = root.children.iter_mut().filter(|node| node.is("x-step"));
    for (index, node) in containers.enumerate() {
        let meta = step_metas.get(index).cloned().unwrap_or_default();
        segmenter.add_step(index, node, meta)?;
    }

    Ok(segmenter.finish(document_meta.extra, duration))
}

#[derive(Default)]
struct Segmenter {
    title: Option<String>,
    sections: Vec<Section>,
    /// Words read per section, parallel to `sections`.
    words: Vec<usize>,
    steps: Vec<Step>,
    /// Steps seen before the first section.
    orphans: Vec<(usize, usize)>,
    /// Background requested before the first section.
    orphan_background: Option<String>,
    step_ids: HashSet<String>,
    section_ids: HashSet<String>,
}

impl Segmenter {
    fn add_step(
        &mut self,
        index: usize,
        node: &mut TreeNode,
        meta: Metadata,
    ) -> Result<(), CompileError> {
        let id = meta.id.clone().unwrap_or_else(|| format!("step-{index}"));
        claim_id(&mut self.step_ids, IdKind::Step, &id)?;

        node.set_attr("id", &id);
        if let Some(class) = &meta.class {
            node.set_attr("class", class);
        }
        let explicit = meta.goals.clone().unwrap_or_default();
        if !explicit.is_empty() {
            node.set_attr("goals", explicit.join(" "));
        }

        if let Some(heading) = take_section_heading(node) {
            self.start_section(heading, &meta)?;
        }
        if let Some(background) = meta.section_background {
            match self.sections.last_mut() {
                Some(section) => section.background = Some(background),
                None => self.orphan_background = Some(background),
            }
        }

        let goals = step_goals(node, &explicit);
        let words = word_count(node);
        let section_id = self.sections.last().map(|s| s.id.clone());

        match self.sections.last_mut() {
            Some(section) => {
                section.step_ids.push(id.clone());
                section.goal_count += goals.len();
                if let Some(total) = self.words.last_mut() {
                    *total += words;
                }
            }
            None => self.orphans.push((self.steps.len(), words)),
        }

        self.steps.push(Step {
            id,
            class_name: meta.class,
            section_id,
            goals,
            html: outer_html(node, true),
            metadata: meta.extra,
        });
        Ok(())
    }

    fn start_section(&mut self, title: String, meta: &Metadata) -> Result<(), CompileError> {
        let id = meta.section.clone().unwrap_or_else(|| section_slug(&title));
        claim_id(&mut self.section_ids, IdKind::Section, &id)?;

        tracing::debug!(section = %id, "section started");
        if self.title.is_none() {
            self.title = Some(title.clone());
        }
        let background = if self.sections.is_empty() {
            self.orphan_background.take()
        } else {
            None
        };
        self.sections.push(Section {
            id,
            title,
            status: meta.section_status.clone().unwrap_or_default(),
            background,
            ..Section::default()
        });
        self.words.push(0);
        Ok(())
    }

    fn finish(
        mut self,
        metadata: BTreeMap<String, serde_json::Value>,
        duration: &DurationSettings,
    ) -> Document {
        if let (Some(first), Some(words)) = (self.sections.first_mut(), self.words.first_mut()) {
            for (position, (step_index, step_words)) in self.orphans.iter().enumerate() {
                let step = &mut self.steps[*step_index];
                step.section_id = Some(first.id.clone());
                first.step_ids.insert(position, step.id.clone());
                first.goal_count += step.goals.len();
                *words += step_words;
            }
        }

        for (section, words) in self.sections.iter_mut().zip(&self.words) {
            section.duration_minutes = duration.estimate(*words, section.goal_count);
        }

        Document {
            title: self.title.unwrap_or_default(),
            total_goals: self.sections.iter().map(|s| s.goal_count).sum(),
            sections: self.sections,
            steps: self.steps,
            metadata,
        }
    }
}

/// Record `id`, rejecting reserved characters and repeats.
fn claim_id(taken: &mut HashSet<String>, kind: IdKind, id: &str) -> Result<(), CompileError> {
    if id.contains('.') {
        return Err(CompileError::InvalidId {
            kind,
            id: id.to_owned(),
        });
    }
    if !taken.insert(id.to_owned()) {
        return Err(CompileError::DuplicateId {
            kind,
            id: id.to_owned(),
        });
    }
    Ok(())
}

/// Remove the step's first heading if it is level 1 and return its text.
fn take_section_heading(step: &mut TreeNode) -> Option<String> {
    let path = step.find_path(&is_heading)?;
    let heading = step.at(&path)?;
    if !heading.is("h1") {
        return None;
    }
    let title = heading.text_content().trim().to_owned();

    let (&index, parent_path) = path.split_last()?;
    step.at_mut(parent_path)?.remove_child(index);
    Some(title)
}

fn is_heading(node: &TreeNode) -> bool {
    ["h1", "h2", "h3", "h4", "h5", "h6"]
        .iter()
        .any(|tag| node.is(tag))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dom::parse_fragment;
    use crate::metadata::parse_metadata;

    fn run(html: &str, metas: &[&str]) -> Result<Document, CompileError> {
        let mut root = parse_fragment(html);
        let metas: Vec<Metadata> = metas.iter().map(|m| parse_metadata(m).unwrap()).collect();
        segment(
            &mut root,
            Metadata::default(),
            &metas,
            &DurationSettings::default(),
        )
    }

    #[test]
    fn test_sections_and_steps() {
        let document = run(
            concat!(
                "<x-step><p>Preface</p></x-step>",
                "<x-step><h1>Light &amp; Colour</h1><p><x-blank></x-blank></p></x-step>",
                "<x-step><p>More</p></x-step>",
                "<x-step><h1>End</h1></x-step>",
            ),
            &["", "sectionStatus: dev", "id: more\nclass: wide"],
        )
        .unwrap();

        assert_eq!(document.title, "Light & Colour");
        let ids: Vec<&str> = document.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["light--colour", "end"]);
        assert_eq!(
            document.sections[0].step_ids,
            vec!["step-0", "step-1", "more"]
        );
        assert_eq!(document.sections[0].status, "dev");
        assert_eq!(document.sections[0].goal_count, 1);
        assert_eq!(document.total_goals, 1);
        assert_eq!(document.steps[0].section_id.as_deref(), Some("light--colour"));
        assert_eq!(document.steps[2].class_name.as_deref(), Some("wide"));
        assert_eq!(
            document.steps[2].html,
            r#"<x-step id="more" class="wide"><p>More</p></x-step>"#
        );
        assert_eq!(document.steps[3].html, r#"<x-step id="step-3"></x-step>"#);
    }

    #[test]
    fn test_heading_only_starts_section_when_first() {
        let document = run("<x-step><h2>Sub</h2><h1>Late</h1></x-step>", &[]).unwrap();
        assert!(document.sections.is_empty());
        assert_eq!(document.steps[0].section_id, None);
    }

    #[test]
    fn test_section_overrides() {
        let document = run(
            "<x-step><h1>Intro</h1></x-step><x-step></x-step>",
            &["section: start", "sectionBackground: blue"],
        )
        .unwrap();
        assert_eq!(document.sections[0].id, "start");
        assert_eq!(document.sections[0].background.as_deref(), Some("blue"));
    }

    #[test]
    fn test_explicit_goals_attribute() {
        let document = run("<x-step><x-var></x-var></x-step>", &["goals: a b"]).unwrap();
        assert_eq!(document.steps[0].goals, vec!["a", "b", "var-0"]);
        assert!(document.steps[0].html.starts_with(r#"<x-step id="step-0" goals="a b">"#));
    }

    #[test]
    fn test_invalid_and_duplicate_ids() {
        let err = run("<x-step></x-step>", &["id: a.b"]).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidId { kind: IdKind::Step, ref id } if id == "a.b"
        ));

        let err = run("<x-step><h1>A</h1></x-step>", &["section: a.b"]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidId { kind: IdKind::Section, .. }));

        let err = run("<x-step></x-step><x-step></x-step>", &["id: x", "id: x"]).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateId { kind: IdKind::Step, .. }));
    }

    #[test]
    fn test_no_sections() {
        let document = run("<x-step><p><x-blank></x-blank></p></x-step>", &[]).unwrap();
        assert_eq!(document.steps.len(), 1);
        assert!(document.sections.is_empty());
        assert_eq!(document.total_goals, 0);
        assert_eq!(document.title, "");
    }
}
