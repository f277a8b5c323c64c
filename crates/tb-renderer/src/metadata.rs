//! Key/value metadata blocks written as block quotes.
//!
//! ```text
//! > id: intro
//! > goals: slider-a slider-b
//! > sectionStatus: dev
//! ```
//!
//! Blocks are parsed as YAML mappings. Known keys are lifted into typed
//! fields; everything else is kept in [`Metadata::extra`].

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Error parsing a metadata block.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Not valid YAML.
    #[error("invalid metadata: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Valid YAML, but not a key/value mapping.
    #[error("metadata must be a key/value mapping")]
    NotMapping,

    /// A key that is not a string.
    #[error("metadata key {0} is not a string")]
    Key(String),

    /// A known key with a value of the wrong shape.
    #[error("metadata key `{key}` {message}")]
    Value {
        /// The key.
        key: String,
        /// What is wrong with the value.
        message: &'static str,
    },
}

/// Metadata of a document or step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Step id override.
    pub id: Option<String>,
    /// Step class list.
    pub class: Option<String>,
    /// Explicit goal ids.
    pub goals: Option<Vec<String>>,
    /// Section id override for a section starting in this step.
    pub section: Option<String>,
    /// Status of a section starting in this step.
    pub section_status: Option<String>,
    /// Background of the current section.
    pub section_background: Option<String>,
    /// Document title override.
    pub title: Option<String>,
    /// Unrecognized keys.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// Merge `other` into `self`; keys present in `other` win.
    pub fn merge(&mut self, other: Metadata) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.id, other.id);
        take(&mut self.class, other.class);
        take(&mut self.section, other.section);
        take(&mut self.section_status, other.section_status);
        take(&mut self.section_background, other.section_background);
        take(&mut self.title, other.title);
        if other.goals.is_some() {
            self.goals = other.goals;
        }
        self.extra.extend(other.extra);
    }

    /// Split a block at the top of a document into its document part
    /// (`title` and free-form keys) and its first-step part.
    pub(crate) fn split_document(self) -> (Metadata, Metadata) {
        let document = Metadata {
            title: self.title,
            extra: self.extra,
            ..Metadata::default()
        };
        let step = Metadata {
            id: self.id,
            class: self.class,
            goals: self.goals,
            section: self.section,
            section_status: self.section_status,
            section_background: self.section_background,
            ..Metadata::default()
        };
        (document, step)
    }
}

/// Parse a metadata block.
///
/// An empty block yields empty metadata.
pub fn parse_metadata(source: &str) -> Result<Metadata, MetadataError> {
    let mapping = match serde_yaml::from_str::<Value>(source)? {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(Metadata::default()),
        _ => return Err(MetadataError::NotMapping),
    };

    let mut meta = Metadata::default();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(MetadataError::Key(display_key(&key)));
        };
        match key.as_str() {
            "id" => meta.id = Some(scalar(&key, &value)?),
            "class" => meta.class = Some(scalar(&key, &value)?),
            "goals" => meta.goals = Some(goal_list(&key, &value)?),
            "section" => meta.section = Some(scalar(&key, &value)?),
            "sectionStatus" => meta.section_status = Some(scalar(&key, &value)?),
            "sectionBackground" => meta.section_background = Some(scalar(&key, &value)?),
            "title" => meta.title = Some(scalar(&key, &value)?),
            _ => {
                let json = serde_json::to_value(&value).map_err(|_| MetadataError::Value {
                    key: key.clone(),
                    message: "cannot be represented as JSON",
                })?;
                meta.extra.insert(key, json);
            }
        }
    }
    Ok(meta)
}

fn scalar(key: &str, value: &Value) -> Result<String, MetadataError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(MetadataError::Value {
            key: key.to_owned(),
            message: "must be a string",
        }),
    }
}

/// Goals as a space-separated string or a list.
fn goal_list(key: &str, value: &Value) -> Result<Vec<String>, MetadataError> {
    match value {
        Value::Sequence(items) => items.iter().map(|item| scalar(key, item)).collect(),
        Value::Null => Ok(Vec::new()),
        other => Ok(scalar(key, other)?
            .split_whitespace()
            .map(str::to_owned)
            .collect()),
    }
}

fn display_key(key: &Value) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_known_keys() {
        let meta = parse_metadata(
            "id: intro\nclass: wide dark\ngoals: a b\nsection: start\nsectionStatus: dev\nsectionBackground: blue",
        )
        .unwrap();
        assert_eq!(meta.id.as_deref(), Some("intro"));
        assert_eq!(meta.class.as_deref(), Some("wide dark"));
        assert_eq!(meta.goals, Some(vec!["a".to_owned(), "b".to_owned()]));
        assert_eq!(meta.section.as_deref(), Some("start"));
        assert_eq!(meta.section_status.as_deref(), Some("dev"));
        assert_eq!(meta.section_background.as_deref(), Some("blue"));
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_goal_list_and_extra() {
        let meta = parse_metadata("goals: [x, y]\nauthor: Ada\nlevel: 3").unwrap();
        assert_eq!(meta.goals, Some(vec!["x".to_owned(), "y".to_owned()]));
        assert_eq!(meta.extra["author"], serde_json::json!("Ada"));
        assert_eq!(meta.extra["level"], serde_json::json!(3));
    }

    #[test]
    fn test_numeric_id() {
        let meta = parse_metadata("id: 12").unwrap();
        assert_eq!(meta.id.as_deref(), Some("12"));
    }

    #[test]
    fn test_empty_block() {
        assert_eq!(parse_metadata("").unwrap(), Metadata::default());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_metadata("Just a quote."),
            Err(MetadataError::NotMapping)
        ));
        assert!(matches!(
            parse_metadata("id: [a, b]"),
            Err(MetadataError::Value { .. })
        ));
        assert!(matches!(parse_metadata("1: a"), Err(MetadataError::Key(_))));
        assert!(matches!(
            parse_metadata("a: [unclosed"),
            Err(MetadataError::Yaml(_))
        ));
    }

    #[test]
    fn test_split_document() {
        let meta = parse_metadata("title: Optics\nid: intro\ngoals: a\nauthor: Ada").unwrap();
        let (document, step) = meta.split_document();
        assert_eq!(document.title.as_deref(), Some("Optics"));
        assert_eq!(document.extra["author"], serde_json::json!("Ada"));
        assert_eq!(document.id, None);
        assert_eq!(step.id.as_deref(), Some("intro"));
        assert_eq!(step.goals, Some(vec!["a".to_owned()]));
        assert_eq!(step.title, None);
        assert!(step.extra.is_empty());
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut meta = parse_metadata("id: a\nclass: x\nk: 1").unwrap();
        meta.merge(parse_metadata("class: y\nk: 2").unwrap());
        assert_eq!(meta.id.as_deref(), Some("a"));
        assert_eq!(meta.class.as_deref(), Some("y"));
        assert_eq!(meta.extra["k"], serde_json::json!(2));
    }
}
