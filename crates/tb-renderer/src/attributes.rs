//! `{...}` attribute shorthands.
//!
//! An element whose leading text starts with `{tag.class(attr=1)}` gets the
//! shorthand removed and rendered through the templating helper. A rendered
//! plain `div` donates its attributes to the element; any other element
//! replaces it and adopts its content.

use std::sync::LazyLock;

use regex::Regex;

use crate::context::Session;
use crate::dom::{TreeNode, parse_fragment};

static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([^}]+)\}").expect("invalid attribute shorthand regex"));

/// Elements whose content is never scanned for shorthands.
const OPAQUE: &[&str] = &["svg", "pre", "code", "script", "style"];

/// Apply attribute shorthands throughout the tree.
///
/// Targets are collected children-first before anything is modified, so a
/// replaced element never invalidates a pending path.
pub(crate) fn inject_attributes(root: &mut TreeNode, session: &mut Session<'_>) {
    let mut targets = Vec::new();
    let mut prefix = Vec::new();
    collect_postorder(root, &mut prefix, &mut targets);

    for path in targets {
        if let Some(node) = root.at_mut(&path) {
            apply_shorthand(node, session);
        }
    }
}

fn collect_postorder(node: &TreeNode, prefix: &mut Vec<usize>, targets: &mut Vec<Vec<usize>>) {
    for (index, child) in node.children.iter().enumerate() {
        prefix.push(index);
        if !OPAQUE.iter().any(|tag| child.is(tag)) {
            collect_postorder(child, prefix, targets);
        }
        targets.push(prefix.clone());
        prefix.pop();
    }
}

fn apply_shorthand(node: &mut TreeNode, session: &mut Session<'_>) {
    let Some(caps) = SHORTHAND.captures(&node.text) else {
        return;
    };
    let shorthand = caps[0].to_owned();
    let body = caps[1].to_owned();

    let Some(rendered) = render_element(&body, session) else {
        session.warn(
            format!("attribute shorthand did not render to an element in <{}>", node.tag),
            Some(&shorthand),
        );
        return;
    };

    node.text.drain(..shorthand.len());

    if rendered.is("div") && !body.starts_with("div") {
        node.add_classes(rendered.classes());
        for (key, value) in &rendered.attrs {
            if key != "class" {
                node.set_attr(key, value.clone());
            }
        }
    } else {
        let original = std::mem::take(node);
        let mut replacement = rendered;
        replacement.append_text(&original.text);
        replacement.children.extend(original.children);
        replacement.tail = original.tail;
        *node = replacement;
    }
}

fn render_element(body: &str, session: &Session<'_>) -> Option<TreeNode> {
    let html = session.templates.render(body, session.base_dir).ok()?;
    let parsed = parse_fragment(&html);
    parsed.children.into_iter().next()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dom::to_html;
    use crate::options::CompileOptions;
    use crate::template::TagTemplates;

    fn inject(html: &str) -> (String, usize) {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let mut root = parse_fragment(html);
        inject_attributes(&mut root, &mut session);
        (to_html(&root, false), session.warnings.len())
    }

    #[test]
    fn test_div_attributes_merge() {
        assert_eq!(
            inject(r#"<p class="a">{.b.c(data-x="1")} Text <em>x</em></p>"#).0,
            r#"<p class="a b c" data-x="1"> Text <em>x</em></p>"#
        );
    }

    #[test]
    fn test_element_replaces_node() {
        assert_eq!(
            inject(r#"<p>{x-anim(data-when="1")}Go <b>now</b></p>tail"#).0,
            r#"<x-anim data-when="1">Go <b>now</b></x-anim>tail"#
        );
    }

    #[test]
    fn test_explicit_div_replaces() {
        assert_eq!(
            inject("<li>{div.box}Item</li>").0,
            r#"<div class="box">Item</div>"#
        );
    }

    #[test]
    fn test_nested_nodes_processed_children_first() {
        assert_eq!(
            inject("<ul><li>{.x}A</li><li>{span.y}B</li></ul>").0,
            r#"<ul><li class="x">A</li><span class="y">B</span></ul>"#
        );
    }

    #[test]
    fn test_opaque_content_untouched() {
        let html = r#"<svg><g>{.x}</g></svg><pre><code>{"a": 1}</code></pre>"#;
        assert_eq!(inject(html), (html.to_owned(), 0));
    }

    #[test]
    fn test_failed_shorthand_leaves_node() {
        let (html, warnings) = inject("<p>{if x} y</p>");
        assert_eq!(html, "<p>{if x} y</p>");
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let (once, _) = inject(r#"<p>{.wide}A</p><div>{x-b}<i>c</i></div>"#);
        let (twice, warnings) = inject(&once);
        assert_eq!(once, twice);
        assert_eq!(warnings, 0);
    }
}
