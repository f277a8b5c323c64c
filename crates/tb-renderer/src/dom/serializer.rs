//! HTML serializer with optional whitespace minification.
//!
//! Minification collapses every run of whitespace in text to a single space
//! (never to nothing) outside `pre`, `textarea`, `script` and `style`.
//! Comments are already gone after parsing.

use std::fmt::Write;

use super::TreeNode;
use super::parser::is_void;

/// Elements whose text must be kept verbatim.
const PRESERVE_WHITESPACE: &[&str] = &["pre", "textarea", "script", "style"];

/// Elements whose text is written without escaping.
const RAW_TEXT: &[&str] = &["script", "style"];

/// Serialize the content of a fragment root.
pub fn to_html(root: &TreeNode, minify: bool) -> String {
    inner_html(root, minify)
}

/// Serialize an element's content: its text and children with their tails.
pub fn inner_html(node: &TreeNode, minify: bool) -> String {
    let mut serializer = Serializer::new(minify);
    serializer.preserve = usize::from(preserves(node));
    serializer.raw = RAW_TEXT.iter().any(|tag| node.is(tag));
    serializer.content(node);
    serializer.out
}

/// Serialize an element including its tags, without its tail.
pub fn outer_html(node: &TreeNode, minify: bool) -> String {
    let mut serializer = Serializer::new(minify);
    serializer.element(node);
    serializer.out
}

fn preserves(node: &TreeNode) -> bool {
    PRESERVE_WHITESPACE.iter().any(|tag| node.is(tag))
}

struct Serializer {
    out: String,
    minify: bool,
    /// Depth of whitespace-preserving ancestors.
    preserve: usize,
    /// Inside a raw-text element.
    raw: bool,
}

impl Serializer {
    fn new(minify: bool) -> Self {
        Self {
            out: String::with_capacity(1024),
            minify,
            preserve: 0,
            raw: false,
        }
    }

    fn element(&mut self, node: &TreeNode) {
        self.out.push('<');
        self.out.push_str(&node.tag);
        for (key, value) in &node.attrs {
            write!(self.out, r#" {key}="{}""#, escape(value, true)).unwrap();
        }
        self.out.push('>');

        if is_void(&node.tag) && node.text.is_empty() && node.children.is_empty() {
            return;
        }

        let preserve = preserves(node);
        if preserve {
            self.preserve += 1;
        }
        let raw = std::mem::replace(&mut self.raw, RAW_TEXT.iter().any(|tag| node.is(tag)));
        self.content(node);
        self.raw = raw;
        if preserve {
            self.preserve -= 1;
        }

        write!(self.out, "</{}>", node.tag).unwrap();
    }

    fn content(&mut self, node: &TreeNode) {
        self.text(&node.text);
        for child in &node.children {
            self.element(child);
            self.text(&child.tail);
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.raw {
            self.out.push_str(text);
            return;
        }
        let escaped = escape(text, false);
        if self.minify && self.preserve == 0 {
            collapse_whitespace(&escaped, &mut self.out);
        } else {
            self.out.push_str(&escaped);
        }
    }
}

/// Collapse runs of ASCII whitespace into one space.
fn collapse_whitespace(text: &str, out: &mut String) {
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
}

/// Escape text or attribute values the way html5ever's serializer does.
fn escape(text: &str, attribute: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if attribute => result.push_str("&quot;"),
            '\u{00a0}' => result.push_str("&nbsp;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn test_roundtrip_keeps_structure() {
        let html = r#"<p class="a">x <em>y</em> z<br>w</p><div></div>"#;
        let root = parse_fragment(html);
        assert_eq!(to_html(&root, false), html);
    }

    #[test]
    fn test_minify_collapses_whitespace_conservatively() {
        let root = parse_fragment("<div>\n  <p>a   b</p>\n\n  <p>c</p>\n</div>");
        assert_eq!(
            to_html(&root, true),
            "<div> <p>a b</p> <p>c</p> </div>"
        );
    }

    #[test]
    fn test_minify_preserves_pre() {
        let root = parse_fragment("<pre><code>a\n    b</code></pre><p>x\n y</p>");
        assert_eq!(
            to_html(&root, true),
            "<pre><code>a\n    b</code></pre><p>x y</p>"
        );
    }

    #[test]
    fn test_escaping() {
        let mut node = TreeNode::new("span").with_text("a < b & c\u{00a0}d");
        node.set_attr("title", r#"say "hi""#);
        assert_eq!(
            outer_html(&node, false),
            r#"<span title="say &quot;hi&quot;">a &lt; b &amp; c&nbsp;d</span>"#
        );
    }

    #[test]
    fn test_script_and_style_are_not_escaped() {
        let html = "<script>if (a < b && c) { go(); }</script><style>a > b { }</style>";
        assert_eq!(to_html(&parse_fragment(html), true), html);
    }

    #[test]
    fn test_outer_html_excludes_tail() {
        let mut node = TreeNode::new("b").with_text("x");
        node.tail = "after".to_owned();
        assert_eq!(outer_html(&node, false), "<b>x</b>");
    }

    #[test]
    fn test_inner_html() {
        let root = parse_fragment("<div>a<i>b</i>c</div>");
        assert_eq!(inner_html(&root.children[0], false), "a<i>b</i>c");
    }
}
