//! HTML fragment parser built on html5ever.
//!
//! Author HTML is parsed the way a browser parses it: implied end tags,
//! unquoted attributes, bare `<` and `&` in text and raw-text `script` and
//! `style` bodies all follow the HTML5 tree construction rules. The
//! resulting reference-counted DOM is then copied into a [`TreeNode`] tree.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::TreeNode;

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether `tag` is an HTML void element.
pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

/// Parse an HTML fragment into a tree under an anonymous root.
///
/// The fragment is parsed as the content of a document body. Comments,
/// processing instructions and doctypes are dropped.
pub fn parse_fragment(html: &str) -> TreeNode {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .one(wrapped.as_bytes());

    let mut root = TreeNode::default();
    if let Some(body) = find_element(&dom.document, "body") {
        append_children(&mut root, &body);
    }
    root
}

fn find_element(handle: &Handle, name: &str) -> Option<Handle> {
    if let NodeData::Element { name: qname, .. } = &handle.data
        && &*qname.local == name
    {
        return Some(Handle::clone(handle));
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, name))
}

fn append_children(parent: &mut TreeNode, handle: &Handle) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => parent.append_text(&contents.borrow()),
            NodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let mut node = TreeNode::new(&*name.local);
                for attr in attrs.borrow().iter() {
                    let key = match &attr.name.prefix {
                        Some(prefix) => format!("{prefix}:{}", attr.name.local),
                        None => attr.name.local.to_string(),
                    };
                    node.set_attr(&key, attr.value.to_string());
                }
                // Template content lives in a separate document fragment
                let contents = template_contents.borrow();
                append_children(&mut node, contents.as_ref().unwrap_or(child));
                parent.children.push(node);
            }
            _ => {}
        }
    }
}
