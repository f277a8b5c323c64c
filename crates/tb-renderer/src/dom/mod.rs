//! Lightweight markup tree used by the post-parse passes.
//!
//! Text is stored lxml-style: `text` is the content before the first child
//! and `tail` the content following an element inside its parent. Attribute
//! order is preserved so serialized output is deterministic.

mod parser;
mod serializer;

pub(crate) use parser::is_void;
pub use parser::parse_fragment;
pub use serializer::{inner_html, outer_html, to_html};

/// Element in a parsed markup tree.
///
/// A fragment root has an empty tag and is never serialized itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    /// Element tag name, case preserved.
    pub tag: String,
    /// Text before the first child.
    pub text: String,
    /// Text after this element's end tag.
    pub tail: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create an element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Whether the tag matches `name`, ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.tag.eq_ignore_ascii_case(name)
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the attribute is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.to_owned(), value));
        }
    }

    /// Remove an attribute and return its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(key, _)| key == name)?;
        Some(self.attrs.remove(index).1)
    }

    /// Iterate over the class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Whether the element carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Add classes, skipping ones already present.
    pub fn add_classes<'a>(&mut self, classes: impl IntoIterator<Item = &'a str>) {
        let mut merged: Vec<String> = self.classes().map(str::to_owned).collect();
        for class in classes {
            if !class.is_empty() && !merged.iter().any(|c| c == class) {
                merged.push(class.to_owned());
            }
        }
        if !merged.is_empty() {
            self.set_attr("class", merged.join(" "));
        }
    }

    /// Remove a class, dropping the attribute once it is empty.
    pub fn remove_class(&mut self, class: &str) {
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }

    /// Concatenated text of this element and its descendants, without tail.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out, &|_| false);
        out
    }

    /// Text content skipping the subtrees for which `skip` returns true.
    pub(crate) fn collect_text(&self, out: &mut String, skip: &dyn Fn(&TreeNode) -> bool) {
        out.push_str(&self.text);
        for child in &self.children {
            if !skip(child) {
                child.collect_text(out, skip);
            }
            out.push_str(&child.tail);
        }
    }

    /// Append text after the last child (or to `text` when childless).
    pub fn append_text(&mut self, text: &str) {
        if let Some(last) = self.children.last_mut() {
            last.tail.push_str(text);
        } else {
            self.text.push_str(text);
        }
    }

    /// Remove child `index`, keeping its tail text in the document.
    pub fn remove_child(&mut self, index: usize) -> TreeNode {
        let mut child = self.children.remove(index);
        let tail = std::mem::take(&mut child.tail);
        if index == 0 {
            self.text.push_str(&tail);
        } else {
            self.children[index - 1].tail.push_str(&tail);
        }
        child
    }

    /// Get a descendant by child-index path.
    pub fn at(&self, path: &[usize]) -> Option<&TreeNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Get a mutable descendant by child-index path.
    pub fn at_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Paths of all descendants in pre-order (document order).
    pub fn preorder_paths(&self) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        collect_preorder(self, &mut prefix, &mut paths);
        paths
    }

    /// Path of the first descendant matching `predicate`, in document order.
    pub fn find_path(&self, predicate: &dyn Fn(&TreeNode) -> bool) -> Option<Vec<usize>> {
        self.preorder_paths()
            .into_iter()
            .find(|path| self.at(path).is_some_and(predicate))
    }

    /// All descendants matching `predicate`, in document order.
    pub fn select<'a>(&'a self, predicate: &dyn Fn(&TreeNode) -> bool) -> Vec<&'a TreeNode> {
        let mut found = Vec::new();
        select_into(self, predicate, &mut found);
        found
    }
}

fn collect_preorder(node: &TreeNode, prefix: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
    for (index, child) in node.children.iter().enumerate() {
        prefix.push(index);
        paths.push(prefix.clone());
        collect_preorder(child, prefix, paths);
        prefix.pop();
    }
}

fn select_into<'a>(
    node: &'a TreeNode,
    predicate: &dyn Fn(&TreeNode) -> bool,
    found: &mut Vec<&'a TreeNode>,
) {
    for child in &node.children {
        if predicate(child) {
            found.push(child);
        }
        select_into(child, predicate, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        // <div class="a">x<p>y</p>z<span>w</span></div>
        let mut p = TreeNode::new("p").with_text("y");
        p.tail = "z".to_owned();
        let span = TreeNode::new("span").with_text("w");
        let mut div = TreeNode::new("div")
            .with_text("x")
            .with_children(vec![p, span]);
        div.set_attr("class", "a");
        TreeNode::default().with_children(vec![div])
    }

    #[test]
    fn test_text_content() {
        assert_eq!(sample().text_content(), "xyzw");
    }

    #[test]
    fn test_class_helpers() {
        let mut root = sample();
        let div = &mut root.children[0];
        div.add_classes(["b", "a", "c"]);
        assert_eq!(div.attr("class"), Some("a b c"));
        assert!(div.has_class("b"));

        div.remove_class("a");
        div.remove_class("b");
        div.remove_class("c");
        assert!(!div.has_attr("class"));
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut node = TreeNode::new("x");
        node.set_attr("a", "1");
        node.set_attr("b", "2");
        node.set_attr("a", "3");
        assert_eq!(
            node.attrs,
            vec![("a".to_owned(), "3".to_owned()), ("b".to_owned(), "2".to_owned())]
        );
    }

    #[test]
    fn test_remove_child_keeps_tail() {
        let mut root = sample();
        let div = &mut root.children[0];
        let removed = div.remove_child(0);
        assert_eq!(removed.tag, "p");
        assert_eq!(div.text, "xz");
        assert_eq!(div.text_content(), "xzw");
    }

    #[test]
    fn test_paths_and_select() {
        let root = sample();
        assert_eq!(root.preorder_paths(), vec![vec![0], vec![0, 0], vec![0, 1]]);
        assert_eq!(root.find_path(&|n| n.is("span")), Some(vec![0, 1]));
        assert_eq!(root.at(&[0, 1]).map(|n| n.text.as_str()), Some("w"));
        assert_eq!(root.select(&|n| n.tag.len() == 1).len(), 1);
    }
}
