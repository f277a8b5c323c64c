//! Goal ids and reading length of a step.

use std::collections::HashSet;

use crate::dom::TreeNode;

/// Interactive elements counted as goals, in assignment order.
#[derive(Debug, Clone, Copy)]
enum GoalKind {
    /// One id per matching element.
    Each(&'static str, fn(&TreeNode) -> bool),
    /// Every `.legend` of a slideshow except the first.
    Slides,
    /// Bare kind for the first element, numbered after that.
    Singleton(&'static str, &'static str),
    /// Picker items without `data-error`.
    Picker,
}

const GOAL_KINDS: &[GoalKind] = &[
    GoalKind::Each("blank", |n| n.is("x-blank") || n.is("x-blank-input")),
    GoalKind::Each("next", |n| n.has_class("next-step")),
    GoalKind::Each("var", |n| n.is("x-var")),
    GoalKind::Each("slider", |n| n.is("x-slider")),
    GoalKind::Each("sortable", |n| n.is("x-sortable")),
    GoalKind::Each("equation", |n| n.is("x-equation")),
    GoalKind::Slides,
    GoalKind::Singleton("gameplay", "x-gameplay"),
    GoalKind::Singleton("quill", "x-quill"),
    GoalKind::Singleton("code-checker", "x-code-checker"),
    GoalKind::Picker,
];

/// Elements whose text is not read.
const UNREAD: &[&str] = &["svg", "script", "style"];

/// Goal ids of a step: `explicit` first, then one generated id per
/// interactive element.
///
/// Generated ids are `<kind>-<n>`, counting per kind and skipping ids that
/// are already taken. Singleton widgets use the bare kind for their first
/// element and count from 1 after that. An element matching several kinds
/// counts once, for the first of them.
pub(crate) fn step_goals(step: &TreeNode, explicit: &[String]) -> Vec<String> {
    let mut goals = GoalIds::new(explicit);
    let mut elements = Elements::new(step);

    for kind in GOAL_KINDS {
        match *kind {
            GoalKind::Each(name, matches) => {
                let count = elements.claim(|node, _| matches(node));
                goals.push_numbered(name, 0, count);
            }
            GoalKind::Slides => {
                let mut shows: HashSet<Vec<usize>> = HashSet::new();
                let count = elements.claim(|node, path| {
                    if !node.has_class("legend") {
                        return false;
                    }
                    // The first legend of each slideshow is not a goal
                    nearest_ancestor(step, path, "x-slideshow")
                        .is_some_and(|show| !shows.insert(show.to_vec()))
                });
                goals.push_numbered("slide", 0, count);
            }
            GoalKind::Singleton(name, tag) => {
                let count = elements.claim(|node, _| node.is(tag));
                if count > 0 {
                    goals.push_singleton(name);
                    goals.push_numbered(name, 1, count - 1);
                }
            }
            GoalKind::Picker => {
                let count = elements.claim(|node, path| {
                    node.has_class("item")
                        && !node.has_attr("data-error")
                        && nearest_ancestor(step, path, "x-picker").is_some()
                });
                goals.push_numbered("picker", 0, count);
            }
        }
    }

    goals.ids
}

/// Descendants of a step in document order, each claimed by at most one
/// goal kind.
struct Elements<'a> {
    root: &'a TreeNode,
    paths: Vec<Vec<usize>>,
    claimed: Vec<bool>,
}

impl<'a> Elements<'a> {
    fn new(root: &'a TreeNode) -> Self {
        let paths = root.preorder_paths();
        let claimed = vec![false; paths.len()];
        Self {
            root,
            paths,
            claimed,
        }
    }

    /// Claim the unclaimed elements accepted by `matches` and return how
    /// many there were.
    ///
    /// `matches` sees every element in document order, claimed or not.
    fn claim(&mut self, mut matches: impl FnMut(&TreeNode, &[usize]) -> bool) -> usize {
        let mut count = 0;
        for (path, claimed) in self.paths.iter().zip(self.claimed.iter_mut()) {
            let Some(node) = self.root.at(path) else {
                continue;
            };
            if matches(node, path) && !*claimed {
                *claimed = true;
                count += 1;
            }
        }
        count
    }
}

/// Path of the closest proper ancestor of `path` with tag `tag`.
fn nearest_ancestor<'p>(root: &TreeNode, path: &'p [usize], tag: &str) -> Option<&'p [usize]> {
    (0..path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|prefix| root.at(prefix).is_some_and(|node| node.is(tag)))
}

/// Goal id list that never repeats an id.
struct GoalIds {
    ids: Vec<String>,
    taken: HashSet<String>,
}

impl GoalIds {
    fn new(explicit: &[String]) -> Self {
        let mut ids = GoalIds {
            ids: Vec::new(),
            taken: HashSet::new(),
        };
        for id in explicit {
            ids.push(id.clone());
        }
        ids
    }

    fn push(&mut self, id: String) {
        if self.taken.insert(id.clone()) {
            self.ids.push(id);
        }
    }

    fn push_singleton(&mut self, kind: &str) {
        if self.taken.contains(kind) {
            self.push_numbered(kind, 1, 1);
        } else {
            self.push(kind.to_owned());
        }
    }

    /// Push `count` ids `<kind>-<n>` with `n` counting up from `start`.
    fn push_numbered(&mut self, kind: &str, start: usize, count: usize) {
        let mut index = start;
        for _ in 0..count {
            while self.taken.contains(&format!("{kind}-{index}")) {
                index += 1;
            }
            self.push(format!("{kind}-{index}"));
            index += 1;
        }
    }
}

/// Number of words a reader sees in a step.
///
/// Element boundaries separate words.
pub(crate) fn word_count(step: &TreeNode) -> usize {
    let mut count = step.text.split_whitespace().count();
    for child in &step.children {
        if !UNREAD.iter().any(|tag| child.is(tag)) {
            count += word_count(child);
        }
        count += child.tail.split_whitespace().count();
    }
    count
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dom::parse_fragment;

    fn goals(html: &str, explicit: &[&str]) -> Vec<String> {
        let root = parse_fragment(html);
        let explicit: Vec<String> = explicit.iter().map(|s| (*s).to_owned()).collect();
        step_goals(&root, &explicit)
    }

    #[test]
    fn test_kind_order_and_numbering() {
        let html = concat!(
            r#"<x-slider></x-slider><p><x-blank-input></x-blank-input>"#,
            r#"<x-var></x-var><x-blank></x-blank></p><button class="next-step">Go</button>"#,
        );
        assert_eq!(
            goals(html, &[]),
            vec!["blank-0", "blank-1", "next-0", "var-0", "slider-0"]
        );
    }

    #[test]
    fn test_explicit_goals_come_first_and_are_skipped() {
        assert_eq!(
            goals("<x-blank></x-blank><x-blank></x-blank>", &["blank-0", "custom"]),
            vec!["blank-0", "custom", "blank-1", "blank-2"]
        );
    }

    #[test]
    fn test_slides_skip_first_legend() {
        let html = concat!(
            r#"<x-slideshow><div class="legend">1</div><div class="legend">2</div>"#,
            r#"<div class="legend">3</div></x-slideshow>"#,
            r#"<x-slideshow><div class="legend">only</div></x-slideshow>"#,
        );
        assert_eq!(goals(html, &[]), vec!["slide-0", "slide-1"]);
    }

    #[test]
    fn test_nested_slideshow_legends_counted_once() {
        let html = concat!(
            r#"<x-slideshow><div class="legend">a</div><div class="legend">b</div>"#,
            r#"<x-slideshow><div class="legend">c</div><div class="legend">d</div>"#,
            r#"<div class="legend">e</div></x-slideshow></x-slideshow>"#,
        );
        // b for the outer show, d and e for the inner one
        assert_eq!(goals(html, &[]), vec!["slide-0", "slide-1", "slide-2"]);
    }

    #[test]
    fn test_element_matching_two_kinds_counts_once() {
        assert_eq!(
            goals(r#"<x-var class="next-step"></x-var><x-var></x-var>"#, &[]),
            vec!["next-0", "var-0"]
        );
        assert_eq!(
            goals(r#"<x-picker><x-blank class="item"></x-blank></x-picker>"#, &[]),
            vec!["blank-0"]
        );
    }

    #[test]
    fn test_singletons_and_pickers() {
        let html = concat!(
            "<x-quill></x-quill><x-gameplay></x-gameplay><x-quill></x-quill>",
            r#"<x-picker><div class="item"></div><div class="item" data-error="e"></div>"#,
            r#"<div class="item"></div></x-picker>"#,
        );
        assert_eq!(
            goals(html, &[]),
            vec!["gameplay", "quill", "quill-1", "picker-0", "picker-1"]
        );
    }

    #[test]
    fn test_goal_ids_unique() {
        let ids = goals(
            "<x-quill></x-quill><x-quill></x-quill><x-var></x-var>",
            &["quill", "quill-0", "var-0"],
        );
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_word_count_skips_graphics() {
        let root = parse_fragment(
            "<p>One two <em>three</em></p><p>four</p><svg><text>ignored words</text></svg><script>x y</script>",
        );
        assert_eq!(word_count(&root), 4);
    }
}
