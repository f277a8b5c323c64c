//! Tree passes run after attribute injection.

use crate::context::Session;
use crate::dom::{TreeNode, inner_html, parse_fragment};
use crate::error::CompileError;
use crate::extensions::{Mode, TextbookHooks};
use crate::renderer::MarkdownRenderer;

/// Render the content of `.md` elements as Markdown.
///
/// The class is removed and a single wrapping paragraph is unwrapped, so
/// `<span class="md">*a*</span>` becomes `<span><em>a</em></span>`.
pub(crate) fn render_nested_markdown(
    root: &mut TreeNode,
    session: &mut Session<'_>,
) -> Result<(), CompileError> {
    while let Some(path) = root.find_path(&|node| node.has_class("md")) {
        let Some(node) = root.at_mut(&path) else {
            break;
        };
        node.remove_class("md");

        let source = inner_html(node, false);
        let mut hooks = TextbookHooks::new(session, Mode::Fragment);
        let html = MarkdownRenderer::new(&mut hooks).render(&source)?;
        let html = unwrap_paragraph(&html);

        let parsed = parse_fragment(html);
        node.text = parsed.text;
        node.children = parsed.children;
    }
    Ok(())
}

fn unwrap_paragraph(html: &str) -> &str {
    let html = html.strip_prefix("<p>").unwrap_or(html);
    html.strip_suffix("</p>").unwrap_or(html)
}

/// Move `parent="a b"` attributes onto the parent element as classes.
pub(crate) fn apply_parent_classes(root: &mut TreeNode) {
    for path in root.preorder_paths() {
        let Some(classes) = root.at_mut(&path).and_then(|node| node.remove_attr("parent")) else {
            continue;
        };
        if path.len() < 2 {
            continue;
        }
        if let Some(parent) = root.at_mut(&path[..path.len() - 1]) {
            parent.add_classes(classes.split_whitespace());
        }
    }
}

/// Drop empty table headers and apply table classes from marker rows.
///
/// A body row without text whose cell carries a class sets that class on
/// the table and is removed.
pub(crate) fn clean_tables(root: &mut TreeNode) {
    let empty_heads: Vec<Vec<usize>> = root
        .preorder_paths()
        .into_iter()
        .filter(|path| {
            root.at(path)
                .is_some_and(|node| node.is("thead") && node.text_content().trim().is_empty())
        })
        .collect();
    for path in empty_heads.iter().rev() {
        remove_at(root, path);
    }

    let mut marker_rows: Vec<Vec<usize>> = Vec::new();
    for path in root.preorder_paths() {
        let is_marker = root
            .at(&path)
            .is_some_and(|node| node.is("td") && node.has_attr("class"));
        if !is_marker || path.len() < 3 {
            continue;
        }
        let row = path[..path.len() - 1].to_vec();
        if marker_rows.last() != Some(&row) {
            marker_rows.push(row);
        }
    }

    for row_path in marker_rows.iter().rev() {
        let Some(row) = root.at(row_path) else {
            continue;
        };
        if !row.text_content().trim().is_empty() {
            continue;
        }
        let Some(class) = row
            .children
            .iter()
            .find(|cell| cell.is("td") && cell.has_attr("class"))
            .and_then(|cell| cell.attr("class"))
            .map(str::to_owned)
        else {
            continue;
        };
        let table_path = &row_path[..row_path.len() - 2];
        if let Some(table) = root.at_mut(table_path).filter(|node| node.is("table")) {
            table.set_attr("class", class);
            remove_at(root, row_path);
        }
    }
}

fn remove_at(root: &mut TreeNode, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    if let Some(parent) = root.at_mut(parent_path) {
        parent.remove_child(index);
    }
}
