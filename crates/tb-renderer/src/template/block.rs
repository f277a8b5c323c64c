//! Indentation tree and block-level constructs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::tag::{Scope, Tag, Value, evaluate, interpolate, split_arguments};
use super::{MAX_DEPTH, ReadFileFn, TemplateError};

/// Keywords of the full language that are not supported.
const UNSUPPORTED: &[&str] = &[
    "if", "else", "unless", "each", "for", "while", "case", "when", "default", "extends",
    "append", "prepend", "yield", "doctype", "-", "=", "!=",
];

/// One source line with its indented children.
#[derive(Debug, Clone)]
struct Node {
    line: usize,
    indent: usize,
    content: String,
    children: Vec<Node>,
}

/// Build the indentation tree. Blank lines are skipped.
fn parse_lines(source: &str) -> Vec<Node> {
    let mut roots = Vec::new();
    let mut stack: Vec<Node> = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }
        let indent = raw.len() - raw.trim_start().len();
        while stack.last().is_some_and(|top| top.indent >= indent) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(Node {
            line: index + 1,
            indent,
            content: content.to_owned(),
            children: Vec::new(),
        });
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }
    roots
}

fn close_top(stack: &mut Vec<Node>, roots: &mut Vec<Node>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Children of a text-block tag, re-indented relative to the first level.
fn raw_text(children: &[Node]) -> String {
    let base = children.iter().map(|c| c.indent).min().unwrap_or(0);
    let mut lines = Vec::new();
    collect_raw(children, base, &mut lines);
    lines.join("\n")
}

fn collect_raw(nodes: &[Node], base: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let pad = " ".repeat(node.indent.saturating_sub(base));
        lines.push(format!("{pad}{}", node.content));
        collect_raw(&node.children, base, lines);
    }
}

struct Mixin {
    params: Vec<String>,
    body: Vec<Node>,
    dir: PathBuf,
}

/// Lexical context of the nodes being rendered.
struct Context {
    scope: Scope,
    /// Caller's block inside a mixin body.
    block: Option<String>,
    /// Directory for resolving includes.
    dir: PathBuf,
}

pub(super) struct BlockRenderer<'a> {
    base_dir: &'a Path,
    read_file: &'a ReadFileFn,
    mixins: HashMap<String, Rc<Mixin>>,
    depth: usize,
}

impl<'a> BlockRenderer<'a> {
    pub(super) fn new(base_dir: &'a Path, read_file: &'a ReadFileFn) -> Self {
        Self {
            base_dir,
            read_file,
            mixins: HashMap::new(),
            depth: 0,
        }
    }

    pub(super) fn render_source(&mut self, source: &str) -> Result<String, TemplateError> {
        let nodes = parse_lines(source);
        let context = Context {
            scope: Scope::new(),
            block: None,
            dir: self.base_dir.to_path_buf(),
        };
        let mut out = String::new();
        self.render_nodes(&nodes, &context, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node],
        context: &Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let mut previous_text = false;
        for node in nodes {
            let is_text = node.content.starts_with('|') || node.content.starts_with('<');
            if is_text && previous_text {
                out.push('\n');
            }
            self.render_node(node, context, out)?;
            if !node.content.starts_with("//") {
                previous_text = is_text;
            }
        }
        Ok(())
    }

    fn render_node(
        &mut self,
        node: &Node,
        context: &Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let content = node.content.as_str();

        if content.starts_with("//") {
            return Ok(());
        }
        if let Some(text) = content.strip_prefix('|') {
            let text = text.strip_prefix(' ').unwrap_or(text);
            out.push_str(&interpolate(text, &context.scope, node.line)?);
            return self.render_nodes(&node.children, context, out);
        }
        if content.starts_with('<') {
            out.push_str(&interpolate(content, &context.scope, node.line)?);
            return self.render_nodes(&node.children, context, out);
        }

        let keyword = content
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        match keyword {
            "mixin" => self.define_mixin(node, context),
            "block" if content == "block" => {
                out.push_str(context.block.as_deref().unwrap_or_default());
                Ok(())
            }
            "include" => self.include(node, context, out),
            k if k.starts_with('+') => self.call_mixin(node, context, out),
            k if UNSUPPORTED.contains(&k) => Err(TemplateError::syntax(
                node.line,
                format!("unsupported construct `{k}`"),
            )),
            _ => {
                let tag = Tag::parse(content, &context.scope, node.line)?;
                let inner = if tag.text_block {
                    interpolate(&raw_text(&node.children), &context.scope, node.line)?
                } else {
                    let mut inner = String::new();
                    self.render_nodes(&node.children, context, &mut inner)?;
                    inner
                };
                out.push_str(&tag.render(&inner)?);
                Ok(())
            }
        }
    }

    fn define_mixin(&mut self, node: &Node, context: &Context) -> Result<(), TemplateError> {
        let signature = node.content["mixin".len()..].trim();
        let (name, params) = split_call(signature, node.line)?;
        if name.is_empty() {
            return Err(TemplateError::syntax(node.line, "mixin without a name"));
        }
        let mixin = Mixin {
            params: params.into_iter().map(str::to_owned).collect(),
            body: node.children.clone(),
            dir: context.dir.clone(),
        };
        self.mixins.insert(name.to_owned(), Rc::new(mixin));
        Ok(())
    }

    fn call_mixin(
        &mut self,
        node: &Node,
        context: &Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let (name, args) = split_call(&node.content[1..], node.line)?;
        let mixin = self
            .mixins
            .get(name)
            .map(Rc::clone)
            .ok_or_else(|| TemplateError::UnknownMixin(name.to_owned()))?;

        let mut scope = Scope::new();
        for (index, param) in mixin.params.iter().enumerate() {
            let value = match args.get(index) {
                Some(arg) => evaluate(arg, &context.scope, node.line)?,
                None => Value::Null,
            };
            scope.insert(param.clone(), value);
        }

        let mut block = String::new();
        self.render_nodes(&node.children, context, &mut block)?;

        let inner = Context {
            scope,
            block: Some(block),
            dir: mixin.dir.clone(),
        };
        self.nested(|this| this.render_nodes(&mixin.body, &inner, out))
    }

    fn include(
        &mut self,
        node: &Node,
        context: &Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let target = node.content["include".len()..].trim();
        if target.is_empty() {
            return Err(TemplateError::syntax(node.line, "include without a path"));
        }
        let mut path = context.dir.join(target);
        if path.extension().is_none() {
            path.set_extension("pug");
        }
        let source = (self.read_file)(&path).map_err(|e| TemplateError::Include {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if path.extension().is_some_and(|ext| ext != "pug") {
            out.push_str(&source);
            return Ok(());
        }

        let included = Context {
            scope: context.scope.clone(),
            block: context.block.clone(),
            dir: path.parent().map_or_else(|| context.dir.clone(), Path::to_path_buf),
        };
        let nodes = parse_lines(&source);
        self.nested(|this| this.render_nodes(&nodes, &included, out))
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, TemplateError>,
    ) -> Result<T, TemplateError> {
        if self.depth >= MAX_DEPTH {
            return Err(TemplateError::Recursion);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Split `name(a, b)` into the name and its argument list.
fn split_call(source: &str, line: usize) -> Result<(&str, Vec<&str>), TemplateError> {
    let Some(open) = source.find('(') else {
        if source.contains(char::is_whitespace) {
            return Err(TemplateError::syntax(line, format!("unexpected text in `{source}`")));
        }
        return Ok((source, Vec::new()));
    };
    let name = source[..open].trim();
    let rest = &source[open + 1..];
    let Some(close) = rest.rfind(')') else {
        return Err(TemplateError::syntax(line, "unterminated argument list"));
    };
    if !rest[close + 1..].trim().is_empty() {
        return Err(TemplateError::syntax(
            line,
            format!("unexpected `{}` after arguments", rest[close + 1..].trim()),
        ));
    }
    Ok((name, split_arguments(&rest[..close])))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_lines_nesting() {
        let nodes = parse_lines("a\n  b\n    c\n  d\n\ne");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(nodes[0].children[0].children[0].content, "c");
        assert_eq!(nodes[0].children[1].line, 4);
        assert_eq!(nodes[1].content, "e");
    }

    #[test]
    fn test_raw_text_reindents() {
        let nodes = parse_lines("p.\n    one\n      two\n    three");
        assert_eq!(raw_text(&nodes[0].children), "one\n  two\nthree");
    }

    #[test]
    fn test_split_call() {
        assert_eq!(split_call("card", 1).unwrap(), ("card", vec![]));
        assert_eq!(
            split_call("card(\"a (b)\", x)", 1).unwrap(),
            ("card", vec!["\"a (b)\"", "x"])
        );
        assert!(split_call("card(a", 1).is_err());
        assert!(split_call("card(a) text", 1).is_err());
    }

    #[test]
    fn test_missing_mixin_arguments_are_null() {
        let read: &ReadFileFn = &|_| Ok(String::new());
        let html = BlockRenderer::new(Path::new("."), read)
            .render_source("mixin m(a, b)\n  i(title=b) #{a}\n+m(\"x\")")
            .unwrap();
        assert_eq!(html, "<i>x</i>");
    }

    #[test]
    fn test_include_non_template_is_raw() {
        let read: &ReadFileFn = &|path| Ok(format!("<svg>{}</svg>", path.display()));
        let html = BlockRenderer::new(Path::new("/b"), read)
            .render_source("div\n  include icon.svg")
            .unwrap();
        assert_eq!(html, "<div><svg>/b/icon.svg</svg></div>");
    }
}
