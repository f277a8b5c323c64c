//! Parsing and rendering of a single tag line.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::TemplateError;
use crate::dom::is_void;
use crate::util::escape_html;

static INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\)?([#!])\{([^}]*)\}").expect("invalid interpolation regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("invalid identifier regex"));

/// Variables visible to a template line.
pub(super) type Scope = HashMap<String, Value>;

/// Value of a variable or attribute expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Value {
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    fn to_text(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Null => String::new(),
        }
    }
}

/// Evaluate a literal or variable expression.
pub(super) fn evaluate(expr: &str, scope: &Scope, line: usize) -> Result<Value, TemplateError> {
    let expr = expr.trim();
    if expr.starts_with('"') || expr.starts_with('\'') {
        let mut cursor = Cursor::new(expr, line);
        let value = cursor.quoted()?;
        if !cursor.rest().trim().is_empty() {
            return Err(unsupported(expr, line));
        }
        return Ok(Value::Str(value));
    }
    match expr {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" | "undefined" => return Ok(Value::Null),
        _ => {}
    }
    if expr.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && expr.parse::<f64>().is_ok()
    {
        return Ok(Value::Str(expr.to_owned()));
    }
    if IDENTIFIER.is_match(expr) {
        return scope
            .get(expr)
            .cloned()
            .ok_or_else(|| TemplateError::UndefinedVariable(expr.to_owned()));
    }
    Err(unsupported(expr, line))
}

fn unsupported(expr: &str, line: usize) -> TemplateError {
    TemplateError::syntax(line, format!("unsupported expression `{expr}`"))
}

/// Replace `#{var}` (escaped) and `!{var}` (raw) in text.
///
/// A backslash before the marker keeps it literally.
pub(super) fn interpolate(text: &str, scope: &Scope, line: usize) -> Result<String, TemplateError> {
    if !text.contains('{') {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in INTERPOLATION.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&text[last..whole.start]);
        last = whole.end;
        if caps.get(1).is_some() {
            out.push_str(&caps[0][1..]);
            continue;
        }
        let value = evaluate(&caps[3], scope, line)?.to_text();
        if &caps[2] == "#" {
            out.push_str(&escape_html(&value));
        } else {
            out.push_str(&value);
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Split a comma-separated argument list, ignoring commas inside quotes.
pub(super) fn split_arguments(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ',' => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            None => {}
        }
    }
    let last = list[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// A parsed tag line such as `a#id.class(href="x"): b text`.
#[derive(Debug)]
pub(super) struct Tag {
    name: String,
    attrs: Vec<(String, Option<String>)>,
    /// Inline content, already interpolated.
    text: Option<String>,
    expansion: Option<Box<Tag>>,
    self_closing: bool,
    /// Trailing `.`: indented children are raw text.
    pub(super) text_block: bool,
    line: usize,
}

impl Tag {
    /// Parse a tag line.
    pub(super) fn parse(source: &str, scope: &Scope, line: usize) -> Result<Self, TemplateError> {
        let mut cursor = Cursor::new(source, line);
        Self::parse_at(&mut cursor, scope)
    }

    fn parse_at(cursor: &mut Cursor<'_>, scope: &Scope) -> Result<Self, TemplateError> {
        let line = cursor.line;
        let name = cursor.take_while(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let mut tag = Self {
            name: if name.is_empty() { "div".to_owned() } else { name.to_owned() },
            attrs: Vec::new(),
            text: None,
            expansion: None,
            self_closing: false,
            text_block: false,
            line,
        };

        if !name.is_empty() && !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(cursor.error(format!("invalid tag name `{name}`")));
        }
        match cursor.peek() {
            _ if !name.is_empty() => {}
            Some('.' | '#') => {}
            Some(c) => return Err(cursor.error(format!("unexpected `{c}` at start of tag"))),
            None => return Err(cursor.error("empty tag")),
        }

        loop {
            match cursor.peek() {
                Some('.') => {
                    cursor.advance();
                    match cursor.peek() {
                        None => {
                            tag.text_block = true;
                            break;
                        }
                        Some(c) if is_class_char(c) => {
                            let class = cursor.take_while(is_class_char);
                            tag.add_class(class);
                        }
                        Some(c) => return Err(cursor.error(format!("unexpected `{c}` after `.`"))),
                    }
                }
                Some('#') => {
                    cursor.advance();
                    let id = cursor.take_while(is_class_char);
                    if id.is_empty() {
                        return Err(cursor.error("expected id after `#`"));
                    }
                    tag.set_attr("id", Some(id.to_owned()));
                }
                Some('(') => {
                    cursor.advance();
                    tag.parse_attributes(cursor, scope)?;
                }
                _ => break,
            }
        }

        let rest = cursor.rest();
        if tag.text_block || rest.is_empty() {
            // nothing follows
        } else if let Some(child) = rest.strip_prefix(": ") {
            let mut inner = Cursor::new(child.trim_start(), line);
            tag.expansion = Some(Box::new(Self::parse_at(&mut inner, scope)?));
        } else if let Some(text) = rest.strip_prefix(' ') {
            tag.text = Some(interpolate(text, scope, line)?);
        } else if let Some(expr) = rest.strip_prefix("!=") {
            tag.text = Some(evaluate(expr, scope, line)?.to_text());
        } else if let Some(expr) = rest.strip_prefix('=') {
            tag.text = Some(escape_html(&evaluate(expr, scope, line)?.to_text()));
        } else if rest == "/" {
            tag.self_closing = true;
        } else {
            return Err(cursor.error(format!("unexpected `{rest}` after tag")));
        }

        Ok(tag)
    }

    fn parse_attributes(&mut self, cursor: &mut Cursor<'_>, scope: &Scope) -> Result<(), TemplateError> {
        loop {
            cursor.take_while(|c| c.is_whitespace() || c == ',');
            match cursor.peek() {
                None => return Err(cursor.error("unterminated attribute list")),
                Some(')') => {
                    cursor.advance();
                    return Ok(());
                }
                Some(_) => {}
            }

            let name = cursor
                .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '!' | ',' | '(' | ')'))
                .to_owned();
            if !is_attribute_name(&name) {
                return Err(cursor.error(format!("invalid attribute name `{name}`")));
            }

            let before = cursor.pos;
            cursor.take_while(char::is_whitespace);
            let rest = cursor.rest();
            if rest.starts_with("!=") {
                cursor.pos += 2;
            } else if rest.starts_with('=') {
                cursor.pos += 1;
            } else {
                cursor.pos = before;
                self.push_attr(name, Value::Bool(true));
                continue;
            }

            cursor.take_while(char::is_whitespace);
            let raw = match cursor.peek() {
                Some('"' | '\'') => {
                    let source = cursor.source;
                    let start = cursor.pos;
                    cursor.quoted()?;
                    &source[start..cursor.pos]
                }
                _ => cursor.take_while(|c| !c.is_whitespace() && c != ',' && c != ')'),
            };
            let value = evaluate(raw, scope, cursor.line)?;
            self.push_attr(name, value);
        }
    }

    fn push_attr(&mut self, name: String, value: Value) {
        match value {
            Value::Bool(false) | Value::Null => {}
            Value::Bool(true) => self.set_attr(&name, None),
            Value::Str(s) if name == "class" => self.add_class(&s),
            Value::Str(s) => self.set_attr(&name, Some(s)),
        }
    }

    fn set_attr(&mut self, name: &str, value: Option<String>) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.to_owned(), value));
        }
    }

    fn add_class(&mut self, class: &str) {
        if class.trim().is_empty() {
            return;
        }
        if let Some((_, Some(existing))) = self.attrs.iter_mut().find(|(key, _)| key == "class") {
            existing.push(' ');
            existing.push_str(class.trim());
        } else {
            self.set_attr("class", Some(class.trim().to_owned()));
        }
    }

    /// Render with `inner` as content after any inline text.
    ///
    /// With `tag: child` expansion, `inner` goes into the innermost tag.
    pub(super) fn render(&self, inner: &str) -> Result<String, TemplateError> {
        let mut content = self.text.clone().unwrap_or_default();
        match &self.expansion {
            Some(child) => content.push_str(&child.render(inner)?),
            None => content.push_str(inner),
        }

        let mut out = String::with_capacity(content.len() + 32);
        write!(out, "<{}", self.name).unwrap();
        for (key, value) in &self.attrs {
            match value {
                Some(value) => write!(out, r#" {key}="{}""#, escape_html(value)).unwrap(),
                None => write!(out, " {key}").unwrap(),
            }
        }
        out.push('>');

        if self.self_closing || is_void(&self.name) {
            if !content.is_empty() {
                return Err(TemplateError::syntax(
                    self.line,
                    format!("`{}` cannot have content", self.name),
                ));
            }
            return Ok(out);
        }

        out.push_str(&content);
        write!(out, "</{}>", self.name).unwrap();
        Ok(out)
    }
}

fn is_attribute_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '_' | ':' | '@'))
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@'))
}

fn is_class_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, line: usize) -> Self {
        Self {
            source,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !f(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Read a quoted string starting at the cursor, handling backslash escapes.
    fn quoted(&mut self) -> Result<String, TemplateError> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.advance();
        let mut value = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += i + 1;
                    return Ok(value);
                }
                c => value.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.line, message)
    }
}
