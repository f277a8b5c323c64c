//! Inline extension pipeline.
//!
//! Runs on the rendered markup of every paragraph, list item and table cell.
//! Stages run in a fixed order and each one is idempotent, since a loose list
//! item passes through the pipeline once as a paragraph and again as an item:
//!
//! 1. blanks: `[[answer]]` and `[[a|b|c]]`
//! 2. equations: `$tex$`, not after a backslash and not starting with `{`
//! 3. variables: `${expr}{target}` (bound) and `${expr}` (display)
//! 4. emoji: `:shortcode:`
//!
//! Backslash escapes (`\$`, `\ `) survive every stage and are removed by
//! [`unescape`] once the whole document is rendered. Code spans and blocks
//! encode the characters these patterns look for, so code is never touched.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tb_math::EquationTable;


static BLANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)]]").expect("invalid blank regex"));

static EQUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\\])\$([^{][^$]*?)\$").expect("invalid equation regex")
});

static BOUND_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}\{([^}]+)\}").expect("invalid bound variable regex")
});

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("invalid variable regex"));

static EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-z0-9_+\-]+):").expect("invalid emoji regex"));

static ESCAPED_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\s").expect("invalid escaped space regex"));

const VARIABLE_OPEN: &str = r#"<span class="var">"#;
const BOUND_CLOSE: &str = "</x-var>";

/// Inline pipeline bound to one compile's equation table.
pub(crate) struct InlinePipeline<'a> {
    equations: &'a mut EquationTable,
    emoji_path: &'a str,
}

impl<'a> InlinePipeline<'a> {
    pub(crate) fn new(equations: &'a mut EquationTable, emoji_path: &'a str) -> Self {
        Self {
            equations,
            emoji_path,
        }
    }

    /// Run every stage over `html`.
    pub(crate) fn process(&mut self, html: &str) -> String {
        let html = blanks(html);
        let html = self.inline_equations(&html);
        let html = variables(&html);
        emoji(&html, self.emoji_path).into_owned()
    }

    /// Stage 2. Bodies are entity-decoded before they become placeholders.
    fn inline_equations<'t>(&mut self, text: &'t str) -> Cow<'t, str> {
        EQUATION.replace_all(text, |caps: &Captures| {
            let tex = html_escape::decode_html_entities(&caps[2]);
            format!("{}{}", &caps[1], self.equations.placeholder(&tex, true))
        })
    }
}

/// Stage 1: a single answer becomes an input, several become choices.
fn blanks(text: &str) -> Cow<'_, str> {
    BLANK.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        if body.contains('|') {
            let mut out = String::from("<x-blank>");
            for choice in body.split('|') {
                write!(out, r#"<span class="choice">{choice}</span>"#).unwrap();
            }
            out.push_str("</x-blank>");
            out
        } else {
            format!(r#"<x-blank-input solution="{body}"></x-blank-input>"#)
        }
    })
}

/// Stage 3: bound variables first, then display variables not already
/// wrapped by either form.
fn variables(text: &str) -> String {
    let bound = BOUND_VARIABLE.replace_all(text, r#"<x-var bind="${2}">$${${1}}</x-var>"#);

    let mut out = String::with_capacity(bound.len());
    let mut last = 0;
    for found in VARIABLE.find_iter(&bound) {
        let before = &bound[..found.start()];
        let after = &bound[found.end()..];
        out.push_str(&bound[last..found.start()]);
        if after.starts_with(BOUND_CLOSE) || before.ends_with(VARIABLE_OPEN) {
            out.push_str(found.as_str());
        } else {
            write!(out, "{VARIABLE_OPEN}{}</span>", found.as_str()).unwrap();
        }
        last = found.end();
    }
    out.push_str(&bound[last..]);
    out
}

/// Stage 4: known shortcodes become images named by codepoint.
fn emoji<'t>(text: &'t str, emoji_path: &str) -> Cow<'t, str> {
    EMOJI.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match emojis::get_by_shortcode(name).and_then(|e| e.as_str().chars().next()) {
            Some(symbol) => format!(
                r#"<img class="emoji" width="20" height="20" src="{emoji_path}/{:x}.png" alt="{name}"/>"#,
                u32::from(symbol)
            ),
            None => caps[0].to_owned(),
        }
    })
}

/// Replace escaped whitespace with `&nbsp;` and `\$` with `$`.
pub(crate) fn unescape(html: &str) -> String {
    ESCAPED_SPACE.replace_all(html, "&nbsp;").replace(r"\$", "$")
}

/// Encode the characters the inline stages react to.
pub(crate) fn protect_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for c in code.chars() {
        match c {
            '$' => out.push_str("&#36;"),
            '[' => out.push_str("&#91;"),
            ':' => out.push_str("&#58;"),
            '\\' => out.push_str("&#92;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn process(html: &str) -> (String, EquationTable) {
        let mut table = EquationTable::new();
        let out = InlinePipeline::new(&mut table, "/images/emoji").process(html);
        (out, table)
    }

    #[test]
    fn test_blank_input_and_choices() {
        assert_eq!(
            blanks("Hello [[world]]."),
            r#"Hello <x-blank-input solution="world"></x-blank-input>."#
        );
        assert_eq!(
            blanks("[[<em>a</em>|b]]"),
            r#"<x-blank><span class="choice"><em>a</em></span><span class="choice">b</span></x-blank>"#
        );
    }

    #[test]
    fn test_equations() {
        let (html, table) = process("Bye $x+1$ and $a &lt; b$.");
        assert_eq!(html, "Bye XEQUATIONX0XEQUATIONX and XEQUATIONX1XEQUATIONX.");
        assert_eq!(table.get("XEQUATIONX1XEQUATIONX").unwrap().source, "a < b");
        assert!(table.get("XEQUATIONX0XEQUATIONX").unwrap().inline);
    }

    #[test]
    fn test_escaped_dollar_is_not_an_equation() {
        let (html, table) = process(r"costs \$5 or \$6");
        assert_eq!(html, r"costs \$5 or \$6");
        assert!(table.is_empty());
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            variables("${n}{n|3|1,10} and ${2*n}"),
            r#"<x-var bind="n|3|1,10">${n}</x-var> and <span class="var">${2*n}</span>"#
        );
    }

    #[test]
    fn test_variable_is_not_an_equation() {
        let (html, table) = process("${a} and ${b}");
        assert!(table.is_empty());
        assert_eq!(
            html,
            r#"<span class="var">${a}</span> and <span class="var">${b}</span>"#
        );
    }

    #[test]
    fn test_emoji() {
        assert_eq!(
            emoji("nice :smile: :not_an_emoji:", "/e"),
            r#"nice <img class="emoji" width="20" height="20" src="/e/1f604.png" alt="smile"/> :not_an_emoji:"#
        );
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let (once, mut table) = process("[[a|b]] $x$ ${v}{w} ${u} :smile:");
        let twice = InlinePipeline::new(&mut table, "/images/emoji").process(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\ b \$5"), "a&nbsp;b $5");
    }

    #[test]
    fn test_protected_code_is_skipped() {
        let code = protect_code(r"[[x]] $y$ :smile: \$");
        let (html, table) = process(&code);
        assert_eq!(html, code);
        assert!(table.is_empty());
        assert_eq!(unescape(&html), html);
    }
}
