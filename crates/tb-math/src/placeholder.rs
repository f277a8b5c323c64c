//! Placeholder tokens standing in for equations during parsing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::renderer::EquationRenderer;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"XEQUATIONX[0-9]+XEQUATIONX").expect("invalid placeholder regex"));

/// An equation waiting to be rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equation {
    /// TeX source, with HTML entities already decoded.
    pub source: String,
    /// Whether the equation sits in running text.
    pub inline: bool,
}

/// An equation that could not be rendered and was replaced by empty markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquationFailure {
    /// TeX source, or the bare token if it was never registered.
    pub source: String,
    /// Whether the equation was inline.
    pub inline: bool,
    /// Renderer error message.
    pub message: String,
}

/// Markup after placeholder substitution.
#[derive(Clone, Debug, Default)]
pub struct Resolved {
    /// Markup with every placeholder token replaced.
    pub html: String,
    /// Equations that failed and were replaced by empty markup.
    pub failures: Vec<EquationFailure>,
}

/// Per-compile table mapping placeholder tokens to equations.
///
/// Tokens have the form `XEQUATIONX<n>XEQUATIONX`. Registering the same
/// `(source, inline)` pair twice returns the same token, so each distinct
/// equation is rendered once per resolution pass.
#[derive(Debug, Default)]
pub struct EquationTable {
    pending: HashMap<String, Equation>,
    tokens: HashMap<(String, bool), String>,
    next_id: usize,
}

impl EquationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an equation and return the token to splice into markup.
    pub fn placeholder(&mut self, source: &str, inline: bool) -> String {
        let key = (source.to_owned(), inline);
        if let Some(token) = self.tokens.get(&key) {
            return token.clone();
        }

        let token = format!("XEQUATIONX{}XEQUATIONX", self.next_id);
        self.next_id += 1;
        self.pending.insert(
            token.clone(),
            Equation {
                source: source.to_owned(),
                inline,
            },
        );
        self.tokens.insert(key, token.clone());
        token
    }

    /// Look up the equation behind a token.
    pub fn get(&self, token: &str) -> Option<&Equation> {
        self.pending.get(token)
    }

    /// Number of equations registered but not yet resolved.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether every registered equation has been resolved.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget equations whose tokens never made it into resolved markup.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.tokens.clear();
    }

    /// Replace every placeholder token in `html` with rendered markup.
    ///
    /// Tokens are rendered sequentially in the order they first appear.
    /// A failing equation is logged and replaced by empty markup; unknown
    /// tokens are treated the same way so no token survives. Resolved
    /// entries are removed from the table.
    pub async fn resolve<R: EquationRenderer>(&mut self, html: &str, renderer: &R) -> Resolved {
        let mut parts = [html.to_owned()];
        let failures = self.resolve_all(&mut parts, renderer).await;
        let [html] = parts;
        Resolved { html, failures }
    }

    /// Resolve placeholders across several fragments of one document.
    ///
    /// Behaves like [`resolve`](Self::resolve) on the concatenation of
    /// `parts`, so a token shared by two fragments is rendered once and
    /// substituted in both.
    pub async fn resolve_all<R: EquationRenderer>(
        &mut self,
        parts: &mut [String],
        renderer: &R,
    ) -> Vec<EquationFailure> {
        let mut rendered: HashMap<String, String> = HashMap::new();
        let mut failures = Vec::new();

        // Collected up front so no regex iterator is held across an await
        let tokens: Vec<String> = parts
            .iter()
            .flat_map(|part| PLACEHOLDER_PATTERN.find_iter(part))
            .map(|found| found.as_str().to_owned())
            .collect();

        for token in tokens {
            if rendered.contains_key(&token) {
                continue;
            }

            let markup = match self.pending.get(&token) {
                Some(equation) => match renderer.render(&equation.source, equation.inline).await {
                    Ok(markup) => markup,
                    Err(e) => {
                        tracing::warn!(
                            source = %equation.source,
                            inline = equation.inline,
                            "equation failed to render: {e}"
                        );
                        failures.push(EquationFailure {
                            source: equation.source.clone(),
                            inline: equation.inline,
                            message: e.to_string(),
                        });
                        String::new()
                    }
                },
                None => {
                    tracing::warn!(token = %token, "unknown equation placeholder");
                    failures.push(EquationFailure {
                        source: token.clone(),
                        inline: true,
                        message: "unknown placeholder".to_owned(),
                    });
                    String::new()
                }
            };
            rendered.insert(token, markup);
        }

        for part in parts.iter_mut() {
            let replaced = PLACEHOLDER_PATTERN
                .replace_all(part, |caps: &regex::Captures| {
                    rendered.get(&caps[0]).cloned().unwrap_or_default()
                })
                .into_owned();
            *part = replaced;
        }

        for token in rendered.keys() {
            if let Some(equation) = self.pending.remove(token) {
                self.tokens.remove(&(equation.source, equation.inline));
            }
        }

        failures
    }
}

/// Whether `html` still contains a placeholder token.
#[must_use]
pub fn contains_placeholder(html: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(html)
}
