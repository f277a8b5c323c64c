//! Shared utility functions for rendering.

use pulldown_cmark::HeadingLevel;

/// Escape special HTML characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Derive a section id from a heading's text.
///
/// Lower-cases, turns each whitespace character into `-` and drops every
/// character that is not an ASCII word character or `-`.
///
/// # Examples
///
/// ```
/// use tb_renderer::section_slug;
///
/// assert_eq!(section_slug("Light & Colour"), "light--colour");
/// assert_eq!(section_slug("Pi, the Number"), "pi-the-number");
/// ```
pub fn section_slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn test_section_slug() {
        assert_eq!(section_slug("Introduction"), "introduction");
        assert_eq!(section_slug("The Golden  Ratio"), "the-golden--ratio");
        assert_eq!(section_slug("Ünïcode"), "ncode");
        assert_eq!(section_slug("snake_case-id"), "snake_case-id");
    }

    #[test]
    fn test_heading_level_to_num() {
        assert_eq!(heading_level_to_num(HeadingLevel::H1), 1);
        assert_eq!(heading_level_to_num(HeadingLevel::H6), 6);
    }
}
