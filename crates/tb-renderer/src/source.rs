//! Textual rewrites applied to the raw source before any parsing.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static ASSET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(url\(|src="|href="|background="|poster=")images/"#)
        .expect("invalid asset path regex")
});

static DATA_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w-])(when|delay|animation|duration)=").expect("invalid data attribute regex")
});

static HEADERLESS_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\n\|(.*)\n\|(.*)\n").expect("invalid table regex")
});

static DELIMITER_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s|:-]+$").expect("invalid delimiter row regex"));

/// Rewrite asset paths, attribute names, escaped dollars and tables.
///
/// - `src="images/…"` and friends point into `{prefix}/{id}/images/`
/// - `when=`, `delay=`, `animation=`, `duration=` become `data-…=`
/// - `\$` is doubled so Markdown escaping leaves the backslash in place
/// - a pipe table without a header row gets an empty one
pub(crate) fn rewrite_source(source: &str, document_id: &str, resource_prefix: &str) -> String {
    let source = source.replace("\r\n", "\n");
    let images = format!("${{1}}{resource_prefix}/{document_id}/images/");
    let source = ASSET_PATH.replace_all(&source, images.as_str());
    let source = DATA_ATTRIBUTE.replace_all(&source, "${1}data-${2}=");
    let source = source.replace(r"\$", r"\\$");
    insert_table_headers(&source)
}

/// Resource URL for a Markdown image destination, if it is document-relative.
pub(crate) fn rewrite_image_src(src: &str, document_id: &str, resource_prefix: &str) -> Option<String> {
    src.starts_with("images/")
        .then(|| format!("{resource_prefix}/{document_id}/{src}"))
}

fn insert_table_headers(source: &str) -> String {
    HEADERLESS_TABLE
        .replace_all(source, |caps: &Captures| {
            let (first, second) = (&caps[1], &caps[2]);
            let header = if DELIMITER_ROW.is_match(second) {
                String::new()
            } else {
                let cols = first.split(" | ").count();
                format!("|{}\n|{}\n", " |".repeat(cols), " - |".repeat(cols))
            };
            format!("\n\n{header}|{first}\n|{second}\n")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rewrite(source: &str) -> String {
        rewrite_source(source, "circles", "/resources")
    }

    #[test]
    fn test_asset_paths() {
        assert_eq!(
            rewrite(r#"<img src="images/a.png"> <div style="background: url(images/b.jpg)">"#),
            r#"<img src="/resources/circles/images/a.png"> <div style="background: url(/resources/circles/images/b.jpg)">"#
        );
        assert_eq!(rewrite(r#"<a href="other/images/x">"#), r#"<a href="other/images/x">"#);
    }

    #[test]
    fn test_data_attributes() {
        assert_eq!(
            rewrite(r#"x-anim(when="1" delay="200") .a(animation="pop")"#),
            r#"x-anim(data-when="1" data-delay="200") .a(data-animation="pop")"#
        );
        assert_eq!(rewrite(r#"b(data-delay="1")"#), r#"b(data-delay="1")"#);
    }

    #[test]
    fn test_escaped_dollars() {
        assert_eq!(rewrite(r"costs \$5"), r"costs \\$5");
    }

    #[test]
    fn test_table_header_inserted() {
        assert_eq!(
            rewrite("Intro\n\n| a | b |\n| c | d |\n"),
            "Intro\n\n| | |\n| - | - |\n| a | b |\n| c | d |\n"
        );
    }

    #[test]
    fn test_table_with_header_untouched() {
        let source = "Intro\n\n| a | b |\n|---|:-:|\n| c | d |\n";
        assert_eq!(rewrite(source), source);
    }

    #[test]
    fn test_image_src() {
        assert_eq!(
            rewrite_image_src("images/x.png", "circles", "/r").as_deref(),
            Some("/r/circles/images/x.png")
        );
        assert_eq!(rewrite_image_src("http://x/y.png", "circles", "/r"), None);
    }
}
