//! Markup composition for pydata-preview.
//!
//! Turns the line sequence captured from the decoder into a bounded, self-contained HTML
//! document. Rules applied per line:
//! - lines are joined with `<br>` instead of raw newlines
//! - every line except the first (status) line has its text spaces turned into `&nbsp;`
//! - lines starting with an `<img` tag pass through untouched
//! - `<script`, `</script` and `javascript:` sequences are neutralized
//!
//! Spaces inside tags (`<span style='color: red'>`) are left alone so attributes keep working.
//!
//! The shell carries a Content-Security-Policy meta tag that forbids script execution.

use crate::core::formatter::FileInfo;

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;

/// Marker inserted between lines.
pub const LINE_BREAK: &str = "<br>";
/// Replacement for a preserved ASCII space.
pub const NBSP: &str = "&nbsp;";

const IMG_PREFIX: &str = "<img";

/// Default monospace font stack for the content block.
pub const DEFAULT_FONT_FAMILY: &str =
    "Menlo, Consolas, \"Ubuntu Mono\", \"Roboto Mono\", \"DejaVu Sans Mono\", monospace";

/// The final HTML payload handed to a panel. Never parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The markup between the content `<div>` tags.
    pub fn body(&self) -> &str {
        let start = self
            .0
            .find(CONTENT_OPEN_END)
            .map_or(0, |i| i + CONTENT_OPEN_END.len());
        let end = self.0.rfind(CONTENT_CLOSE).unwrap_or(self.0.len());
        self.0.get(start..end).unwrap_or("")
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const CONTENT_OPEN_END: &str = "<!-- content -->";
const CONTENT_CLOSE: &str = "<!-- /content --></div>";

/// Knobs for [compose_with].
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub stylesheet: Option<String>,
    pub font_family: String,
    pub max_lines: usize,
    pub max_line_chars: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            stylesheet: None,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            max_lines: 20_000,
            max_line_chars: 200_000,
        }
    }
}

/// Compose with default options and no header.
pub fn compose<S: AsRef<str>>(lines: &[S]) -> RenderedDocument {
    compose_with(lines, &ComposeOptions::default(), None)
}

/// Compose decoder output into a full document.
pub fn compose_with<S: AsRef<str>>(
    lines: &[S],
    options: &ComposeOptions,
    header: Option<&FileInfo>,
) -> RenderedDocument {
    let body = compose_body(lines, options);
    wrap_document(&body, options, header)
}

/// Compose the document shown when the decoder process itself failed.
///
/// The first line is a red status line, the detail is escaped and shown verbatim below it.
pub fn compose_error(
    message: &str,
    detail: &str,
    options: &ComposeOptions,
    header: Option<&FileInfo>,
) -> RenderedDocument {
    let mut lines = vec![format!(
        "<span style='color:red'>{}</span>",
        escape_html(message)
    )];
    lines.extend(
        detail
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| escape_html(l).into_owned()),
    );
    compose_with(&lines, options, header)
}

/// Join the lines with [LINE_BREAK], applying the bounds and per-line rules.
pub fn compose_body<S: AsRef<str>>(lines: &[S], options: &ComposeOptions) -> String {
    let shown = lines.len().min(options.max_lines);
    let mut parts: Vec<String> = Vec::with_capacity(shown + 1);

    for (idx, line) in lines.iter().take(shown).enumerate() {
        let line = truncate_chars(line.as_ref(), options.max_line_chars);
        let line = neutralize_scripts(&line);
        if idx == 0 || line.starts_with(IMG_PREFIX) {
            parts.push(line.into_owned());
        } else {
            parts.push(preserve_spaces(&line));
        }
    }

    if lines.len() > shown {
        parts.push(format!(
            "<i>...{NBSP}({}{NBSP}more{NBSP}lines)</i>",
            lines.len() - shown
        ));
    }
    parts.join(LINE_BREAK)
}

fn wrap_document(body: &str, options: &ComposeOptions, header: Option<&FileInfo>) -> RenderedDocument {
    let style_src = if options.stylesheet.is_some() {
        "'unsafe-inline' *"
    } else {
        "'unsafe-inline'"
    };

    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("<!DOCTYPE html>\n<html dir=\"ltr\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        out,
        "<meta http-equiv=\"Content-Security-Policy\" content=\"default-src 'none'; img-src data:; style-src {style_src}\">"
    );
    if let Some(href) = &options.stylesheet {
        let _ = writeln!(out, "<link rel=\"stylesheet\" href=\"{}\">", escape_html(href));
    }
    if let Some(info) = header {
        let _ = writeln!(out, "<title>{}</title>", escape_html(&info.name));
    }
    out.push_str("</head>\n<body>\n");
    if let Some(info) = header {
        let _ = writeln!(
            out,
            "<div id=\"header\"><b>{}</b> <i>({}, {}, modified {})</i></div><hr>",
            escape_html(&info.name),
            escape_html(&info.kind),
            escape_html(&info.size),
            escape_html(&info.modified),
        );
    }
    let _ = write!(
        out,
        "<div id=\"x\" style='font-family: {}'>{CONTENT_OPEN_END}{body}{CONTENT_CLOSE}\n</body>\n</html>\n",
        options.font_family.replace('\'', "&#39;"),
    );
    RenderedDocument(out)
}

/// Escape the five HTML special characters.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Replace spaces in text content with [NBSP], leaving tag interiors alone.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`.
pub fn preserve_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 16);
    let mut in_tag = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphabetic() || *n == '/' || *n == '!') =>
            {
                in_tag = true;
                out.push(c);
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(c);
            }
            ' ' if !in_tag => out.push_str(NBSP),
            _ => out.push(c),
        }
    }
    out
}

fn truncate_chars(line: &str, max: usize) -> Cow<'_, str> {
    match line.char_indices().nth(max) {
        Some((cut, _)) => Cow::Owned(format!("{}…", &line[..cut])),
        None => Cow::Borrowed(line),
    }
}

const SCRIPT_PATTERNS: &[&str] = &["</script", "<script", "javascript:"];

/// Neutralize script tags and `javascript:` URLs, case-insensitively, keeping the original case.
fn neutralize_scripts(line: &str) -> Cow<'_, str> {
    let lowered = line.to_ascii_lowercase();
    if !SCRIPT_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return Cow::Borrowed(line);
    }

    // ASCII lowercasing keeps byte offsets identical, so matches in `lowered` index `line`.
    let mut out = String::with_capacity(line.len() + 16);
    let mut i = 0;
    'outer: while i < line.len() {
        for pattern in SCRIPT_PATTERNS {
            if lowered[i..].starts_with(pattern) {
                let original = &line[i..i + pattern.len()];
                match original.strip_prefix('<') {
                    Some(rest) => {
                        out.push_str("&lt;");
                        out.push_str(rest);
                    }
                    None => {
                        out.push_str(&original[..original.len() - 1]);
                        out.push_str("&#58;");
                    }
                }
                i += pattern.len();
                continue 'outer;
            }
        }
        let Some(c) = line[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_shape_example() {
        let doc = compose(&["shape: (2,)", "[1 2]"]);
        assert_eq!(doc.body(), "shape: (2,)<br>[1&nbsp;2]");
        assert!(doc.as_str().starts_with("<!DOCTYPE html>"));
        assert!(doc.as_str().contains("<meta charset=\"utf-8\">"));
    }

    #[test]
    fn test_first_line_and_img_lines_untouched() {
        let img = "<img src=\"data:image/jpeg;base64,AAAA\"> trailing text";
        let doc = compose(&["status line here", img, "a  b"]);
        let body = doc.body();
        assert!(body.starts_with("status line here<br>"));
        assert!(body.contains(img));
        assert!(body.ends_with("a&nbsp;&nbsp;b"));
    }

    #[test]
    fn test_spaces_inside_tags_survive() {
        let out = preserve_spaces("<b>dict</b> <i>(len=2)</i> <span style='color: red'>x y</span>");
        assert_eq!(
            out,
            "<b>dict</b>&nbsp;<i>(len=2)</i>&nbsp;<span style='color: red'>x&nbsp;y</span>"
        );
        assert_eq!(preserve_spaces("a < b"), "a&nbsp;<&nbsp;b");
    }

    #[test]
    fn test_scripts_are_neutralized() {
        let doc = compose(&["ok", "<SCRIPT>alert(1)</script>", "<a href='JavaScript:x'>"]);
        let body = doc.body();
        assert!(!body.to_ascii_lowercase().contains("<script"));
        assert!(body.contains("&lt;SCRIPT>"));
        assert!(body.contains("&lt;/script>"));
        assert!(body.contains("JavaScript&#58;x"));
        assert!(doc.as_str().contains("default-src 'none'"));
    }

    #[test]
    fn test_bounds() {
        let options = ComposeOptions {
            max_lines: 2,
            max_line_chars: 4,
            ..ComposeOptions::default()
        };
        let body = compose_body(&["abcdef", "xy", "dropped", "dropped"], &options);
        assert_eq!(body, "abcd…<br>xy<br><i>...&nbsp;(2&nbsp;more&nbsp;lines)</i>");
    }

    #[test]
    fn test_empty_input_still_renders() {
        let doc = compose::<&str>(&[]);
        assert_eq!(doc.body(), "");
        assert!(doc.as_str().contains("</html>"));
    }

    #[test]
    fn test_error_document_escapes_detail() {
        let doc = compose_error(
            "Decoder failed",
            "Traceback:\n  File <stdin>\n\nboom",
            &ComposeOptions::default(),
            None,
        );
        let body = doc.body();
        assert!(body.starts_with("<span style='color:red'>Decoder failed</span><br>"));
        assert!(body.contains("&nbsp;&nbsp;File&nbsp;&lt;stdin&gt;"));
        assert!(body.ends_with("boom"));
    }

    #[test]
    fn test_stylesheet_link() {
        let options = ComposeOptions {
            stylesheet: Some("style.css".into()),
            ..ComposeOptions::default()
        };
        let doc = compose_with(&["x"], &options, None);
        assert!(doc.as_str().contains("<link rel=\"stylesheet\" href=\"style.css\">"));
    }

    #[test]
    fn test_header_is_escaped() {
        let info = FileInfo {
            name: "<a>.npy".into(),
            kind: "numeric-array".into(),
            size: "1 kB".into(),
            modified: "2024-01-01 00:00:00".into(),
        };
        let doc = compose_with(&["x"], &ComposeOptions::default(), Some(&info));
        assert!(doc.as_str().contains("<title>&lt;a&gt;.npy</title>"));
        assert!(doc.as_str().contains("numeric-array, 1 kB"));
    }
}
