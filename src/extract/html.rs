//! HTML-to-text reduction for pattern matching.
//!
//! Not a real HTML parser: tags are stripped, block-level tags become
//! newlines so labeled-line patterns (`Tel: ...`) keep working, and the
//! handful of entities that show up in mail bodies are decoded.

/// Tag names that terminate a visual line (opening or closing).
const BLOCK_TAGS: &[&str] = &[
    "br", "hr", "p", "div", "tr", "li", "ul", "ol", "table", "h1", "h2", "h3", "h4", "blockquote",
];

/// Reduce an HTML body to plain text.
///
/// Line structure is preserved (block tags → newline); horizontal
/// whitespace is collapsed per line; runs of blank lines are folded.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        match after.find('>') {
            Some(gt) => {
                if is_block_tag(&after[..gt]) {
                    out.push('\n');
                }
                rest = &after[gt + 1..];
            }
            None => {
                // Unterminated tag, drop the remainder.
                rest = "";
            }
        }
    }
    out.push_str(rest);

    normalize(&decode_entities(&out))
}

/// Whether the inside of a `<...>` names a block-level tag.
fn is_block_tag(tag_body: &str) -> bool {
    let t = tag_body.trim_start().trim_start_matches('/');
    let name: String = t
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Decode the entities commonly seen in mail HTML.
fn decode_entities(s: &str) -> String {
    // `&amp;` goes last so already-escaped entities decode only once.
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&auml;", "ä")
        .replace("&ouml;", "ö")
        .replace("&uuml;", "ü")
        .replace("&Auml;", "Ä")
        .replace("&Ouml;", "Ö")
        .replace("&Uuml;", "Ü")
        .replace("&szlig;", "ß")
        .replace("&amp;", "&")
}

/// Collapse horizontal whitespace per line and fold blank-line runs.
fn normalize(s: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut last_blank = true;
    for line in s.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !last_blank {
                lines.push(String::new());
            }
            last_blank = true;
        } else {
            lines.push(collapsed);
            last_blank = false;
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_basic_tags() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strips_nested_tags() {
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn strips_tags_with_attributes() {
        assert_eq!(
            strip_html(r#"<a href="https://example.com">Link</a>"#),
            "Link"
        );
    }

    #[test]
    fn block_tags_become_newlines() {
        assert_eq!(
            strip_html("Mensur: 648 mm<br>Tel: 030 1234567"),
            "Mensur: 648 mm\nTel: 030 1234567"
        );
    }

    #[test]
    fn paragraphs_separate_lines() {
        assert_eq!(strip_html("<p>First</p><p>Second</p>"), "First\n\nSecond");
    }

    #[test]
    fn inline_tags_do_not_break_lines() {
        assert_eq!(
            strip_html("Mensur: <b>648</b> <span>mm</span>"),
            "Mensur: 648 mm"
        );
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(strip_html("Gr&uuml;&szlig;e &amp; mehr"), "Grüße & mehr");
    }

    #[test]
    fn escaped_entities_decode_only_once() {
        assert_eq!(strip_html("a &amp;lt; b"), "a &lt; b");
        assert_eq!(strip_html("&amp;amp;"), "&amp;");
    }

    #[test]
    fn collapses_whitespace_within_lines() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
    }

    #[test]
    fn plain_text_passthrough() {
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }

    #[test]
    fn empty_input() {
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn unterminated_tag_dropped() {
        assert_eq!(strip_html("Hello <span class=\"x"), "Hello");
    }

    #[test]
    fn folds_blank_line_runs() {
        assert_eq!(strip_html("<p>A</p><br><br><br><p>B</p>"), "A\n\nB");
    }
}
