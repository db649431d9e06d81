use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Ellipsis appended to truncated text
const ELLIPSIS: &str = "...";

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6])\b[^>]*>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Converts feed summary markup into plain text suitable for a message body.
///
/// Drops `<script>`/`<style>` blocks, turns block-level closing tags into
/// line breaks, removes all remaining tags, decodes HTML entities, strips
/// control characters and collapses runs of whitespace.
///
/// # Examples
///
/// ```
/// use herald::util::clean_html;
///
/// assert_eq!(clean_html("<p>Fish &amp; <b>chips</b></p>"), "Fish & chips");
/// ```
pub fn clean_html(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, "");
    let with_breaks = BREAK_TAG.replace_all(&without_code, "\n");
    let without_tags = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = html_escape::decode_html_entities(&without_tags);
    let printable = strip_control_chars(&decoded);

    let collapsed = INLINE_SPACE.replace_all(&printable, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES.replace_all(joined.trim(), "\n\n").into_owned()
}

/// Truncates a string to at most `max_chars` characters.
///
/// If truncation is necessary the text is cut on a character boundary,
/// trailing whitespace is trimmed and "..." is appended; the ellipsis counts
/// toward the budget. Budgets of three characters or fewer cut without an
/// ellipsis.
///
/// # Examples
///
/// ```
/// use herald::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 8), "Hello...");
/// assert_eq!(truncate_chars("Test", 2), "Te");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return Cow::Borrowed(s);
    };

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_chars <= ellipsis_len {
        return Cow::Owned(s[..cut].to_string());
    }

    let keep = s
        .char_indices()
        .nth(max_chars - ellipsis_len)
        .map(|(idx, _)| idx)
        .unwrap_or(cut);
    Cow::Owned(format!("{}{}", s[..keep].trim_end(), ELLIPSIS))
}

/// Strips control characters and ANSI escape sequences from text.
///
/// Feed titles and summaries are attacker-controlled and end up both in log
/// lines and in chat messages.
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves tab, newline and carriage return. Returns `Cow::Borrowed` when
/// the input is already clean.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let needs_strip = bytes.iter().any(|&b| is_stripped_byte(b));
    if !needs_strip {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_stripped_byte(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped_byte(bytes[i]) {
                i += 1;
            }
            // Only ASCII bytes stop the run, so the slice stays on a char boundary.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

fn is_stripped_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_html_removes_tags_and_decodes() {
        assert_eq!(
            clean_html("<p>Rust &lt;3 <a href=\"x\">links</a></p>"),
            "Rust <3 links"
        );
    }

    #[test]
    fn test_clean_html_drops_scripts() {
        assert_eq!(
            clean_html("<style>p{color:red}</style>Hello<script>alert(1)</script> there"),
            "Hello there"
        );
    }

    #[test]
    fn test_clean_html_keeps_paragraph_breaks() {
        assert_eq!(
            clean_html("<p>First   paragraph</p>\n\n\n<p>Second</p>"),
            "First paragraph\n\nSecond"
        );
        assert_eq!(clean_html("one<br/>two"), "one\ntwo");
    }

    #[test]
    fn test_clean_html_plain_text_passthrough() {
        assert_eq!(clean_html("  just text  "), "just text");
        assert_eq!(clean_html(""), "");
    }

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_chars("12345", 5), "12345");
        assert!(matches!(truncate_chars("12345", 5), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_appends_ellipsis() {
        assert_eq!(truncate_chars("Hello World", 8), "Hello...");
        assert_eq!(truncate_chars("Testing", 4), "T...");
    }

    #[test]
    fn test_truncate_trims_before_ellipsis() {
        assert_eq!(truncate_chars("Hello big world", 9), "Hello...");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("日本語テスト", 6), "日本語テスト");
        assert_eq!(truncate_chars("日本語テスト", 5), "日本...");
    }

    #[test]
    fn test_truncate_narrow_budgets() {
        assert_eq!(truncate_chars("Test", 0), "");
        assert_eq!(truncate_chars("Test", 3), "Tes");
    }

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        let input = "line1\nline2\ttabbed";
        assert!(matches!(strip_control_chars(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_ansi_and_controls() {
        assert_eq!(
            strip_control_chars("\x1b[31mRed\x1b[0m \x00NUL \x1b]0;title\x07ok"),
            "Red NUL ok"
        );
    }
}
