use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns.
///
/// ```
/// use newsdesk::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("你好"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncate a string to at most `max_width` columns, appending "..." when cut.
///
/// Widths of 3 or less have no room for an ellipsis, so as many characters
/// as fit are returned instead. Returns `Cow::Borrowed` when the string fits.
///
/// ```
/// use newsdesk::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if max_width <= ELLIPSIS_WIDTH {
        let mut byte_end = 0;
        let mut width = 0;
        for (idx, c) in s.char_indices() {
            let w = UnicodeWidthChar::width(c).unwrap_or(0);
            if width + w > max_width {
                break;
            }
            width += w;
            byte_end = idx + c.len_utf8();
        }
        return if byte_end == s.len() {
            Cow::Borrowed(s)
        } else {
            Cow::Owned(s[..byte_end].to_string())
        };
    }

    let target_width = max_width - ELLIPSIS_WIDTH;
    let mut width = 0;
    let mut cut_point = None;

    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if cut_point.is_none() && width + w > target_width {
            cut_point = Some(idx);
        }
        if width + w > max_width {
            let cut = cut_point.unwrap_or(idx);
            return Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS));
        }
        width += w;
    }

    Cow::Borrowed(s)
}

fn is_control(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Article titles and bodies are user-authored and printed straight to the
/// terminal. Tab, newline and carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| b == 0x1b || is_control(b)) {
        return Cow::Borrowed(s);
    }

    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                // CSI: parameters until a final byte in 0x40..=0x7e
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                // OSC: until BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if b == 0x1b || is_control(b) => i += 1,
            _ => {
                let start = i;
                while i < len && bytes[i] != 0x1b && !is_control(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes stop the run, so this is a char boundary.
                out.push_str(&s[start..i]);
            }
        }
    }

    Cow::Owned(out)
}

// ============================================================================
// HTML Bodies
// ============================================================================

const BLOCK_TAGS: &[&str] = &["p", "br", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote"];

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Convert a rich-text HTML body into plain text for terminal display.
///
/// Any `<...>` span is dropped; block-level tags become line breaks. Common
/// entities are decoded and control characters removed. Unterminated `<` is
/// kept as text.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('<') {
            match tail[1..].find('>') {
                Some(end) if end > 0 => {
                    if BLOCK_TAGS.contains(&tag_name(&tail[1..=end]).as_str()) && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    rest = &tail[end + 2..];
                }
                _ => {
                    out.push('<');
                    rest = &tail[1..];
                }
            }
        } else {
            let decoded = tail[1..]
                .find(';')
                .filter(|&end| end <= 8)
                .and_then(|end| decode_entity(&tail[1..=end]).map(|c| (c, end)));
            match decoded {
                Some((c, end)) => {
                    out.push(c);
                    rest = &tail[end + 2..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            }
        }
    }
    out.push_str(rest);

    let text = strip_control_chars(&out).into_owned();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Characters shown in list-row previews.
pub const EXCERPT_CHARS: usize = 120;

/// Single-line plain-text preview of an HTML body, cut to `max_chars` characters.
///
/// ```
/// use newsdesk::util::excerpt;
///
/// assert_eq!(excerpt("<p>Hello</p><p>world</p>", 120), "Hello world");
/// assert_eq!(excerpt("<b>abcdef</b>", 3), "abc");
/// ```
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = html_to_text(html);
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(max_chars).collect()
}
