/// Emphasis, paragraph and line-break tags rewritten by [`translate_tags`].
///
/// Only the all-lowercase and all-uppercase spellings are listed. A tag such
/// as `<Br>` is not matched here and gets removed by [`strip_tags`] instead.
const STYLE_TAGS: &[(&str, &str)] = &[
    ("<b>", "*"),
    ("</b>", "*"),
    ("<B>", "*"),
    ("</B>", "*"),
    ("<strong>", "*"),
    ("</strong>", "*"),
    ("<STRONG>", "*"),
    ("</STRONG>", "*"),
    ("<i>", "_"),
    ("</i>", "_"),
    ("<I>", "_"),
    ("</I>", "_"),
    ("<em>", "_"),
    ("</em>", "_"),
    ("<EM>", "_"),
    ("</EM>", "_"),
    ("<br>", "\n"),
    ("<BR>", "\n"),
    ("<br/>", "\n"),
    ("<BR/>", "\n"),
    ("<br />", "\n"),
    ("<BR />", "\n"),
    ("<p>", "\n"),
    ("<P>", "\n"),
    ("</p>", "\n"),
    ("</P>", "\n"),
    ("<div>", "\n"),
    ("<DIV>", "\n"),
    ("</div>", ""),
    ("</DIV>", ""),
];

/// Character references decoded by [`decode_entities`], in pass order.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
];

/// Bracketed spans starting with one of these are kept by [`strip_tags`].
const AUTOLINK_PREFIXES: &[&str] = &["http", "mailto", "tel:"];

/// How far past a `<` the autolink check looks.
const AUTOLINK_PEEK: usize = 9;

/// Emphasis markers checked for balance, in the order they are checked.
const MARKERS: [char; 2] = ['_', '*'];

/// Rewrite `<a ...>text</a>` anchors as `<href|text>`.
///
/// An anchor without a usable `href` is replaced by its visible text. When
/// the opening tag is never closed with `>`, or no `</a>` follows, the `<` is
/// emitted literally and scanning resumes on the next character.
pub fn convert_links(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut result = String::with_capacity(html.len());
    let mut i = 0;

    while i < chars.len() {
        if is_anchor_start(&chars, i)
            && let Some((link, new_i)) = try_parse_anchor(&chars, i)
        {
            result.push_str(&link);
            i = new_i;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}

/// `<a` followed by space, tab or `>`, so `<abbr>` and friends don't match.
fn is_anchor_start(chars: &[char], i: usize) -> bool {
    chars[i] == '<'
        && i + 2 < chars.len()
        && chars[i + 1].eq_ignore_ascii_case(&'a')
        && matches!(chars[i + 2], ' ' | '\t' | '>')
}

/// Returns (replacement, position after `</a>`) for an anchor at `start`
fn try_parse_anchor(chars: &[char], start: usize) -> Option<(String, usize)> {
    let tag_end = find_char(chars, '>', start)?;
    let href = extract_href(&chars[start..=tag_end]);

    let close = find_ignore_ascii_case(chars, "</a>", tag_end)?;
    let text = strip_nested_tags(&chars[tag_end + 1..close]);
    let text = text.trim();

    let link = match href {
        Some(href) if !text.is_empty() => format!("<{}|{}>", href, text),
        Some(href) => format!("<{}>", href),
        None => text.to_string(),
    };

    Some((link, close + "</a>".len()))
}

/// Pull the `href` value out of an opening anchor tag.
///
/// Quoted values run to the matching quote; a missing closing quote means no
/// href at all. Unquoted values stop at space, tab or `>`. An empty value is
/// treated the same as a missing attribute.
fn extract_href(tag: &[char]) -> Option<String> {
    let start = find_ignore_ascii_case(tag, "href=", 0)? + "href=".len();
    let first = *tag.get(start)?;

    let value: String = if first == '"' || first == '\'' {
        let end = find_char(tag, first, start + 1)?;
        tag[start + 1..end].iter().collect()
    } else {
        tag[start..]
            .iter()
            .take_while(|&&c| !matches!(c, ' ' | '\t' | '>'))
            .collect()
    };

    if value.is_empty() { None } else { Some(value) }
}

/// Drop anything between `<` and `>` inside link text. The brackets go too.
fn strip_nested_tags(text: &[char]) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for &ch in text {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Replace the fixed emphasis/paragraph/break tags with mrkdwn sigils or newlines
pub fn translate_tags(html: &str) -> String {
    STYLE_TAGS
        .iter()
        .fold(html.to_string(), |text, &(tag, replacement)| {
            text.replace(tag, replacement)
        })
}

/// Remove remaining `<...>` markup, keeping bracketed autolinks.
///
/// Unlike [`convert_links`], an unterminated `<` is dropped here rather than
/// emitted.
pub fn strip_tags(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut result = String::with_capacity(html.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '<' {
            result.push(chars[i]);
            i += 1;
            continue;
        }

        match find_char(&chars, '>', i) {
            Some(end) if looks_like_autolink(&chars[i + 1..]) => {
                result.extend(&chars[i..=end]);
                i = end + 1;
            }
            Some(end) => i = end + 1,
            None => i += 1,
        }
    }

    result
}

fn looks_like_autolink(rest: &[char]) -> bool {
    let peek: String = rest
        .iter()
        .take(AUTOLINK_PEEK)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    AUTOLINK_PREFIXES
        .iter()
        .any(|prefix| peek.starts_with(prefix))
}

/// Decode the fixed entity table, one whole-string pass per entity.
///
/// Passes run in table order, so `&amp;lt;` becomes `&lt;` and then `<`.
pub fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |text, &(entity, decoded)| {
            text.replace(entity, decoded)
        })
}

/// Tidy whitespace and drop unbalanced emphasis markers.
///
/// A line holding an odd number of `_` (or `*`) loses every `_` (or `*`).
/// Lines are trimmed with inner space runs collapsed, at most one blank line
/// separates paragraphs, and leading/trailing newlines are removed.
pub fn normalize(text: &str) -> String {
    let text = collapse_blank_lines(text);
    let lines: Vec<String> = text.split('\n').map(normalize_line).collect();
    let text = collapse_blank_lines(&lines.join("\n"));
    text.trim_matches('\n').to_string()
}

fn collapse_blank_lines(text: &str) -> String {
    let mut text = text.to_string();
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    text
}

fn normalize_line(line: &str) -> String {
    let mut line = line.to_string();

    for marker in MARKERS {
        if line.matches(marker).count() % 2 == 1 {
            line = line.replace(marker, "");
        }
    }

    while line.contains("  ") {
        line = line.replace("  ", " ");
    }

    line.trim().to_string()
}

fn find_char(chars: &[char], target: char, from: usize) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|pos| from + pos)
}

/// Find an ASCII needle ignoring ASCII case, starting at `from`
fn find_ignore_ascii_case(chars: &[char], needle: &str, from: usize) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if chars.len() < needle.len() {
        return None;
    }

    (from..=chars.len() - needle.len()).find(|&i| {
        chars[i..i + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}
