/// HTML whitespace: TAB, LF, FF, CR and SPACE.
#[inline]
pub fn is_html_whitespace(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\u{000C}' | '\r' | ' ')
}

pub fn is_only_whitespace(s: &str) -> bool {
    s.chars().all(is_html_whitespace)
}

/// Collapse every run of HTML whitespace into a single space.
///
/// Returns `(collapsed, leading_space, trailing_space)`; the collapsed text has
/// no leading or trailing space, the flags record whether the input had them.
pub fn collapse(s: &str) -> (String, bool, bool) {
    let mut out = String::with_capacity(s.len());
    let leading = s.starts_with(is_html_whitespace);
    let trailing = s.ends_with(is_html_whitespace);
    for word in s.split(is_html_whitespace).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    (out, leading, trailing)
}
