/// UTF-16 offset helpers for UTF-8 strings.
///
/// Character-data offsets in the document model count UTF-16 code units, the
/// same unit DOM ranges use. Text is stored as UTF-8, so every partial-text
/// operation goes through these conversions.
///
/// Offsets that fall in the middle of a surrogate pair are rounded down to the
/// start of that character, so slicing never splits a scalar value.

/// Number of UTF-16 code units needed to encode `s`.
pub fn utf16_len(s: &str) -> usize {
    // ASCII fast path: one code unit per byte.
    if s.is_ascii() {
        return s.len();
    }
    s.chars().map(char::len_utf16).sum()
}

/// Byte index in `s` of the UTF-16 offset `offset`.
///
/// Offsets past the end clamp to `s.len()`.
pub fn byte_index(s: &str, offset: usize) -> usize {
    if s.is_ascii() {
        return offset.min(s.len());
    }
    let mut units = 0usize;
    for (idx, ch) in s.char_indices() {
        let next = units + ch.len_utf16();
        if next > offset {
            return idx;
        }
        units = next;
    }
    s.len()
}

/// Slice `s` by UTF-16 offsets. `end == None` means "to the end".
///
/// Both ends clamp to the string; an inverted pair yields an empty slice.
pub fn slice(s: &str, start: usize, end: Option<usize>) -> &str {
    let start_byte = byte_index(s, start);
    let end_byte = match end {
        Some(end) => byte_index(s, end),
        None => s.len(),
    };
    if end_byte <= start_byte {
        return "";
    }
    &s[start_byte..end_byte]
}
