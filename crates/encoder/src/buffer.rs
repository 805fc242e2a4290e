/// Text accumulated by a sink during one encode call, with its length in
/// UTF-16 code units kept alongside (the unit length caps are expressed in).
#[derive(Debug, Default)]
pub struct OutputBuffer {
    text: String,
    utf16_len: usize,
}

impl OutputBuffer {
    pub const INITIAL_CAPACITY: usize = 2048;

    pub fn new() -> Self {
        Self::with_capacity(Self::INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            utf16_len: 0,
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.utf16_len += tools::utf16::utf16_len(s);
        self.text.push_str(s);
    }

    pub fn push(&mut self, ch: char) {
        self.utf16_len += ch.len_utf16();
        self.text.push(ch);
    }

    pub fn len_utf16(&self) -> usize {
        self.utf16_len
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Last character written, if any is still buffered.
    pub fn last_char(&self) -> Option<char> {
        self.text.chars().next_back()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.utf16_len = 0;
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_utf16_length() {
        let mut out = OutputBuffer::new();
        out.push_str("a\u{1F600}");
        out.push('é');
        assert_eq!(out.len_utf16(), 4);
        assert_eq!(out.last_char(), Some('é'));
        out.clear();
        assert!(out.is_empty());
        assert_eq!(out.len_utf16(), 0);
    }
}
