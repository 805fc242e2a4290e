use bitflags::bitflags;

bitflags! {
    /// Output and traversal switches passed to `init`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EncoderFlags: u32 {
        /// Consult the visibility predicate and drop invisible nodes.
        const SKIP_INVISIBLE_CONTENT = 1 << 0;
        /// Resolve link-bearing attributes against the document base URL.
        const OUTPUT_ABSOLUTE_LINKS = 1 << 1;
        /// Enter author shadow roots and walk slots through their assigned
        /// nodes.
        const ALLOW_CROSS_SHADOW_BOUNDARY = 1 << 2;
        /// Drop `<br>`s that do not produce a visible line.
        const OUTPUT_DROP_INVISIBLE_BREAK = 1 << 3;
        /// Treat all content as preformatted: no whitespace collapsing, and
        /// invisible breaks are dropped.
        const OUTPUT_PREFORMATTED = 1 << 4;
        /// Never write an encoding declaration for the output charset.
        const OUTPUT_DONT_REWRITE_ENCODING_DECLARATION = 1 << 5;
        /// Plain text: include `<noscript>` content.
        const OUTPUT_NO_SCRIPT_CONTENT = 1 << 6;
        /// Plain text: wrap lines at the wrap column.
        const OUTPUT_WRAP = 1 << 7;
        /// Release the document and reset per-document state after every
        /// encode call. The cached sink survives.
        const REQUIRES_REINIT_AFTER_OUTPUT = 1 << 8;
    }
}

impl EncoderFlags {
    /// Parse a list of flag names (`"SKIP_INVISIBLE_CONTENT"`, ...).
    pub fn from_names<'a, I>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut flags = Self::empty();
        for name in names {
            let flag = Self::from_name(name.trim()).ok_or_else(|| format!("unknown flag '{name}'"))?;
            flags |= flag;
        }
        Ok(flags)
    }
}
