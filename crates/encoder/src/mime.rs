pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_XML: &str = "text/xml";
pub const APPLICATION_XML: &str = "application/xml";
pub const APPLICATION_XHTML_XML: &str = "application/xhtml+xml";
pub const IMAGE_SVG_XML: &str = "image/svg+xml";

/// Built-in sink family selected by MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    PlainText,
    Html,
    Xml,
}

impl OutputFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let is = |candidate: &str| mime.eq_ignore_ascii_case(candidate);
        if is(TEXT_PLAIN) {
            Some(OutputFormat::PlainText)
        } else if is(TEXT_HTML) {
            Some(OutputFormat::Html)
        } else if is(TEXT_XML) || is(APPLICATION_XML) || is(APPLICATION_XHTML_XML) || is(IMAGE_SVG_XML)
        {
            Some(OutputFormat::Xml)
        } else {
            None
        }
    }
}

pub fn is_supported(mime: &str) -> bool {
    OutputFormat::from_mime(mime).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_maps_to_formats() {
        assert_eq!(OutputFormat::from_mime("text/plain"), Some(OutputFormat::PlainText));
        assert_eq!(OutputFormat::from_mime("TEXT/HTML"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_mime("image/svg+xml"), Some(OutputFormat::Xml));
        assert_eq!(OutputFormat::from_mime("application/json"), None);
        assert!(!is_supported("text/css"));
    }
}
