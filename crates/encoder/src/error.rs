use std::fmt;

#[derive(Debug)]
pub enum EncodeError {
    /// An encode entry point was called before `init`.
    NotInitialized,
    InvalidArgument(&'static str),
    /// The entry point is not provided by this encoder.
    NotImplemented(&'static str),
    /// `init` was given a MIME type outside the supported set.
    UnsupportedMimeType(String),
    /// Unknown charset label, or streaming without a charset.
    UnsupportedCharset(String),
    EmptySelection,
    /// Copy-range promotion met a point it cannot climb from.
    Promotion(&'static str),
    Io(std::io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::NotInitialized => write!(f, "encoder has no document; call init first"),
            EncodeError::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            EncodeError::NotImplemented(what) => write!(f, "not implemented: {what}"),
            EncodeError::UnsupportedMimeType(mime) => {
                write!(f, "no serializer for MIME type '{mime}'")
            }
            EncodeError::UnsupportedCharset(label) => {
                write!(f, "unsupported charset '{label}'")
            }
            EncodeError::EmptySelection => write!(f, "selection has no ranges"),
            EncodeError::Promotion(what) => write!(f, "range promotion failed: {what}"),
            EncodeError::Io(err) => write!(f, "write to output stream failed: {err}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::Io(err)
    }
}
