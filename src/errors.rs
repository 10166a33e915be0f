use std::{fmt, io, num::{ParseFloatError, ParseIntError}, str::Utf8Error, sync::Arc};
use quick_xml::events::attributes::AttrError;

#[derive(Debug, Clone)]
pub enum Error {
    /// The stream does not have the shape of a map export.
    Structural(String),
    /// A numeric attribute is missing or does not parse.
    Format(String),
    /// The underlying byte source failed.
    Io(Arc<io::Error>),
    InvalidGeometry(String),
    IndexOutOfRange { index: usize, len: usize },
    Config(String),
    Serialization(String),
    Other(String),
}

impl Error {
    /// Errors that abort a parse and invalidate everything it produced so far.
    pub fn is_fatal_parse_error(&self) -> bool {
        matches!(self, Error::Structural(_) | Error::Format(_) | Error::Io(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Structural(message) => write!(f, "structural error: {}", message),
            Error::Format(message) => write!(f, "format error: {}", message),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::InvalidGeometry(message) => write!(f, "invalid geometry: {}", message),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for length {}", index, len)
            },
            Error::Config(message) => write!(f, "configuration error: {}", message),
            Error::Serialization(message) => write!(f, "serialization error: {}", message),
            Error::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(Arc::new(value))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        match value {
            quick_xml::Error::Io(err) => Error::Io(err),
            other => Error::Structural(other.to_string()),
        }
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error::Format(value.to_string())
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error::Format(value.to_string())
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error::Structural(value.to_string())
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::Format(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Config(value.to_string())
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
