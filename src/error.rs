use thiserror::Error;

/// Classifies DNS resolution errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// The resolver has no record of the host, or the lookup itself failed
    NotFound,
    /// The lookup succeeded but returned no usable address
    NoAddress,
    /// The lookup did not finish within the configured timeout
    Timeout,
}

/// Classifies GeoIP errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorKind {
    /// File open/read failure
    FileError,
    /// Data format or decoding error (corrupt file, wrong version, etc.)
    InvalidData,
}

/// Route judge error types
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Invalid CIDR at line {line}: {value}")]
    InvalidCidr { line: usize, value: String },

    #[error("GeoIP error: {message}")]
    GeoIp { kind: GeoErrorKind, message: String },

    #[error("Resolve error: {message}")]
    Resolve {
        kind: ResolveErrorKind,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouteError {
    /// Shorthand for a resolve error of the given kind.
    pub fn resolve(kind: ResolveErrorKind, message: impl Into<String>) -> Self {
        RouteError::Resolve {
            kind,
            message: message.into(),
        }
    }

    /// The resolve error kind, if this is a resolve error.
    pub fn resolve_kind(&self) -> Option<ResolveErrorKind> {
        match self {
            RouteError::Resolve { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RouteError>;
