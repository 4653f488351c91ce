use std::path::PathBuf;

/// Why a proposed syntax name was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidName {
    Empty,
    ContainsSlash,
    StartsWithDot,
    /// A character that cannot appear in a file name
    InvalidCharacter(char),
    AlreadyExists(String),
}

impl std::fmt::Display for InvalidName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidName::Empty => write!(f, "name cannot be empty"),
            InvalidName::ContainsSlash => write!(f, "name cannot contain '/'"),
            InvalidName::StartsWithDot => write!(f, "name cannot begin with '.'"),
            InvalidName::InvalidCharacter(c) => write!(f, "name cannot contain {c:?}"),
            InvalidName::AlreadyExists(name) => write!(f, "'{name}' already exists"),
        }
    }
}

/// Syntax registry error types
#[derive(Debug)]
pub enum SyntaxError {
    /// Neither layer provides the name
    NotFound(String),
    /// A backing file exists but could not be parsed
    LoadFailed {
        name: String,
        source: serde_yaml::Error,
    },
    /// Reading, writing, moving or removing a file failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A definition or manifest could not be encoded or decoded
    Serialize(String),
    /// A proposed name is not usable
    InvalidName(InvalidName),
    /// The name is reserved and cannot be modified
    Reserved(String),
    /// The name belongs to the bundled layer and cannot be deleted or renamed
    Bundled(String),
}

impl SyntaxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyntaxError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the `NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyntaxError::NotFound(_))
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxError::NotFound(name) => write!(f, "Syntax not found: {name}"),
            SyntaxError::LoadFailed { name, source } => {
                write!(f, "Failed to load syntax '{name}': {source}")
            }
            SyntaxError::Io { path, source } => write!(f, "IO error: {}: {source}", path.display()),
            SyntaxError::Serialize(msg) => write!(f, "Serialize error: {msg}"),
            SyntaxError::InvalidName(reason) => write!(f, "Invalid syntax name: {reason}"),
            SyntaxError::Reserved(name) => {
                write!(f, "'{name}' is a reserved syntax and cannot be modified")
            }
            SyntaxError::Bundled(name) => write!(
                f,
                "'{name}' is a bundled syntax; restore it instead of deleting or renaming"
            ),
        }
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyntaxError::LoadFailed { source, .. } => Some(source),
            SyntaxError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<InvalidName> for SyntaxError {
    fn from(reason: InvalidName) -> Self {
        SyntaxError::InvalidName(reason)
    }
}
