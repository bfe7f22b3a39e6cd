//! Core error types for AOProto

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// A type's declared fields could not be turned into a codec.
    #[error("Schema build error for {type_name}: {reason}")]
    SchemaBuild { type_name: String, reason: String },

    /// A type refers back to itself with nothing on the path that can end the recursion.
    #[error("Unsupported recursive schema: {type_name}")]
    UnsupportedRecursiveSchema { type_name: String },

    #[error("Truncated stream: needed {needed} bytes, {remaining} remaining")]
    TruncatedStream { needed: usize, remaining: usize },

    /// A field references a flags group that has no carrier in the same schema.
    #[error("Unknown flags group '{group}' referenced by {type_name}.{field}")]
    UnknownFlagsGroup {
        type_name: String,
        field: String,
        group: String,
    },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub fn schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaBuild {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether the error was raised while building a codec rather than while
    /// reading or writing data.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaBuild { .. }
                | Self::UnsupportedRecursiveSchema { .. }
                | Self::UnknownFlagsGroup { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
