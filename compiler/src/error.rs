use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed code generation request: {0}")]
    MalformedRequest(#[from] prost::DecodeError),

    #[error("Invalid descriptor set: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    #[error("File \"{0}\" was requested for generation but is not in the descriptor set")]
    MissingFile(String),

    #[error("The type \"{type_name}\" is not defined (referenced by {referenced_by})")]
    MissingType {
        type_name:     String,
        referenced_by: String,
    },

    #[error("Enum \"{0}\" has no value numbered 0")]
    MissingZeroValue(String),

    #[error("Unsupported field type {kind} for {field}")]
    UnsupportedType {
        field: String,
        kind:  String,
    },

    #[error("Invalid plugin parameter \"{key}\": {reason}")]
    InvalidParameter {
        key:    String,
        reason: String,
    },

    #[error("Name collision: \"{first}\" and \"{second}\" both resolve to \"{ident}\"")]
    NameCollision {
        first:  String,
        second: String,
        ident:  String,
    },
}

/// Coarse classification used when reporting a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or incomplete descriptor input.
    Input,
    /// Bad parameter string or an unresolvable naming conflict.
    Configuration,
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::InvalidParameter { .. } | CompileError::NameCollision { .. } => {
                ErrorCategory::Configuration
            }
            _ => ErrorCategory::Input,
        }
    }
}
