//! Stack error types with stable numeric codes.
//!
//! [`StackError`] is the central error type for the descriptor. The
//! resource graph performs the structural checks a provisioning engine
//! would otherwise perform at submission time, so malformed graphs fail
//! here with a typed error instead of during deployment.

use std::path::PathBuf;

use crate::domain::LogicalId;

/// Descriptor error enum with numeric code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              |
/// |-----------|-----------------------|
/// | 1000–1999 | Input / configuration |
/// | 2000–2999 | Resource graph        |
/// | 3000–3999 | Assets                |
/// | 4000–4999 | I/O / serialization   |
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// A configuration value could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A construct path produced an unusable logical id.
    #[error("invalid logical id: {0}")]
    InvalidLogicalId(String),

    /// An argument to a resource helper was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two resources were declared under the same logical id.
    #[error("duplicate resource: {0}")]
    DuplicateResource(LogicalId),

    /// A resource referenced an id that has not been declared yet.
    #[error("{from} references undeclared resource {to}")]
    UnresolvedReference {
        /// Referencing resource.
        from: LogicalId,
        /// Missing target.
        to: LogicalId,
    },

    /// No resource with the given id exists in the graph.
    #[error("resource not found: {0}")]
    ResourceNotFound(LogicalId),

    /// The resource exists but has a different kind than required.
    #[error("resource {id} is not a {expected}")]
    UnexpectedResourceKind {
        /// Offending resource.
        id: LogicalId,
        /// Kind the caller required.
        expected: &'static str,
    },

    /// The declared dependencies contain a cycle.
    #[error("dependency cycle between: {}", format_ids(.0))]
    DependencyCycle(Vec<LogicalId>),

    /// An asset source directory does not exist or is not a directory.
    #[error("asset source not found: {}", .0.display())]
    MissingAsset(PathBuf),

    /// A function references an asset that was not fingerprinted.
    #[error("asset not resolved: {}", .0.display())]
    UnresolvedAsset(PathBuf),

    /// Filesystem failure while reading assets or writing the assembly.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StackError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig(_) => 1001,
            Self::InvalidLogicalId(_) => 1002,
            Self::InvalidArgument(_) => 1003,
            Self::DuplicateResource(_) => 2001,
            Self::UnresolvedReference { .. } => 2002,
            Self::ResourceNotFound(_) => 2003,
            Self::UnexpectedResourceKind { .. } => 2004,
            Self::DependencyCycle(_) => 2005,
            Self::MissingAsset(_) => 3001,
            Self::UnresolvedAsset(_) => 3002,
            Self::Io(_) => 4001,
            Self::Serialization(_) => 4002,
        }
    }

    /// Returns `true` if the error stems from caller input rather than
    /// from the environment (filesystem, serializer).
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        self.error_code() < 3000
    }
}

fn format_ids(ids: &[LogicalId]) -> String {
    ids.iter()
        .map(LogicalId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
