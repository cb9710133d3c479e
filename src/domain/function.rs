//! Compute function resource (`AWS::Lambda::Function`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::{Expr, LogicalId};
use crate::error::StackError;

/// Upper bound Lambda enforces on a single invocation.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Lambda's default timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Lambda's default memory size.
pub const DEFAULT_MEMORY_MB: u32 = 128;

/// Execution runtime of the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// `python3.12`.
    Python312,
}

impl Runtime {
    /// Returns the runtime identifier used by Lambda.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python312 => "python3.12",
        }
    }
}

impl Serialize for Runtime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// CPU architecture of the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Graviton (`arm64`).
    Arm64,
}

/// Where the function's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// A local directory packaged and uploaded by the provisioning engine.
    Asset(PathBuf),
}

impl FunctionCode {
    /// Returns the local asset directory.
    #[must_use]
    pub fn asset_path(&self) -> &Path {
        match self {
            Self::Asset(path) => path,
        }
    }
}

/// Resolved code location inside the asset bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Location {
    /// Bucket holding the packaged asset.
    pub s3_bucket: Expr,
    /// Object key of the packaged asset.
    pub s3_key: Expr,
}

/// The message handler function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSpec {
    /// Execution runtime.
    pub runtime: Runtime,
    /// CPU architecture.
    pub architecture: Architecture,
    /// Code source.
    pub code: FunctionCode,
    /// Entry point in `module.function` form.
    pub handler: String,
    /// Per-invocation execution bound.
    pub timeout: Duration,
    /// Memory size in MB.
    pub memory_size_mb: u32,
    /// Execution role.
    pub role: LogicalId,
    /// Environment variables, sorted by name.
    pub environment: BTreeMap<String, Expr>,
}

impl FunctionSpec {
    /// Creates a function with Lambda's default timeout and memory size
    /// and no environment.
    ///
    /// `module` and `entry_point` form the handler string
    /// (`index` + `handler` → `index.handler`).
    #[must_use]
    pub fn new(
        runtime: Runtime,
        architecture: Architecture,
        entry: impl Into<PathBuf>,
        module: &str,
        entry_point: &str,
        role: &LogicalId,
    ) -> Self {
        Self {
            runtime,
            architecture,
            code: FunctionCode::Asset(entry.into()),
            handler: format!("{module}.{entry_point}"),
            timeout: DEFAULT_TIMEOUT,
            memory_size_mb: DEFAULT_MEMORY_MB,
            role: role.clone(),
            environment: BTreeMap::new(),
        }
    }

    /// Sets the execution timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidArgument`] unless the timeout is a
    /// whole number of seconds between 1 second and 15 minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, StackError> {
        if timeout.subsec_nanos() != 0 || timeout.is_zero() || timeout > MAX_TIMEOUT {
            return Err(StackError::InvalidArgument(format!(
                "function timeout must be 1..={} whole seconds, got {timeout:?}",
                MAX_TIMEOUT.as_secs()
            )));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Sets an environment variable, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidArgument`] if the name is not a valid
    /// variable name or uses the `AWS_` prefix Lambda reserves.
    pub fn add_environment(&mut self, name: &str, value: Expr) -> Result<(), StackError> {
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid || name.starts_with("AWS_") {
            return Err(StackError::InvalidArgument(format!(
                "invalid environment variable name: {name}"
            )));
        }
        self.environment.insert(name.to_string(), value);
        Ok(())
    }

    /// Returns every logical id the function depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        std::iter::once(&self.role)
            .chain(self.environment.values().flat_map(Expr::references))
            .collect()
    }

    /// Builds the CloudFormation properties given the resolved code
    /// location.
    #[must_use]
    pub fn properties(&self, code: S3Location) -> FunctionProperties<'_> {
        FunctionProperties {
            code,
            role: Expr::get_att(&self.role, "Arn"),
            runtime: self.runtime,
            architectures: [self.architecture],
            handler: &self.handler,
            timeout: self.timeout.as_secs(),
            memory_size: self.memory_size_mb,
            environment: (!self.environment.is_empty()).then_some(Environment {
                variables: &self.environment,
            }),
        }
    }
}

/// Serialized form of [`FunctionSpec`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties<'a> {
    code: S3Location,
    role: Expr,
    runtime: Runtime,
    architectures: [Architecture; 1],
    handler: &'a str,
    timeout: u64,
    memory_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<Environment<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Environment<'a> {
    variables: &'a BTreeMap<String, Expr>,
}
