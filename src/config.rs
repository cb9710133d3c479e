//! Stack configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Account and region use the same
//! variable names as the CDK CLI so an existing deploy environment works
//! unchanged. CLI flags in the binary override whatever is loaded here.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StackError;

/// Default stack (and assembly artifact) name.
pub const DEFAULT_STACK_NAME: &str = "WebsocketSampleStack";

/// Default stage name.
pub const DEFAULT_STAGE_NAME: &str = "dev";

/// Default handler entry directory, relative to the crate root.
pub const DEFAULT_HANDLER_ENTRY: &str = "lambda/websocket";

/// Default cloud assembly output directory.
pub const DEFAULT_OUTDIR: &str = "cdk.out";

/// Where the stack will be deployed.
///
/// Either part may be unknown at synthesis time; the provisioning engine
/// then resolves it from its own credentials ("environment-agnostic").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeploymentContext {
    /// Target AWS account id.
    pub account: Option<String>,
    /// Target AWS region.
    pub region: Option<String>,
}

impl DeploymentContext {
    /// Creates a fully specified context.
    #[must_use]
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    /// Returns `true` when either the account or the region is unknown.
    #[must_use]
    pub const fn is_agnostic(&self) -> bool {
        self.account.is_none() || self.region.is_none()
    }
}

impl fmt::Display for DeploymentContext {
    /// Formats as `aws://<account>/<region>` with `unknown-account` /
    /// `unknown-region` placeholders.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region"),
        )
    }
}

/// Stack-level options a caller may change.
///
/// Nothing here can turn off stage auto-deploy or change the model access
/// grant; those are fixed properties of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackOverrides {
    /// Stack name.
    pub stack_name: String,
    /// Stage name.
    pub stage_name: String,
    /// Handler entry directory.
    pub handler_entry: PathBuf,
    /// Stack tags, passed through to the provisioning engine.
    pub tags: BTreeMap<String, String>,
}

impl Default for StackOverrides {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            stage_name: DEFAULT_STAGE_NAME.to_string(),
            handler_entry: resolve_handler_entry(DEFAULT_HANDLER_ENTRY),
            tags: BTreeMap::new(),
        }
    }
}

/// Top-level synthesis configuration.
///
/// Loaded once at startup via [`StackConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Deployment target.
    pub context: DeploymentContext,
    /// Stack-level options.
    pub overrides: StackOverrides,
    /// Cloud assembly output directory.
    pub output_dir: PathBuf,
}

impl StackConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] if `STACK_TAGS` is set but
    /// malformed.
    pub fn from_env() -> Result<Self, StackError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] if `STACK_TAGS` is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StackError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let context = DeploymentContext {
            account: non_empty("CDK_DEFAULT_ACCOUNT").or_else(|| non_empty("AWS_ACCOUNT_ID")),
            region: non_empty("CDK_DEFAULT_REGION").or_else(|| non_empty("AWS_REGION")),
        };

        let tags = match non_empty("STACK_TAGS") {
            Some(raw) => parse_tags(&raw)?,
            None => BTreeMap::new(),
        };

        let overrides = StackOverrides {
            stack_name: non_empty("STACK_NAME").unwrap_or_else(|| DEFAULT_STACK_NAME.to_string()),
            stage_name: non_empty("STAGE_NAME").unwrap_or_else(|| DEFAULT_STAGE_NAME.to_string()),
            handler_entry: resolve_handler_entry(
                non_empty("HANDLER_ENTRY").unwrap_or_else(|| DEFAULT_HANDLER_ENTRY.to_string()),
            ),
            tags,
        };

        let output_dir = non_empty("CDK_OUTDIR").map_or_else(|| PathBuf::from(DEFAULT_OUTDIR), PathBuf::from);

        Ok(Self {
            context,
            overrides,
            output_dir,
        })
    }
}

/// Resolves a configured handler entry directory.
///
/// Absolute paths are returned unchanged. Relative paths are joined onto
/// the crate root (`CARGO_MANIFEST_DIR`), where the bundled handler lives,
/// not onto the working directory.
#[must_use]
pub fn resolve_handler_entry(entry: impl AsRef<Path>) -> PathBuf {
    let entry = entry.as_ref();
    if entry.is_absolute() {
        entry.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(entry)
    }
}

/// Parses `key=value,key=value` into a sorted tag map.
///
/// Whitespace around keys and values is trimmed; empty segments are
/// skipped. Later duplicates win.
///
/// # Errors
///
/// Returns [`StackError::InvalidConfig`] for a segment without `=` or with
/// an empty key.
pub fn parse_tags(raw: &str) -> Result<BTreeMap<String, String>, StackError> {
    let mut tags = BTreeMap::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = parse_tag(segment)?;
        tags.insert(key, value);
    }
    Ok(tags)
}

/// Parses a single `key=value` tag.
///
/// # Errors
///
/// Returns [`StackError::InvalidConfig`] if there is no `=` or the key is
/// empty.
pub fn parse_tag(segment: &str) -> Result<(String, String), StackError> {
    let Some((key, value)) = segment.split_once('=') else {
        return Err(StackError::InvalidConfig(format!(
            "tag must be key=value: {segment}"
        )));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(StackError::InvalidConfig(format!(
            "tag key must not be empty: {segment}"
        )));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
