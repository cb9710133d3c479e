//! File assets: content fingerprints and upload destinations.
//!
//! A function's code directory is identified by the SHA-256 of its
//! contents. The fingerprint becomes the object key in the bootstrap
//! asset bucket, so unchanged code maps to an unchanged key and the
//! provisioning engine can skip the upload.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Expr, FunctionCode, ResourceGraph, ResourceKind, S3Location};
use crate::error::StackError;

/// Bootstrap bucket holding file assets, resolved per account and region.
pub const ASSET_BUCKET: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";

/// Directory entries never included in a fingerprint.
const IGNORED_NAMES: [&str; 1] = ["__pycache__"];

/// How an asset is packaged before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    /// Directory zipped into one archive.
    Zip,
}

/// A fingerprinted local asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileAsset {
    /// Lowercase hex SHA-256 of the contents.
    pub hash: String,
    /// Absolute source path.
    pub source: PathBuf,
    /// Packaging applied by the provisioning engine.
    pub packaging: Packaging,
}

impl FileAsset {
    /// Fingerprints a code directory.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingAsset`] if `dir` is not a directory,
    /// [`StackError::Io`] if it cannot be read, and
    /// [`StackError::InvalidArgument`] for a symlink loop.
    pub fn from_dir(dir: &Path) -> Result<Self, StackError> {
        if !dir.is_dir() {
            return Err(StackError::MissingAsset(dir.to_path_buf()));
        }
        let hash = fingerprint(dir)?;
        let source = fs::canonicalize(dir)?;
        tracing::debug!(path = %source.display(), %hash, "asset fingerprinted");
        Ok(Self {
            hash,
            source,
            packaging: Packaging::Zip,
        })
    }

    /// Object key inside [`ASSET_BUCKET`].
    #[must_use]
    pub fn object_key(&self) -> String {
        match self.packaging {
            Packaging::Zip => format!("{}.zip", self.hash),
        }
    }

    /// Location the function's `Code` property points at.
    #[must_use]
    pub fn location(&self) -> S3Location {
        S3Location {
            s3_bucket: Expr::Sub(ASSET_BUCKET.to_string()),
            s3_key: Expr::literal(self.object_key()),
        }
    }
}

/// Every asset a stack needs, keyed by the path the graph declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSet {
    by_path: BTreeMap<PathBuf, FileAsset>,
}

impl AssetSet {
    /// Fingerprints the code of every function in `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingAsset`] for a code directory that does
    /// not exist and [`StackError::Io`] for unreadable files.
    pub fn collect(graph: &ResourceGraph) -> Result<Self, StackError> {
        let mut by_path = BTreeMap::new();
        for (_, resource) in graph.of_kind(ResourceKind::Function) {
            let Some(function) = resource.as_function() else {
                continue;
            };
            let path = function.code.asset_path();
            if !by_path.contains_key(path) {
                by_path.insert(path.to_path_buf(), FileAsset::from_dir(path)?);
            }
        }
        Ok(Self { by_path })
    }

    /// Inserts an already fingerprinted asset under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, asset: FileAsset) {
        self.by_path.insert(path.into(), asset);
    }

    /// Resolves a function's code source to its upload location.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnresolvedAsset`] if the path was never
    /// fingerprinted.
    pub fn resolve(&self, code: &FunctionCode) -> Result<S3Location, StackError> {
        let path = code.asset_path();
        self.by_path
            .get(path)
            .map(FileAsset::location)
            .ok_or_else(|| StackError::UnresolvedAsset(path.to_path_buf()))
    }

    /// Iterates distinct assets (deduplicated by hash), sorted by hash.
    pub fn iter(&self) -> impl Iterator<Item = &FileAsset> {
        let unique: BTreeMap<&str, &FileAsset> = self
            .by_path
            .values()
            .map(|asset| (asset.hash.as_str(), asset))
            .collect();
        unique.into_values()
    }

    /// Returns `true` if no assets were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// SHA-256 over every file under `dir`: relative path, length, and bytes,
/// in sorted path order. Dot-files and `__pycache__` are skipped.
/// Symlinks are followed and hashed under the link's own path, so editing
/// a linked file changes the fingerprint.
///
/// # Errors
///
/// Returns [`StackError::Io`] if a directory or file cannot be read
/// (including a dangling symlink), and [`StackError::InvalidArgument`] if a
/// symlink points back at one of its own ancestor directories.
pub fn fingerprint(dir: &Path) -> Result<String, StackError> {
    let mut files = Vec::new();
    let mut ancestors = Vec::new();
    walk(dir, dir, &mut ancestors, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for (relative, absolute) in &files {
        let contents = fs::read(absolute)?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(hex_encode(&hasher.finalize()))
}

/// `ancestors` holds the canonical paths of the directories being walked,
/// so a symlinked directory that loops back is detected.
fn walk(
    root: &Path,
    dir: &Path,
    ancestors: &mut Vec<PathBuf>,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<(), StackError> {
    let canonical = fs::canonicalize(dir)?;
    if ancestors.contains(&canonical) {
        return Err(StackError::InvalidArgument(format!(
            "symlink loop in asset directory: {}",
            dir.display()
        )));
    }
    ancestors.push(canonical);

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || IGNORED_NAMES.contains(&&*name) {
            continue;
        }
        let path = entry.path();
        // Follows symlinks, unlike `entry.file_type()`.
        let metadata = fs::metadata(&path)?;
        if metadata.is_dir() {
            walk(root, &path, ancestors, out)?;
        } else if metadata.is_file() {
            out.push((relative_key(root, &path), path));
        }
    }

    ancestors.pop();
    Ok(())
}

/// `/`-separated path of `path` below `root`, independent of platform.
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            let Ok(()) = fs::create_dir_all(parent) else {
                panic!("create {parent:?}");
            };
        }
        let Ok(()) = fs::write(&path, contents) else {
            panic!("write {path:?}");
        };
    }

    fn tempdir() -> tempfile::TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        dir
    }

    fn hash(dir: &Path) -> String {
        let Ok(hash) = fingerprint(dir) else {
            panic!("fingerprint {dir:?}");
        };
        hash
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let dir = tempdir();
        write(dir.path(), "index.py", "def handler(event, context): pass\n");
        let first = hash(dir.path());
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(first, hash(dir.path()));
    }

    #[test]
    fn fingerprint_ignores_location_and_creation_order() {
        let a = tempdir();
        write(a.path(), "index.py", "x");
        write(a.path(), "pkg/tools.py", "y");
        let b = tempdir();
        write(b.path(), "pkg/tools.py", "y");
        write(b.path(), "index.py", "x");
        assert_eq!(hash(a.path()), hash(b.path()));
    }

    #[test]
    fn fingerprint_tracks_content_and_names() {
        let dir = tempdir();
        write(dir.path(), "index.py", "x");
        let before = hash(dir.path());
        write(dir.path(), "index.py", "y");
        assert_ne!(before, hash(dir.path()));

        let renamed = tempdir();
        write(renamed.path(), "main.py", "y");
        assert_ne!(hash(dir.path()), hash(renamed.path()));
    }

    #[test]
    fn fingerprint_skips_caches_and_dotfiles() {
        let dir = tempdir();
        write(dir.path(), "index.py", "x");
        let clean = hash(dir.path());
        write(dir.path(), "__pycache__/index.cpython-312.pyc", "bytecode");
        write(dir.path(), ".env", "SECRET=1");
        assert_eq!(clean, hash(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn fingerprint_follows_symlinked_files() {
        use std::os::unix::fs::symlink;

        let shared = tempdir();
        write(shared.path(), "tools.py", "v1");
        let handler = tempdir();
        write(handler.path(), "index.py", "x");
        let Ok(()) = symlink(shared.path().join("tools.py"), handler.path().join("tools.py")) else {
            panic!("symlink");
        };

        let before = hash(handler.path());
        write(shared.path(), "tools.py", "v2 with different content");
        assert_ne!(before, hash(handler.path()));
    }

    #[cfg(unix)]
    #[test]
    fn fingerprint_hashes_symlinked_directories_under_link_path() {
        use std::os::unix::fs::symlink;

        let shared = tempdir();
        write(shared.path(), "schema.py", "s");
        let linked = tempdir();
        write(linked.path(), "index.py", "x");
        let Ok(()) = symlink(shared.path(), linked.path().join("lib")) else {
            panic!("symlink");
        };
        let copied = tempdir();
        write(copied.path(), "index.py", "x");
        write(copied.path(), "lib/schema.py", "s");

        assert_eq!(hash(linked.path()), hash(copied.path()));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempdir();
        write(dir.path(), "index.py", "x");
        let Ok(()) = symlink(dir.path(), dir.path().join("again")) else {
            panic!("symlink");
        };
        assert!(matches!(
            fingerprint(dir.path()),
            Err(StackError::InvalidArgument(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_an_io_error() {
        use std::os::unix::fs::symlink;

        let dir = tempdir();
        write(dir.path(), "index.py", "x");
        let Ok(()) = symlink(dir.path().join("gone.py"), dir.path().join("tools.py")) else {
            panic!("symlink");
        };
        assert!(matches!(fingerprint(dir.path()), Err(StackError::Io(_))));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempdir();
        let missing = dir.path().join("nope");
        assert!(matches!(
            FileAsset::from_dir(&missing),
            Err(StackError::MissingAsset(_))
        ));
    }

    #[test]
    fn location_uses_bootstrap_bucket() {
        let asset = FileAsset {
            hash: "abc".to_string(),
            source: PathBuf::from("/tmp/x"),
            packaging: Packaging::Zip,
        };
        let location = asset.location();
        assert_eq!(location.s3_key, Expr::literal("abc.zip"));
        assert_eq!(location.s3_bucket, Expr::Sub(ASSET_BUCKET.to_string()));
    }

    #[test]
    fn unresolved_code_is_an_error() {
        let set = AssetSet::default();
        let code = FunctionCode::Asset(PathBuf::from("lambda/websocket"));
        assert!(matches!(set.resolve(&code), Err(StackError::UnresolvedAsset(_))));
    }

    #[test]
    fn iter_deduplicates_by_hash() {
        let asset = FileAsset {
            hash: "abc".to_string(),
            source: PathBuf::from("/tmp/x"),
            packaging: Packaging::Zip,
        };
        let mut set = AssetSet::default();
        set.insert("a", asset.clone());
        set.insert("./a", asset);
        assert_eq!(set.iter().count(), 1);
        assert!(!set.is_empty());
    }
}
