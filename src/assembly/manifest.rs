//! Cloud assembly manifests consumed by the provisioning engine.
//!
//! `manifest.json` lists the artifacts (the stack and its asset manifest);
//! `<Stack>.assets.json` lists the file assets to package and upload
//! before the template is deployed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::asset::{ASSET_BUCKET, AssetSet, Packaging};

/// Cloud assembly schema version the manifests conform to.
pub const SCHEMA_VERSION: &str = "36.0.0";

/// Top-level `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    /// Schema version.
    pub version: String,
    /// Artifacts keyed by artifact id.
    pub artifacts: BTreeMap<String, Artifact>,
}

/// One deployable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Artifact {
    /// A CloudFormation stack.
    #[serde(rename = "aws:cloudformation:stack")]
    Stack {
        /// `aws://<account>/<region>`.
        environment: String,
        /// Template location and stack tags.
        properties: StackProperties,
        /// Artifacts that must be published first.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dependencies: Vec<String>,
    },
    /// A file-asset manifest.
    #[serde(rename = "cdk:asset-manifest")]
    AssetManifest {
        /// Asset manifest location.
        properties: AssetManifestProperties,
    },
}

/// Properties of a stack artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProperties {
    /// Template file name, relative to the assembly directory.
    pub template_file: String,
    /// Stack tags applied by the provisioning engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Properties of an asset-manifest artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifestProperties {
    /// Asset manifest file name, relative to the assembly directory.
    pub file: String,
}

/// `<Stack>.assets.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifestFile {
    /// Schema version.
    pub version: String,
    /// File assets keyed by content hash.
    pub files: BTreeMap<String, FileAssetEntry>,
    /// Container image assets (always empty for this stack).
    pub docker_images: BTreeMap<String, serde_json::Value>,
}

impl AssetManifestFile {
    /// Describes every asset in `assets` with its bootstrap-bucket
    /// destination.
    #[must_use]
    pub fn from_assets(assets: &AssetSet) -> Self {
        let files = assets
            .iter()
            .map(|asset| {
                let destination = FileDestination {
                    bucket_name: ASSET_BUCKET.to_string(),
                    object_key: asset.object_key(),
                };
                let entry = FileAssetEntry {
                    source: FileSource {
                        path: asset.source.to_string_lossy().into_owned(),
                        packaging: asset.packaging,
                    },
                    destinations: BTreeMap::from([(
                        "current_account-current_region".to_string(),
                        destination,
                    )]),
                };
                (asset.hash.clone(), entry)
            })
            .collect();
        Self {
            version: SCHEMA_VERSION.to_string(),
            files,
            docker_images: BTreeMap::new(),
        }
    }
}

/// One file asset: where it comes from and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssetEntry {
    /// Local source.
    pub source: FileSource,
    /// Upload destinations keyed by destination id.
    pub destinations: BTreeMap<String, FileDestination>,
}

/// Local source of a file asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    /// Absolute path on the synthesizing machine.
    pub path: String,
    /// Packaging to apply.
    pub packaging: Packaging,
}

/// Upload destination of a file asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDestination {
    /// Bucket name, with pseudo-parameter placeholders.
    pub bucket_name: String,
    /// Object key.
    pub object_key: String,
}
