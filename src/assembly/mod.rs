//! Assembly layer: turns a [`StackGraph`] into the files a provisioning
//! engine deploys.
//!
//! ```text
//! <out>/
//!   manifest.json                 artifacts index
//!   <Stack>.template.json         CloudFormation template
//!   <Stack>.assets.json           file assets to upload
//! ```

pub mod asset;
pub mod manifest;
pub mod template;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use asset::{AssetSet, FileAsset, Packaging, fingerprint};
pub use manifest::{
    Artifact, AssemblyManifest, AssetManifestFile, AssetManifestProperties, SCHEMA_VERSION,
    StackProperties,
};
pub use template::{Template, TemplateOutput, TemplateResource};

use crate::error::StackError;
use crate::stack::StackGraph;

/// Name of the top-level manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A synthesized cloud assembly, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    /// Stack name; prefixes every per-stack file.
    pub stack_name: String,
    /// Artifacts index.
    pub manifest: AssemblyManifest,
    /// The rendered template.
    pub template: Template,
    /// The asset manifest.
    pub assets: AssetManifestFile,
}

impl CloudAssembly {
    /// Fingerprints the stack's assets and renders its template.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::MissingAsset`] if a function's code directory
    /// does not exist, and propagates rendering errors.
    pub fn synthesize(stack: &StackGraph) -> Result<Self, StackError> {
        let assets = AssetSet::collect(&stack.resources)?;
        let template = Template::render(stack, &assets)?;

        let template_file = template_file_name(&stack.name);
        let assets_id = format!("{}.assets", stack.name);
        let artifacts = BTreeMap::from([
            (
                assets_id.clone(),
                Artifact::AssetManifest {
                    properties: AssetManifestProperties {
                        file: assets_file_name(&stack.name),
                    },
                },
            ),
            (
                stack.name.clone(),
                Artifact::Stack {
                    environment: stack.context.to_string(),
                    properties: StackProperties {
                        template_file,
                        tags: stack.tags.clone(),
                    },
                    dependencies: vec![assets_id],
                },
            ),
        ]);

        Ok(Self {
            stack_name: stack.name.clone(),
            manifest: AssemblyManifest {
                version: SCHEMA_VERSION.to_string(),
                artifacts,
            },
            template,
            assets: AssetManifestFile::from_assets(&assets),
        })
    }

    /// Writes the assembly into `dir`, creating it if needed. Returns the
    /// paths written.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Io`] or [`StackError::Serialization`] on
    /// failure.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, StackError> {
        fs::create_dir_all(dir)?;
        let files = [
            (
                dir.join(template_file_name(&self.stack_name)),
                self.template.to_json_pretty()?,
            ),
            (
                dir.join(assets_file_name(&self.stack_name)),
                serde_json::to_string_pretty(&self.assets)?,
            ),
            (
                dir.join(MANIFEST_FILE),
                serde_json::to_string_pretty(&self.manifest)?,
            ),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (path, contents) in files {
            fs::write(&path, contents)?;
            tracing::debug!(path = %path.display(), "assembly file written");
            written.push(path);
        }
        tracing::info!(
            stack = %self.stack_name,
            out = %dir.display(),
            resources = self.template.resources.len(),
            "cloud assembly written"
        );
        Ok(written)
    }
}

/// `<Stack>.template.json`.
#[must_use]
pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}.template.json")
}

/// `<Stack>.assets.json`.
#[must_use]
pub fn assets_file_name(stack_name: &str) -> String {
    format!("{stack_name}.assets.json")
}
