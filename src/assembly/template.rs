//! CloudFormation template rendering.

use std::collections::BTreeMap;

use serde::Serialize;

use super::asset::AssetSet;
use crate::domain::Expr;
use crate::error::StackError;
use crate::stack::StackGraph;

/// A rendered CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Template description.
    pub description: String,
    /// Resources keyed by logical id.
    pub resources: BTreeMap<String, TemplateResource>,
    /// Stack outputs keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

/// One entry of the template's `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    /// CloudFormation resource type.
    #[serde(rename = "Type")]
    pub resource_type: &'static str,
    /// Resource properties.
    pub properties: serde_json::Value,
    /// Explicit creation-order dependencies, sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Construct path metadata.
    pub metadata: BTreeMap<&'static str, String>,
}

/// One entry of the template's `Outputs` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    /// Human-readable description.
    pub description: String,
    /// Output value.
    pub value: Expr,
}

impl Template {
    /// Renders `stack` with function code resolved through `assets`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnresolvedAsset`] if a function's code was not
    /// fingerprinted, or [`StackError::Serialization`] if a property fails
    /// to serialize.
    pub fn render(stack: &StackGraph, assets: &AssetSet) -> Result<Self, StackError> {
        let mut resources = BTreeMap::new();
        for (id, entry) in stack.resources.iter() {
            let properties = entry.resource.properties(|code| assets.resolve(code))?;
            resources.insert(
                id.to_string(),
                TemplateResource {
                    resource_type: entry.resource.kind().cfn_type(),
                    properties,
                    depends_on: entry.depends_on.iter().map(ToString::to_string).collect(),
                    metadata: BTreeMap::from([(
                        "aws:cdk:path",
                        format!("{}/{}", stack.name, entry.path),
                    )]),
                },
            );
        }

        let outputs = stack
            .resources
            .outputs()
            .iter()
            .map(|(name, output)| {
                (
                    name.clone(),
                    TemplateOutput {
                        description: output.description.clone(),
                        value: output.value.clone(),
                    },
                )
            })
            .collect();

        Ok(Self {
            description: format!(
                "{}: WebSocket API backed by a Bedrock-enabled Lambda handler",
                stack.name
            ),
            resources,
            outputs,
        })
    }

    /// Serializes the template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Serialization`] on serializer failure.
    pub fn to_json_pretty(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
