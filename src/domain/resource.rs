//! Closed set of resource kinds the descriptor can declare.

use std::fmt;

use super::function::{FunctionCode, FunctionSpec, S3Location};
use super::gateway::{IntegrationSpec, PermissionSpec, RouteSpec, StageSpec, WebSocketApiSpec};
use super::policy::{PolicySpec, RoleSpec};
use super::{Expr, LogicalId};
use crate::error::StackError;

/// Discriminator for [`Resource`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// Execution role.
    Role,
    /// Access policy.
    Policy,
    /// Compute function.
    Function,
    /// WebSocket gateway.
    WebSocketApi,
    /// Route-to-function binding.
    Integration,
    /// Route-key dispatch rule.
    Route,
    /// Invoke permission for the gateway.
    Permission,
    /// Published deployment.
    Stage,
}

impl ResourceKind {
    /// Returns the CloudFormation resource type.
    #[must_use]
    pub const fn cfn_type(self) -> &'static str {
        match self {
            Self::Role => "AWS::IAM::Role",
            Self::Policy => "AWS::IAM::Policy",
            Self::Function => "AWS::Lambda::Function",
            Self::WebSocketApi => "AWS::ApiGatewayV2::Api",
            Self::Integration => "AWS::ApiGatewayV2::Integration",
            Self::Route => "AWS::ApiGatewayV2::Route",
            Self::Permission => "AWS::Lambda::Permission",
            Self::Stage => "AWS::ApiGatewayV2::Stage",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cfn_type())
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `AWS::IAM::Role`.
    Role(RoleSpec),
    /// `AWS::IAM::Policy`.
    Policy(PolicySpec),
    /// `AWS::Lambda::Function`.
    Function(FunctionSpec),
    /// `AWS::ApiGatewayV2::Api`.
    WebSocketApi(WebSocketApiSpec),
    /// `AWS::ApiGatewayV2::Integration`.
    Integration(IntegrationSpec),
    /// `AWS::ApiGatewayV2::Route`.
    Route(RouteSpec),
    /// `AWS::Lambda::Permission`.
    Permission(PermissionSpec),
    /// `AWS::ApiGatewayV2::Stage`.
    Stage(StageSpec),
}

impl Resource {
    /// Returns the variant discriminator.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Role(_) => ResourceKind::Role,
            Self::Policy(_) => ResourceKind::Policy,
            Self::Function(_) => ResourceKind::Function,
            Self::WebSocketApi(_) => ResourceKind::WebSocketApi,
            Self::Integration(_) => ResourceKind::Integration,
            Self::Route(_) => ResourceKind::Route,
            Self::Permission(_) => ResourceKind::Permission,
            Self::Stage(_) => ResourceKind::Stage,
        }
    }

    /// Returns every logical id this resource's properties reference.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        match self {
            Self::Role(role) => role.references(),
            Self::Policy(policy) => policy.references(),
            Self::Function(function) => function.references(),
            Self::WebSocketApi(_) => Vec::new(),
            Self::Integration(integration) => integration.references(),
            Self::Route(route) => route.references(),
            Self::Permission(permission) => permission.references(),
            Self::Stage(stage) => stage.references(),
        }
    }

    /// Builds the CloudFormation `Properties` object.
    ///
    /// `resolve_code` maps a function's local code source to its uploaded
    /// location.
    ///
    /// # Errors
    ///
    /// Propagates errors from `resolve_code` and from serialization.
    pub fn properties<F>(&self, resolve_code: F) -> Result<serde_json::Value, StackError>
    where
        F: FnOnce(&FunctionCode) -> Result<S3Location, StackError>,
    {
        let value = match self {
            Self::Role(role) => serde_json::json!({
                "AssumeRolePolicyDocument": role.trust,
                "ManagedPolicyArns": role.managed_policy_arns,
            }),
            Self::Policy(policy) => serde_json::json!({
                "PolicyDocument": policy.document,
                "PolicyName": policy.name,
                "Roles": policy.roles.iter().map(Expr::reference).collect::<Vec<_>>(),
            }),
            Self::Function(function) => {
                let code = resolve_code(&function.code)?;
                serde_json::to_value(function.properties(code))?
            }
            Self::WebSocketApi(api) => serde_json::to_value(api)?,
            Self::Integration(integration) => integration.properties(),
            Self::Route(route) => route.properties(),
            Self::Permission(permission) => permission.properties(),
            Self::Stage(stage) => stage.properties(),
        };
        Ok(value)
    }

    /// Returns the function spec, if this is a function.
    #[must_use]
    pub const fn as_function(&self) -> Option<&FunctionSpec> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Returns the policy spec, if this is a policy.
    #[must_use]
    pub const fn as_policy(&self) -> Option<&PolicySpec> {
        match self {
            Self::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    /// Returns the stage spec, if this is a stage.
    #[must_use]
    pub const fn as_stage(&self) -> Option<&StageSpec> {
        match self {
            Self::Stage(stage) => Some(stage),
            _ => None,
        }
    }

    /// Returns the route spec, if this is a route.
    #[must_use]
    pub const fn as_route(&self) -> Option<&RouteSpec> {
        match self {
            Self::Route(route) => Some(route),
            _ => None,
        }
    }

    /// Returns the integration spec, if this is an integration.
    #[must_use]
    pub const fn as_integration(&self) -> Option<&IntegrationSpec> {
        match self {
            Self::Integration(integration) => Some(integration),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::policy::PolicyStatement;

    fn id(s: &str) -> LogicalId {
        let Ok(id) = LogicalId::new(s) else {
            panic!("valid logical id");
        };
        id
    }

    #[test]
    fn kind_maps_to_cfn_type() {
        let api = Resource::WebSocketApi(WebSocketApiSpec::new("Api"));
        assert_eq!(api.kind(), ResourceKind::WebSocketApi);
        assert_eq!(api.kind().to_string(), "AWS::ApiGatewayV2::Api");
        assert!(api.references().is_empty());
    }

    #[test]
    fn policy_properties_reference_roles() {
        let policy = Resource::Policy(PolicySpec::for_role(
            "InvokePolicy",
            &id("Role"),
            PolicyStatement::allow(["bedrock:InvokeModel"], [Expr::literal("*")]),
        ));
        let Ok(props) = policy.properties(|_| panic!("no code for policies")) else {
            panic!("properties failed");
        };
        assert_eq!(props.get("Roles"), Some(&json!([{"Ref": "Role"}])));
        assert_eq!(
            props.pointer("/PolicyDocument/Version"),
            Some(&json!("2012-10-17"))
        );
    }

    #[test]
    fn function_properties_propagate_resolver_errors() {
        let function = Resource::Function(FunctionSpec::new(
            crate::domain::Runtime::Python312,
            crate::domain::Architecture::Arm64,
            "missing",
            "index",
            "handler",
            &id("Role"),
        ));
        let result = function.properties(|code| {
            Err(StackError::UnresolvedAsset(code.asset_path().to_path_buf()))
        });
        assert!(matches!(result, Err(StackError::UnresolvedAsset(_))));
    }

    #[test]
    fn accessors_match_variant() {
        let api = Resource::WebSocketApi(WebSocketApiSpec::new("Api"));
        assert!(api.as_function().is_none());
        assert!(api.as_policy().is_none());
        assert!(api.as_stage().is_none());
    }
}
