//! WebSocket gateway resources (API Gateway v2).
//!
//! A gateway is split into several resources: the API itself, one
//! integration and one route per route key, an invoke permission per
//! route, and a stage. Each piece references the API by logical id, so the
//! API must be declared first.

use std::fmt;

use serde::Serialize;

use super::{Expr, LogicalId};
use crate::error::StackError;

/// Route selection expression used when no custom routes are declared.
pub const DEFAULT_ROUTE_SELECTION: &str = "$request.body.action";

/// Built-in WebSocket route keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteKey {
    /// `$connect`: invoked when a client opens a connection.
    Connect,
    /// `$disconnect`: invoked when a connection closes.
    Disconnect,
    /// `$default`: every other inbound message.
    Default,
}

impl RouteKey {
    /// All built-in route keys, in declaration order.
    pub const ALL: [Self; 3] = [Self::Connect, Self::Disconnect, Self::Default];

    /// Returns the wire route key (e.g. `$connect`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "$connect",
            Self::Disconnect => "$disconnect",
            Self::Default => "$default",
        }
    }

    /// Returns the construct name prefix for this route (e.g. `Connect`).
    #[must_use]
    pub const fn construct_name(self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Disconnect => "Disconnect",
            Self::Default => "Default",
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RouteKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The WebSocket API (`AWS::ApiGatewayV2::Api`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebSocketApiSpec {
    /// API name.
    pub name: String,
    /// Always `WEBSOCKET`.
    pub protocol_type: &'static str,
    /// How the route key is extracted from inbound messages.
    pub route_selection_expression: String,
}

impl WebSocketApiSpec {
    /// Creates a WebSocket API with the default route selection expression.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol_type: "WEBSOCKET",
            route_selection_expression: DEFAULT_ROUTE_SELECTION.to_string(),
        }
    }

    /// The `wss://` endpoint of the API declared under `api`.
    #[must_use]
    pub fn endpoint(api: &LogicalId) -> Expr {
        Expr::get_att(api, "ApiEndpoint")
    }

    /// The execute-API ARN of the API declared under `api`, narrowed to
    /// `stage`, `method`, and `path`:
    /// `arn:...:execute-api:<region>:<account>:<apiId>/<stage>/<method><path>`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidArgument`] if `path` does not start
    /// with `/`.
    pub fn arn_for_execute_api(
        api: &LogicalId,
        method: &str,
        path: &str,
        stage: &str,
    ) -> Result<Expr, StackError> {
        if !path.starts_with('/') {
            return Err(StackError::InvalidArgument(format!(
                "execute-api path must start with '/': {path}"
            )));
        }
        Ok(Expr::arn(
            "execute-api",
            Expr::reference(api),
            &format!("{stage}/{method}{path}"),
        ))
    }
}

/// How an integration calls its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntegrationType {
    /// Lambda proxy: the whole event is passed to the function.
    #[serde(rename = "AWS_PROXY")]
    AwsProxy,
}

/// Binds a route to a function (`AWS::ApiGatewayV2::Integration`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegrationSpec {
    /// Owning API.
    pub api: LogicalId,
    /// Target function.
    pub function: LogicalId,
    /// Invocation mode.
    pub integration_type: IntegrationType,
}

impl IntegrationSpec {
    /// Lambda proxy integration on `api` targeting `function`.
    #[must_use]
    pub fn lambda(api: &LogicalId, function: &LogicalId) -> Self {
        Self {
            api: api.clone(),
            function: function.clone(),
            integration_type: IntegrationType::AwsProxy,
        }
    }

    /// The Lambda invocation URI API Gateway calls.
    #[must_use]
    pub fn integration_uri(&self) -> Expr {
        Expr::concat([
            Expr::literal("arn:"),
            Expr::Pseudo(super::Pseudo::Partition),
            Expr::literal(":apigateway:"),
            Expr::Pseudo(super::Pseudo::Region),
            Expr::literal(":lambda:path/2015-03-31/functions/"),
            Expr::get_att(&self.function, "Arn"),
            Expr::literal("/invocations"),
        ])
    }

    /// Returns every logical id the integration depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        vec![&self.api, &self.function]
    }

    /// Builds the CloudFormation properties.
    #[must_use]
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "ApiId": Expr::reference(&self.api),
            "IntegrationType": self.integration_type,
            "IntegrationUri": self.integration_uri(),
        })
    }
}

/// A route dispatching one route key (`AWS::ApiGatewayV2::Route`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteSpec {
    /// Owning API.
    pub api: LogicalId,
    /// Dispatched route key.
    pub route_key: RouteKey,
    /// Integration receiving the route.
    pub integration: LogicalId,
}

impl RouteSpec {
    /// Returns every logical id the route depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        vec![&self.api, &self.integration]
    }

    /// Builds the CloudFormation properties.
    #[must_use]
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "ApiId": Expr::reference(&self.api),
            "RouteKey": self.route_key,
            "AuthorizationType": "NONE",
            "Target": Expr::concat([
                Expr::literal("integrations/"),
                Expr::reference(&self.integration),
            ]),
        })
    }
}

/// Allows API Gateway to invoke the function for one route
/// (`AWS::Lambda::Permission`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionSpec {
    /// Invoked function.
    pub function: LogicalId,
    /// Calling API.
    pub api: LogicalId,
    /// Route the permission is scoped to.
    pub route_key: RouteKey,
}

impl PermissionSpec {
    /// ARN pattern of calls allowed to invoke the function.
    #[must_use]
    pub fn source_arn(&self) -> Expr {
        Expr::arn(
            "execute-api",
            Expr::reference(&self.api),
            &format!("*/*{}", self.route_key),
        )
    }

    /// Returns every logical id the permission depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        vec![&self.function, &self.api]
    }

    /// Builds the CloudFormation properties.
    #[must_use]
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": Expr::get_att(&self.function, "Arn"),
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": self.source_arn(),
        })
    }
}

/// A published deployment of the API (`AWS::ApiGatewayV2::Stage`).
///
/// Auto-deploy is always on: every change to the API's routes is
/// republished immediately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageSpec {
    /// Owning API.
    pub api: LogicalId,
    stage_name: String,
}

impl StageSpec {
    /// Creates an auto-deploying stage.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidArgument`] if the name is empty or
    /// contains characters other than alphanumerics, `-`, and `_`.
    pub fn new(api: &LogicalId, stage_name: impl Into<String>) -> Result<Self, StackError> {
        let stage_name = stage_name.into();
        let valid = !stage_name.is_empty()
            && stage_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StackError::InvalidArgument(format!(
                "invalid stage name: {stage_name:?}"
            )));
        }
        Ok(Self {
            api: api.clone(),
            stage_name,
        })
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Always `true`.
    #[must_use]
    pub const fn auto_deploy(&self) -> bool {
        true
    }

    /// The client-facing URL of this stage: `<ApiEndpoint>/<stage>`.
    #[must_use]
    pub fn url(&self) -> Expr {
        Expr::concat([
            WebSocketApiSpec::endpoint(&self.api),
            Expr::literal(format!("/{}", self.stage_name)),
        ])
    }

    /// Returns every logical id the stage depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&LogicalId> {
        vec![&self.api]
    }

    /// Builds the CloudFormation properties.
    #[must_use]
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "ApiId": Expr::reference(&self.api),
            "StageName": self.stage_name,
            "AutoDeploy": self.auto_deploy(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn id(s: &str) -> LogicalId {
        let Ok(id) = LogicalId::new(s) else {
            panic!("valid logical id");
        };
        id
    }

    #[test]
    fn route_keys_are_fixed() {
        let keys: Vec<&str> = RouteKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["$connect", "$disconnect", "$default"]);
    }

    #[test]
    fn api_serializes() {
        let Ok(value) = serde_json::to_value(WebSocketApiSpec::new("WebsocketApi")) else {
            panic!("serialization failed");
        };
        assert_eq!(
            value,
            json!({
                "Name": "WebsocketApi",
                "ProtocolType": "WEBSOCKET",
                "RouteSelectionExpression": "$request.body.action",
            })
        );
    }

    #[test]
    fn arn_for_execute_api_scopes_connections() {
        let api = id("Api");
        let Ok(arn) = WebSocketApiSpec::arn_for_execute_api(&api, "POST", "/@connections/*", "*")
        else {
            panic!("valid path");
        };
        assert_eq!(arn.references(), vec![&api]);
        assert!(arn.literal_fragments().contains(&"/*/POST/@connections/*"));
        assert!(!arn.is_wildcard());
    }

    #[test]
    fn arn_for_execute_api_rejects_relative_path() {
        let result = WebSocketApiSpec::arn_for_execute_api(&id("Api"), "POST", "@connections", "*");
        assert!(matches!(result, Err(StackError::InvalidArgument(_))));
    }

    #[test]
    fn route_targets_integration() {
        let route = RouteSpec {
            api: id("Api"),
            route_key: RouteKey::Connect,
            integration: id("ConnectIntegration"),
        };
        assert_eq!(
            route.properties(),
            json!({
                "ApiId": {"Ref": "Api"},
                "RouteKey": "$connect",
                "AuthorizationType": "NONE",
                "Target": {"Fn::Join": ["", ["integrations/", {"Ref": "ConnectIntegration"}]]},
            })
        );
    }

    #[test]
    fn integration_uri_points_at_function() {
        let integration = IntegrationSpec::lambda(&id("Api"), &id("Handler"));
        let uri = integration.integration_uri();
        assert_eq!(uri.references(), vec![&id("Handler")]);
        assert_eq!(integration.properties().get("IntegrationType"), Some(&json!("AWS_PROXY")));
    }

    #[test]
    fn permission_source_arn_names_route() {
        let permission = PermissionSpec {
            function: id("Handler"),
            api: id("Api"),
            route_key: RouteKey::Disconnect,
        };
        assert!(
            permission
                .source_arn()
                .literal_fragments()
                .contains(&"/*/*$disconnect")
        );
    }

    #[test]
    fn stage_always_auto_deploys() {
        let Ok(stage) = StageSpec::new(&id("Api"), "dev") else {
            panic!("valid stage");
        };
        assert!(stage.auto_deploy());
        assert_eq!(stage.properties().get("AutoDeploy"), Some(&json!(true)));
        assert_eq!(stage.properties().get("StageName"), Some(&json!("dev")));
    }

    #[test]
    fn stage_name_is_validated() {
        assert!(StageSpec::new(&id("Api"), "").is_err());
        assert!(StageSpec::new(&id("Api"), "prod/v1").is_err());
        assert!(StageSpec::new(&id("Api"), "prod_v1-a").is_ok());
    }
}
