//! The WebSocket stack: Bedrock-enabled handler behind an API Gateway v2
//! WebSocket API.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{DeploymentContext, StackOverrides};
use crate::domain::{
    Architecture, Expr, FunctionSpec, IntegrationSpec, LogicalId, PermissionSpec, PolicySpec,
    PolicyStatement, Resource, ResourceGraph, RoleSpec, RouteKey, RouteSpec, Runtime, StageSpec,
    WebSocketApiSpec,
};
use crate::error::StackError;

/// Model-serving actions granted to the handler: single-response and
/// streaming-response invocation.
pub const MODEL_INVOKE_ACTIONS: [&str; 2] =
    ["bedrock:InvokeModel", "bedrock:InvokeModelWithResponseStream"];

/// Action that lets the handler push messages to connected clients.
pub const MANAGE_CONNECTIONS_ACTION: &str = "execute-api:ManageConnections";

/// Environment variable carrying the gateway endpoint into the handler.
pub const ENDPOINT_VARIABLE: &str = "WEBSOCKET_ENDPOINT";

/// Per-invocation bound of the deployed handler.
pub const HANDLER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Module containing the handler entry point.
pub const HANDLER_MODULE: &str = "index";
/// Entry point exposed by the handler module.
pub const HANDLER_ENTRY_POINT: &str = "handler";

/// Name of the stack output holding the client-facing URL.
pub const STAGE_URL_OUTPUT: &str = "WebSocketStageUrl";

const HANDLER_ID: &str = "WebSocketHandler";
const API_ID: &str = "WebsocketApi";
const STAGE_ID: &str = "WebSocketStage";

/// Logical ids of the resources the descriptor declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHandles {
    /// Handler execution role.
    pub role: LogicalId,
    /// Bedrock invoke policy.
    pub model_policy: LogicalId,
    /// The handler function.
    pub function: LogicalId,
    /// The WebSocket API.
    pub api: LogicalId,
    /// Integration per route key.
    pub integrations: BTreeMap<RouteKey, LogicalId>,
    /// Route per route key.
    pub routes: BTreeMap<RouteKey, LogicalId>,
    /// Invoke permission per route key.
    pub permissions: BTreeMap<RouteKey, LogicalId>,
    /// The auto-deploying stage.
    pub stage: LogicalId,
    /// Connection-management policy.
    pub connections_policy: LogicalId,
}

/// The synthesized stack: identity, deployment target, tags, and the
/// resource graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackGraph {
    /// Stack name.
    pub name: String,
    /// Deployment target, passed through unmodified.
    pub context: DeploymentContext,
    /// Stack tags, passed through unmodified.
    pub tags: BTreeMap<String, String>,
    /// Declared resources and outputs.
    pub resources: ResourceGraph,
    /// Ids of the well-known resources.
    pub handles: StackHandles,
}

/// Descriptor of the WebSocket stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketSampleStack;

impl WebSocketSampleStack {
    /// Builds the stack's resource graph.
    ///
    /// Resources are declared so that every reference points backwards:
    /// the handler is declared before the gateway (the integrations need
    /// it), and the gateway endpoint is injected into the handler's
    /// environment only once the gateway exists. The connection-management
    /// policy is declared last for the same reason.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] for an invalid stack name and
    /// [`StackError::InvalidArgument`] for an invalid stage name. Graph
    /// errors cannot occur for valid input but are propagated rather than
    /// hidden.
    pub fn build(
        context: &DeploymentContext,
        overrides: &StackOverrides,
    ) -> Result<StackGraph, StackError> {
        validate_stack_name(&overrides.stack_name)?;
        let mut graph = ResourceGraph::new();

        let role = graph.declare(
            &[HANDLER_ID, "ServiceRole", "Resource"],
            Resource::Role(RoleSpec::lambda_execution()),
        )?;

        let model_policy_path = [HANDLER_ID, "ServiceRole", "ModelInvokePolicy", "Resource"];
        let model_policy = graph.declare(
            &model_policy_path,
            Resource::Policy(PolicySpec::for_role(
                policy_name(&model_policy_path)?,
                &role,
                model_invoke_statement(),
            )),
        )?;

        let handler = FunctionSpec::new(
            Runtime::Python312,
            Architecture::Arm64,
            overrides.handler_entry.clone(),
            HANDLER_MODULE,
            HANDLER_ENTRY_POINT,
            &role,
        )
        .with_timeout(HANDLER_TIMEOUT)?;
        let function = graph.declare(&[HANDLER_ID, "Resource"], Resource::Function(handler))?;
        graph.add_dependency(&function, &role)?;
        graph.add_dependency(&function, &model_policy)?;

        let api = graph.declare(
            &[API_ID, "Resource"],
            Resource::WebSocketApi(WebSocketApiSpec::new(API_ID)),
        )?;

        let mut integrations = BTreeMap::new();
        let mut routes = BTreeMap::new();
        let mut permissions = BTreeMap::new();
        for route_key in RouteKey::ALL {
            let route_scope = format!("{route_key}-Route");
            let integration_scope = format!("{}Integration", route_key.construct_name());

            let integration = graph.declare(
                &[API_ID, route_scope.as_str(), integration_scope.as_str(), "Resource"],
                Resource::Integration(IntegrationSpec::lambda(&api, &function)),
            )?;
            let permission = graph.declare(
                &[
                    API_ID,
                    route_scope.as_str(),
                    format!("{integration_scope}-Permission").as_str(),
                ],
                Resource::Permission(PermissionSpec {
                    function: function.clone(),
                    api: api.clone(),
                    route_key,
                }),
            )?;
            let route = graph.declare(
                &[API_ID, route_scope.as_str(), "Resource"],
                Resource::Route(RouteSpec {
                    api: api.clone(),
                    route_key,
                    integration: integration.clone(),
                }),
            )?;

            integrations.insert(route_key, integration);
            permissions.insert(route_key, permission);
            routes.insert(route_key, route);
        }

        let stage_spec = StageSpec::new(&api, overrides.stage_name.as_str())?;
        let stage_url = stage_spec.url();
        let stage = graph.declare(&[STAGE_ID, "Resource"], Resource::Stage(stage_spec))?;

        graph.add_environment(&function, ENDPOINT_VARIABLE, WebSocketApiSpec::endpoint(&api))?;

        let connections_policy_path = [
            HANDLER_ID,
            "ServiceRole",
            "ManageConnectionsPolicy",
            "Resource",
        ];
        let connections_policy = graph.declare(
            &connections_policy_path,
            Resource::Policy(PolicySpec::for_role(
                policy_name(&connections_policy_path)?,
                &role,
                PolicyStatement::allow(
                    [MANAGE_CONNECTIONS_ACTION],
                    [WebSocketApiSpec::arn_for_execute_api(
                        &api,
                        "POST",
                        "/@connections/*",
                        "*",
                    )?],
                ),
            )),
        )?;
        graph.add_dependency(&function, &connections_policy)?;

        graph.add_output(
            STAGE_URL_OUTPUT,
            "WebSocket URL clients connect to",
            stage_url,
        )?;

        // Same check the provisioning engine runs before creating anything.
        let creation_order = graph.dependency_order()?.len();

        tracing::info!(
            stack = %overrides.stack_name,
            environment = %context,
            stage = %overrides.stage_name,
            resources = creation_order,
            "stack graph built"
        );

        Ok(StackGraph {
            name: overrides.stack_name.clone(),
            context: context.clone(),
            tags: overrides.tags.clone(),
            resources: graph,
            handles: StackHandles {
                role,
                model_policy,
                function,
                api,
                integrations,
                routes,
                permissions,
                stage,
                connections_policy,
            },
        })
    }
}

/// The Bedrock grant. Unscoped (`*`): any model the account can reach.
fn model_invoke_statement() -> PolicyStatement {
    PolicyStatement::allow(MODEL_INVOKE_ACTIONS, [Expr::literal("*")])
}

/// Policies are named after their own logical id.
fn policy_name(path: &[&str]) -> Result<String, StackError> {
    LogicalId::from_path(path).map(String::from)
}

/// Stack names: a letter followed by alphanumerics and hyphens, at most
/// 128 characters.
fn validate_stack_name(name: &str) -> Result<(), StackError> {
    let valid = name.len() <= 128
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StackError::InvalidConfig(format!("invalid stack name: {name:?}")))
    }
}
