//! Properties every build of the WebSocket stack must satisfy.

#![allow(clippy::panic)]

use std::collections::BTreeSet;
use std::path::PathBuf;

use websocket_sample_stack::assembly::{AssetSet, FileAsset, Packaging, Template};
use websocket_sample_stack::config::{DeploymentContext, StackOverrides};
use websocket_sample_stack::domain::{Expr, LogicalId, ResourceKind, RouteKey};
use websocket_sample_stack::stack::{
    ENDPOINT_VARIABLE, MANAGE_CONNECTIONS_ACTION, MODEL_INVOKE_ACTIONS, StackGraph,
    WebSocketSampleStack,
};

fn build_with(context: &DeploymentContext, overrides: &StackOverrides) -> StackGraph {
    let Ok(stack) = WebSocketSampleStack::build(context, overrides) else {
        panic!("stack must build for {overrides:?}");
    };
    stack
}

fn build() -> StackGraph {
    build_with(&DeploymentContext::default(), &StackOverrides::default())
}

#[test]
fn declares_one_of_each_core_resource() {
    let stack = build();
    let graph = &stack.resources;
    assert_eq!(graph.count_of(ResourceKind::Function), 1);
    assert_eq!(graph.count_of(ResourceKind::WebSocketApi), 1);
    assert_eq!(graph.count_of(ResourceKind::Stage), 1);
    assert_eq!(graph.count_of(ResourceKind::Policy), 2);
}

#[test]
fn routes_use_distinct_integrations_to_one_function() {
    let stack = build();
    let graph = &stack.resources;

    let mut integrations = BTreeSet::new();
    for key in RouteKey::ALL {
        let Some(route) = stack
            .handles
            .routes
            .get(&key)
            .and_then(|id| graph.get(id))
            .and_then(|r| r.as_route())
        else {
            panic!("route {key} declared");
        };
        assert_eq!(route.route_key, key);
        let Some(integration) = graph.get(&route.integration).and_then(|r| r.as_integration())
        else {
            panic!("integration for {key} declared");
        };
        assert_eq!(integration.function, stack.handles.function);
        assert_eq!(integration.api, stack.handles.api);
        integrations.insert(route.integration.clone());
    }
    assert_eq!(integrations.len(), 3);
    assert_eq!(graph.count_of(ResourceKind::Route), 3);
}

#[test]
fn endpoint_variable_points_at_gateway() {
    let stack = build();
    let graph = &stack.resources;
    let Some(function) = graph.get(&stack.handles.function).and_then(|r| r.as_function()) else {
        panic!("function declared");
    };
    assert_eq!(
        function.environment.get(ENDPOINT_VARIABLE),
        Some(&Expr::GetAtt {
            id: stack.handles.api.clone(),
            attribute: "ApiEndpoint".to_string(),
        })
    );

    let Ok(order) = graph.dependency_order() else {
        panic!("graph must be acyclic");
    };
    let position = |id: &LogicalId| order.iter().position(|candidate| *candidate == id);
    let (Some(api), Some(function)) = (
        position(&stack.handles.api),
        position(&stack.handles.function),
    ) else {
        panic!("both ordered");
    };
    assert!(api < function);
}

#[test]
fn model_policy_grants_exactly_the_invoke_actions() {
    let stack = build();
    let Some(policy) = stack
        .resources
        .get(&stack.handles.model_policy)
        .and_then(|r| r.as_policy())
    else {
        panic!("model policy declared");
    };
    let actions: BTreeSet<&str> = policy.actions().into_iter().collect();
    let expected: BTreeSet<&str> = MODEL_INVOKE_ACTIONS.into_iter().collect();
    assert_eq!(actions, expected);
    assert_eq!(policy.resources(), vec![&Expr::literal("*")]);
    assert_eq!(policy.roles, vec![stack.handles.role.clone()]);
}

#[test]
fn connections_policy_is_scoped_to_the_gateway() {
    let stack = build();
    let Some(policy) = stack
        .resources
        .get(&stack.handles.connections_policy)
        .and_then(|r| r.as_policy())
    else {
        panic!("connections policy declared");
    };
    assert_eq!(policy.actions(), vec![MANAGE_CONNECTIONS_ACTION]);

    let resources = policy.resources();
    let [resource] = resources.as_slice() else {
        panic!("exactly one resource pattern");
    };
    assert!(!resource.is_wildcard());
    assert!(resource.references().contains(&&stack.handles.api));
    assert!(
        resource
            .literal_fragments()
            .iter()
            .any(|fragment| fragment.contains("/@connections/"))
    );
}

#[test]
fn builds_are_deterministic() {
    let first = build();
    let second = build();
    assert_eq!(first, second);

    let mut assets = AssetSet::default();
    assets.insert(
        StackOverrides::default().handler_entry,
        FileAsset {
            hash: "00ff".to_string(),
            source: PathBuf::from("/src/lambda/websocket"),
            packaging: Packaging::Zip,
        },
    );
    let (Ok(a), Ok(b)) = (
        Template::render(&first, &assets).and_then(|t| t.to_json_pretty()),
        Template::render(&second, &assets).and_then(|t| t.to_json_pretty()),
    ) else {
        panic!("templates render");
    };
    assert_eq!(a, b);
}

#[test]
fn stage_always_auto_deploys() {
    let contexts = [
        DeploymentContext::default(),
        DeploymentContext::new("123456789012", "eu-west-1"),
    ];
    let stages = ["dev", "prod", "feature_x-2"];
    for context in &contexts {
        for stage in stages {
            let overrides = StackOverrides {
                stage_name: stage.to_string(),
                stack_name: "Other-Stack".to_string(),
                ..StackOverrides::default()
            };
            let stack = build_with(context, &overrides);
            let Some(spec) = stack
                .resources
                .get(&stack.handles.stage)
                .and_then(|r| r.as_stage())
            else {
                panic!("stage declared");
            };
            assert!(spec.auto_deploy());
            assert_eq!(spec.stage_name(), stage);
        }
    }
}

#[test]
fn permissions_cover_each_route() {
    let stack = build();
    assert_eq!(stack.resources.count_of(ResourceKind::Permission), 3);
    let keys: Vec<RouteKey> = stack.handles.permissions.keys().copied().collect();
    assert_eq!(keys, RouteKey::ALL.to_vec());
}
