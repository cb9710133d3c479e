//! Domain layer: typed resource model and the resource graph.
//!
//! This module contains the provisioning-time model: logical identity,
//! deferred attribute expressions, the individual resource specs (IAM,
//! Lambda, API Gateway v2), and the graph that ties them together and
//! enforces declare-before-reference ordering.

pub mod expr;
pub mod function;
pub mod gateway;
pub mod graph;
pub mod logical_id;
pub mod policy;
pub mod resource;

pub use expr::{Expr, Pseudo};
pub use function::{Architecture, FunctionCode, FunctionSpec, Runtime, S3Location};
pub use gateway::{
    IntegrationSpec, PermissionSpec, RouteKey, RouteSpec, StageSpec, WebSocketApiSpec,
};
pub use graph::{Output, ResourceEntry, ResourceGraph};
pub use logical_id::LogicalId;
pub use policy::{Effect, PolicyDocument, PolicySpec, PolicyStatement, RoleSpec};
pub use resource::{Resource, ResourceKind};
