//! # websocket-sample-stack
//!
//! Infrastructure definition for a WebSocket API backed by a single
//! Bedrock-enabled Lambda handler.
//!
//! This crate declares the stack as a typed resource graph and synthesizes
//! it into a cloud assembly (CloudFormation template plus manifests). It
//! never talks to AWS; deployment is left to the provisioning engine that
//! consumes the assembly.
//!
//! ## Architecture
//!
//! ```text
//! Environment / .env / CLI flags
//!     │
//!     ├── StackConfig (config)
//!     │
//!     ├── WebSocketSampleStack::build (stack/)
//!     │       └── ResourceGraph, Expr, LogicalId (domain/)
//!     │
//!     ├── CloudAssembly::synthesize (assembly/)
//!     │       ├── AssetSet (SHA-256 fingerprints)
//!     │       └── Template (CloudFormation JSON)
//!     │
//!     └── cdk.out/
//!             manifest.json, <Stack>.template.json, <Stack>.assets.json
//! ```

pub mod assembly;
pub mod config;
pub mod domain;
pub mod error;
pub mod stack;
