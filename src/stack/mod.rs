//! Stack layer: the descriptor that declares the WebSocket stack.
//!
//! [`WebSocketSampleStack::build`] is a pure function from a deployment
//! context and overrides to an immutable [`StackGraph`]. It performs no
//! I/O; assets are fingerprinted later, in [`crate::assembly`].

pub mod websocket;

pub use websocket::{
    ENDPOINT_VARIABLE, HANDLER_TIMEOUT, MANAGE_CONNECTIONS_ACTION, MODEL_INVOKE_ACTIONS,
    STAGE_URL_OUTPUT, StackGraph, StackHandles, WebSocketSampleStack,
};
