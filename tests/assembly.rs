//! End-to-end synthesis: build the stack, write the assembly, read it back.

#![allow(clippy::panic)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use websocket_sample_stack::assembly::{Artifact, AssemblyManifest, CloudAssembly, SCHEMA_VERSION};
use websocket_sample_stack::config::{StackConfig, StackOverrides};
use websocket_sample_stack::stack::{STAGE_URL_OUTPUT, WebSocketSampleStack};

fn handler_dir(root: &Path) -> PathBuf {
    let dir = root.join("lambda").join("websocket");
    let Ok(()) = fs::create_dir_all(&dir) else {
        panic!("create handler dir");
    };
    let Ok(()) = fs::write(
        dir.join("index.py"),
        "def handler(event, context):\n    return {\"statusCode\": 200}\n",
    ) else {
        panic!("write handler");
    };
    dir
}

fn read_json(path: &Path) -> Value {
    let Ok(text) = fs::read_to_string(path) else {
        panic!("read {}", path.display());
    };
    let Ok(value) = serde_json::from_str(&text) else {
        panic!("parse {}", path.display());
    };
    value
}

fn synthesize(overrides: &StackOverrides) -> CloudAssembly {
    let lookup = |key: &str| match key {
        "CDK_DEFAULT_ACCOUNT" => Some("123456789012".to_string()),
        "CDK_DEFAULT_REGION" => Some("us-west-2".to_string()),
        _ => None,
    };
    let Ok(config) = StackConfig::from_lookup(lookup) else {
        panic!("config loads");
    };
    let Ok(stack) = WebSocketSampleStack::build(&config.context, overrides) else {
        panic!("stack builds");
    };
    let Ok(assembly) = CloudAssembly::synthesize(&stack) else {
        panic!("assembly synthesizes");
    };
    assembly
}

#[test]
fn written_assembly_has_documented_layout() {
    let Ok(workspace) = tempfile::tempdir() else {
        panic!("tempdir");
    };
    let mut overrides = StackOverrides {
        handler_entry: handler_dir(workspace.path()),
        ..StackOverrides::default()
    };
    overrides.tags.insert("project".to_string(), "chat".to_string());
    let assembly = synthesize(&overrides);

    let out = workspace.path().join("cdk.out");
    let Ok(_) = assembly.write_to(&out) else {
        panic!("assembly written");
    };

    let Ok(text) = fs::read_to_string(out.join("manifest.json")) else {
        panic!("manifest present");
    };
    let Ok(manifest) = serde_json::from_str::<AssemblyManifest>(&text) else {
        panic!("manifest parses");
    };
    assert_eq!(manifest.version, SCHEMA_VERSION);
    let Some(Artifact::Stack {
        environment,
        properties,
        ..
    }) = manifest.artifacts.get("WebsocketSampleStack")
    else {
        panic!("stack artifact");
    };
    assert_eq!(environment, "aws://123456789012/us-west-2");
    assert_eq!(properties.tags.get("project").map(String::as_str), Some("chat"));

    let template = read_json(&out.join(&properties.template_file));
    let Some(resources) = template.get("Resources").and_then(Value::as_object) else {
        panic!("template has resources");
    };
    assert_eq!(resources.len(), 15);
    assert!(template.pointer(&format!("/Outputs/{STAGE_URL_OUTPUT}/Value")).is_some());

    let assets = read_json(&out.join("WebsocketSampleStack.assets.json"));
    let Some(files) = assets.get("files").and_then(Value::as_object) else {
        panic!("asset manifest lists files");
    };
    assert_eq!(files.len(), 1);
    let Some((hash, entry)) = files.iter().next() else {
        panic!("one asset");
    };
    assert_eq!(hash.len(), 64);
    assert_eq!(
        entry.pointer("/source/packaging").and_then(Value::as_str),
        Some("zip")
    );
    let key = format!("{hash}.zip");
    assert!(resources.values().any(|resource| {
        resource.pointer("/Properties/Code/S3Key").and_then(Value::as_str) == Some(key.as_str())
    }));
}

#[test]
fn unchanged_code_keeps_its_object_key() {
    let Ok(workspace) = tempfile::tempdir() else {
        panic!("tempdir");
    };
    let overrides = StackOverrides {
        handler_entry: handler_dir(workspace.path()),
        ..StackOverrides::default()
    };
    let first = synthesize(&overrides);
    let second = synthesize(&overrides);
    assert_eq!(first.assets, second.assets);

    let Ok(()) = fs::write(overrides.handler_entry.join("index.py"), "changed") else {
        panic!("rewrite handler");
    };
    let third = synthesize(&overrides);
    let keys = |assembly: &CloudAssembly| assembly.assets.files.keys().cloned().collect::<Vec<_>>();
    assert_ne!(keys(&first), keys(&third));
}
