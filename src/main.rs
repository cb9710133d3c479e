//! websocket-sample-stack synthesizer entry point.
//!
//! Builds the stack graph and writes the cloud assembly.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use websocket_sample_stack::assembly::CloudAssembly;
use websocket_sample_stack::config::{self, StackConfig};
use websocket_sample_stack::stack::WebSocketSampleStack;

/// Synthesize the WebSocket sample stack into a cloud assembly.
///
/// Flags override the corresponding environment variables.
#[derive(Debug, Parser)]
#[command(name = "websocket-sample-stack", version)]
struct Cli {
    /// Output directory [env: CDK_OUTDIR]
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Stack name [env: STACK_NAME]
    #[arg(long, value_name = "NAME")]
    stack_name: Option<String>,

    /// Stage name [env: STAGE_NAME]
    #[arg(long, value_name = "NAME")]
    stage: Option<String>,

    /// Handler code directory [env: HANDLER_ENTRY]
    #[arg(long, value_name = "DIR")]
    entry: Option<PathBuf>,

    /// Stack tag, repeatable; merged over STACK_TAGS
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag_arg)]
    tags: Vec<(String, String)>,

    /// Also print the template to stdout
    #[arg(long)]
    print: bool,
}

fn parse_tag_arg(raw: &str) -> Result<(String, String), String> {
    config::parse_tag(raw).map_err(|e| e.to_string())
}

impl Cli {
    fn apply(self, config: &mut StackConfig) {
        if let Some(out) = self.out {
            config.output_dir = out;
        }
        if let Some(name) = self.stack_name {
            config.overrides.stack_name = name;
        }
        if let Some(stage) = self.stage {
            config.overrides.stage_name = stage;
        }
        if let Some(entry) = self.entry {
            config.overrides.handler_entry = entry;
        }
        config.overrides.tags.extend(self.tags);
    }
}

/// Logs go to stderr so `--print` output stays clean. `LOG_FORMAT=json`
/// switches to JSON lines. Expects `.env` to be loaded already.
fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    if json_logs_requested() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn json_logs_requested() -> bool {
    std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let print = cli.print;

    let mut config = StackConfig::from_env().context("loading configuration")?;
    cli.apply(&mut config);
    tracing::info!(
        stack = %config.overrides.stack_name,
        environment = %config.context,
        out = %config.output_dir.display(),
        "synthesizing"
    );

    let stack = WebSocketSampleStack::build(&config.context, &config.overrides)
        .context("building stack graph")?;
    let assembly = CloudAssembly::synthesize(&stack).context("synthesizing cloud assembly")?;
    assembly
        .write_to(&config.output_dir)
        .with_context(|| format!("writing assembly to {}", config.output_dir.display()))?;

    if print {
        let template = assembly.template.to_json_pretty()?;
        println!("{template}");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn env_file_selects_log_format() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let env_file = dir.path().join(".env");
        let Ok(()) = fs::write(&env_file, "LOG_FORMAT=json\n") else {
            panic!("write .env");
        };
        let Ok(()) = dotenvy::from_path_override(&env_file) else {
            panic!("load .env");
        };
        assert!(json_logs_requested());
    }
}
