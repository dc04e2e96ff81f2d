mod config;
mod mcp;
mod sandbox;
mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::mcp::SandboxServer;
use crate::sandbox::{Executor, SandboxExec, SandboxRunner};
use crate::tools::{BashSandboxedTool, ToolRegistry};

/// Config file picked up when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

fn print_help() {
    println!(
        "\
sandbox-mcp v{}

An MCP server that runs shell commands under macOS sandbox-exec profiles.
Speaks JSON-RPC over stdin/stdout; logs go to stderr.

USAGE:
    sandbox-mcp [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file
                   [default: {DEFAULT_CONFIG_PATH}, built-in defaults if absent]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG    Log level filter for tracing
                (e.g. debug, sandbox_mcp=debug,warn)

PROFILES:
    {}

EXAMPLES:
    sandbox-mcp                              # defaults
    sandbox-mcp /etc/sandbox-mcp.toml        # custom config path
    RUST_LOG=debug sandbox-mcp               # with debug logging",
        env!("CARGO_PKG_VERSION"),
        sandbox::profiles::names().collect::<Vec<_>>().join(", "),
    );
}

fn load_config(path: Option<String>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {path}");
            Config::load(&path).with_context(|| format!("loading {path}"))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from {DEFAULT_CONFIG_PATH}");
            Config::load(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("loading {DEFAULT_CONFIG_PATH}"))
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("sandbox-mcp v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sandbox_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = load_config(std::env::args().nth(1))?;

    let executor = SandboxExec::new(&config.sandbox);
    info!("Sandbox: {}", executor.executable().display());
    info!(
        "Defaults: profile={}, timeout={}s",
        config.sandbox.default_profile, config.sandbox.default_timeout_secs
    );
    if let Some(ref dir) = config.sandbox.scratch_dir {
        info!("Scratch dir: {}", dir.display());
    }
    // Requests still fail individually; this is only a heads-up.
    if let Err(e) = executor.check_platform() {
        warn!("{e}");
    }

    let runner = SandboxRunner::new(Arc::new(executor), config.sandbox.scratch_dir.clone());
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(BashSandboxedTool::new(runner, &config.sandbox)));
    info!("Tools: {} registered", tools.len());

    let server = SandboxServer::new(
        config.server.name.clone(),
        env!("CARGO_PKG_VERSION"),
        tools,
    );

    info!("Serving MCP on stdio");
    let service = rmcp::service::serve_server(server, rmcp::transport::stdio())
        .await
        .context("MCP handshake failed")?;

    // Ctrl-C ends the session; rmcp then cancels every in-flight call.
    let shutdown = service.cancellation_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, closing session");
                shutdown.cancel();
            }
            Err(e) => warn!("Cannot listen for shutdown signal: {e}"),
        }
    });

    let reason = service.waiting().await.context("MCP service task failed")?;
    info!("Session ended: {reason:?}");

    info!("Bye");
    Ok(())
}
