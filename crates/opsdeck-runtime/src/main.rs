//! OpsDeck Runtime - host for server-declared extensions and menus
//!
//! Wires the extension crates together the way the dashboard shell does at
//! sign-in: the extension loader runs once (only for an authenticated
//! session) while the navigation tree is composed from the function
//! descriptor catalog.
//!
//! # Startup
//!
//! 1. **Parse arguments** - `--config`, `--nav`, `--token`, `--render`, `--print-renderers`
//! 2. **Read opsdeck.toml** - server, plugin and menu settings (all optional)
//! 3. **Build services** - renderer registry, extension loader, descriptor catalog
//! 4. **Load + compose** - run concurrently, neither can fail the host
//! 5. **Output** - merged navigation JSON, renderer names, or a rendered view
//!
//! # Environment Variables
//!
//! - `OPSDECK_LOG` - Log level (default: "info")
//! - `OPSDECK_TOKEN` - Access token when `--token` is not given

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use ext_api::{CredentialSource, StaticCredentials};
use ext_menu::{compose_navigation, NavNode};
use serde_json::Value;

mod manifest;
mod services;

use manifest::Manifest;
use services::Services;

const DEFAULT_MANIFEST: &str = "opsdeck.toml";
const USAGE: &str = "Usage: opsdeck-runtime [--config <file>] [--nav <file>] [--token <token>] \
                     [--render <renderer> <data.json>] [--print-renderers]";

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    nav: Option<PathBuf>,
    token: Option<String>,
    render: Option<(String, PathBuf)>,
    print_renderers: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(a) = args.next() {
            match a.as_str() {
                "--config" => {
                    parsed.config = Some(PathBuf::from(required(&mut args, "--config")?));
                }
                "--nav" => {
                    parsed.nav = Some(PathBuf::from(required(&mut args, "--nav")?));
                }
                "--token" => {
                    parsed.token = Some(required(&mut args, "--token")?);
                }
                "--render" => {
                    let name = required(&mut args, "--render")?;
                    let file = required(&mut args, "--render")?;
                    parsed.render = Some((name, PathBuf::from(file)));
                }
                "--print-renderers" => {
                    parsed.print_renderers = true;
                }
                "-h" | "--help" => bail!(USAGE),
                other => {
                    tracing::warn!("ignoring unknown argument {other:?}");
                }
            }
        }
        Ok(parsed)
    }
}

fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    match args.next() {
        Some(value) => Ok(value),
        None => bail!("{flag} requires a value\n{USAGE}"),
    }
}

/// Static tree used when no navigation file is configured
fn default_navigation() -> Vec<NavNode> {
    vec![
        NavNode::new("Home", "/"),
        NavNode::new("Functions", "/functions"),
    ]
}

async fn read_navigation(path: &Path) -> Result<Vec<NavNode>> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading navigation tree at {}", path.display()))?;
    NavNode::parse_tree(&source)
        .with_context(|| format!("parsing navigation tree at {}", path.display()))
}

async fn load_extensions(services: &Services, authenticated: bool) {
    if !services.plugins_enabled {
        tracing::info!("extension loading disabled");
        return;
    }
    if !authenticated {
        tracing::info!("no access token, skipping extension loading");
        return;
    }
    services.loader.trigger_load().await;
}

async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
    let manifest = Manifest::load(&manifest_path, args.config.is_some()).await?;

    let token = args
        .token
        .clone()
        .or_else(|| env::var("OPSDECK_TOKEN").ok());
    let credentials = StaticCredentials::new(token);
    let authenticated = credentials.access_token().is_some();
    let services = Services::build(&manifest, Arc::new(credentials))?;

    let nav_path = args
        .nav
        .clone()
        .or_else(|| manifest.menu.nav_file.as_ref().map(PathBuf::from));
    let tree = match nav_path {
        Some(path) => read_navigation(&path).await?,
        None => default_navigation(),
    };

    tracing::info!(
        "Starting opsdeck against {} ({} static nodes)",
        manifest.server.base_url(),
        ext_menu::count_nodes(&tree)
    );

    let (_, navigation) = tokio::join!(
        load_extensions(&services, authenticated),
        compose_navigation(services.descriptors.as_ref(), &tree, &services.layout),
    );

    if args.print_renderers {
        for name in services.registry.list_names() {
            println!("{name}");
        }
    }

    if let Some((name, file)) = &args.render {
        let source = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("reading render data at {}", file.display()))?;
        let data: Value = serde_json::from_str(&source).context("parsing render data")?;
        let Some(view) = services.registry.render(name, &data, None) else {
            bail!(
                "no renderer named {name:?} (available: {})",
                services.registry.list_names().join(", ")
            );
        };
        println!("{view}");
        return Ok(());
    }

    if !args.print_renderers {
        println!("{}", serde_json::to_string_pretty(&navigation)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing with env-filter support
    // Use OPSDECK_LOG env var for log level configuration, default to "info"
    use tracing_subscriber::EnvFilter;
    let filter =
        EnvFilter::try_from_env("OPSDECK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = CliArgs::parse(env::args().skip(1))?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;
    rt.block_on(run(args))
}
