use anyhow::{Context, Result};
use blueprint_deploy::resources::ResourceManagerRegistry;
use blueprint_deploy::store::InMemoryBlueprintStore;
use blueprint_deploy::template::FileSystemResourceLoader;
use blueprint_deploy::{BlueprintEngine, EngineConfig};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "blueprint-deploy")]
#[command(about = "Render, validate and plan blueprint packages offline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct BlueprintDeployCli {
    /// Engine configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the rendered index template as JSON
    Render {
        /// Blueprint package directory
        dir: PathBuf,

        /// Variables document (YAML or JSON)
        #[arg(long)]
        variables: Option<PathBuf>,
    },

    /// Print the variables JSON schema
    Schema {
        /// Blueprint package directory
        dir: PathBuf,
    },

    /// Validate a variables document against the package schema
    Validate {
        /// Blueprint package directory
        dir: PathBuf,

        /// Variables document (YAML or JSON)
        #[arg(long)]
        variables: PathBuf,
    },

    /// Print the evaluation order of executable nodes
    Plan {
        /// Blueprint package directory
        dir: PathBuf,

        /// Variables document (YAML or JSON)
        #[arg(long)]
        variables: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = BlueprintDeployCli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting blueprint-deploy v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = BlueprintEngine::new(
        config,
        ResourceManagerRegistry::with_core_managers(),
        Arc::new(InMemoryBlueprintStore::new()),
    );

    match cli.command {
        Command::Render { dir, variables } => {
            let loader = FileSystemResourceLoader::new(dir);
            let variables = load_variables(variables.as_deref())?;
            let rendered = engine.render_index(&loader, variables)?;
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Command::Schema { dir } => {
            let loader = FileSystemResourceLoader::new(dir);
            match engine.get_variable_json_schema(&loader)? {
                Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
                None => info!("Blueprint package has no variables schema"),
            }
        }
        Command::Validate { dir, variables } => {
            let loader = FileSystemResourceLoader::new(dir);
            let variables = load_variables(Some(&variables))?;
            engine.validate_variables(&loader, &variables)?;
            println!("Variables are valid");
        }
        Command::Plan { dir, variables } => {
            let loader = FileSystemResourceLoader::new(dir);
            let variables = load_variables(variables.as_deref())?;
            let plan = engine.plan(&loader, variables)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}

fn load_variables(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read variables from {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse variables in {}", path.display()))
}
