//! kube-typegen CLI
//!
//! Command-line interface for compiling Kubernetes OpenAPI documents and
//! CustomResourceDefinitions into Rust model modules.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use kube_typegen_common::{GeneratorConfig, TypeModel};
use kube_typegen_generator::{ModelGenerator, RustEmitter};
use kube_typegen_parser::{import_openapi, Annotations, CrdParser};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kube-typegen")]
#[command(version, about = "Generate typed models from Kubernetes schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate models from a Kubernetes OpenAPI document
    #[command(after_help = "EXAMPLES:\n  \
        # Every definition of the document\n  \
        kube-typegen api --schema swagger.json -o ./models\n\n  \
        # Only Deployment, Service and what they reference\n  \
        kube-typegen api --schema swagger.json \\\n    \
        --type Deployment --type Service \\\n    \
        --annotations overrides.yaml \\\n    \
        -o ./models")]
    Api {
        /// Path to the OpenAPI JSON/YAML document
        #[arg(short, long)]
        schema: PathBuf,

        /// Types to generate, by short name or full key (default: all)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Annotation overrides file
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Generator configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./models")]
        output: PathBuf,
    },

    /// Generate models from CustomResourceDefinition manifests
    #[command(after_help = "EXAMPLES:\n  \
        # A single manifest\n  \
        kube-typegen crd cert-manager.crds.yaml -o ./src/crds\n\n  \
        # A directory of manifests, referencing k8s types through a crate module\n  \
        kube-typegen crd ./crds/ \\\n    \
        --api-module crate::k8s \\\n    \
        --annotations ./annotations/ \\\n    \
        -o ./src/crds")]
    Crd {
        /// CRD manifest files or directories
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Annotation overrides file or directory
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Module path used for canonical Kubernetes types
        #[arg(long)]
        api_module: Option<String>,

        /// Generator configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Disable structural inference of canonical Kubernetes types
        #[arg(long)]
        no_inference: bool,

        /// Output directory
        #[arg(short, long, default_value = "./models")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        println!("{} Verbose mode enabled", "→".cyan());
    }

    match cli.command {
        Commands::Api {
            schema,
            types,
            annotations,
            config,
            output,
        } => {
            api_command(
                &schema,
                &types,
                annotations.as_deref(),
                config.as_deref(),
                &output,
                cli.verbose,
            )?;
        }
        Commands::Crd {
            sources,
            annotations,
            api_module,
            config,
            no_inference,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(api_module) = api_module {
                config.api_module = api_module;
            }
            if no_inference {
                config.inference.enabled = false;
            }
            crd_command(
                &sources,
                annotations.as_deref(),
                config,
                &output,
                cli.verbose,
            )?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(GeneratorConfig::default()),
    }
}

fn load_annotations(path: Option<&Path>) -> Result<Annotations> {
    match path {
        Some(path) => Annotations::load(path)
            .with_context(|| format!("Failed to load annotations {}", path.display())),
        None => Ok(Annotations::new()),
    }
}

fn api_command(
    schema: &Path,
    types: &[String],
    annotations: Option<&Path>,
    config: Option<&Path>,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Generating models from: {}",
        "→".cyan(),
        schema.display()
    );

    let config = load_config(config)?;
    let annotations = load_annotations(annotations)?;

    if verbose {
        if types.is_empty() {
            println!("  Types: all");
        } else {
            println!("  Types: {}", types.join(", "));
        }
        println!("  Output: {}", output.display());
    }

    println!("{} Parsing schema...", "→".cyan());
    let model = import_openapi(schema, types, annotations)
        .context("Failed to compile OpenAPI definitions")?;

    write_models(&model, &config, output, verbose)
}

fn crd_command(
    sources: &[PathBuf],
    annotations: Option<&Path>,
    config: GeneratorConfig,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Generating models from {} CRD source(s)",
        "→".cyan(),
        sources.len()
    );

    for source in sources {
        if !source.exists() {
            bail!("CRD source does not exist: {}", source.display());
        }
    }

    let annotations = load_annotations(annotations)?;

    if verbose {
        println!("  API module: {}", config.api_module);
        println!(
            "  Inference: {}",
            if config.inference.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("  Output: {}", output.display());
    }

    println!("{} Loading CRDs...", "→".cyan());
    let parser = CrdParser::from_paths(sources).context("Failed to load CRD manifests")?;
    if parser.crds().is_empty() {
        eprintln!("{} No CustomResourceDefinitions found", "⚠".yellow());
    } else {
        println!("{} Loaded {} CRDs", "✓".green(), parser.crds().len());
    }

    let model = parser
        .with_annotations(annotations)
        .with_config(config.clone())
        .parse()
        .context("Failed to compile CRD schemas")?;

    write_models(&model, &config, output, verbose)
}

fn write_models(
    model: &TypeModel,
    config: &GeneratorConfig,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let groups: Vec<_> = model.finalized_groups().collect();
    let total: usize = groups.iter().map(|(_, group)| group.types.len()).sum();
    println!(
        "{} Compiled {} types in {} groups",
        "✓".green(),
        total,
        groups.len()
    );

    if verbose {
        for (key, group) in &groups {
            println!("  • {} ({} types)", key.to_string().cyan(), group.types.len());
        }
    }

    println!("{} Writing modules...", "→".cyan());
    let emitter = RustEmitter::from_config(config).context("Failed to create emitter")?;
    let written = ModelGenerator::new(model, emitter)
        .generate_to_directory(output)
        .context("Failed to generate modules")?;

    println!("\n{}", "✓ Generation complete!".green().bold());
    println!("\n{}", "Generated files:".bold());
    for path in &written {
        println!("  📄 {}", path.display());
    }

    Ok(())
}
