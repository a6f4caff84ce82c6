//! API Group Registry CLI
//!
//! Installs the built-in API groups and inspects the resulting registry.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use apigroup_registry::config::OutputFormat;
use apigroup_registry::groups::image;
use apigroup_registry::{
    FrameworkConfig, FrameworkContext, GroupVersion, InstallOutcome, ObjectConvertor,
};

#[derive(Parser)]
#[command(name = "apigroup-registry")]
#[command(about = "Register API groups and inspect versions, interfaces and REST mappings")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the allowed versions (comma separated)
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the built-in groups and print the registry summary
    Install,

    /// Resolve the interfaces a group uses for a version
    Interfaces {
        /// Version to resolve (e.g. "v1" or "image.openshift.io/v1")
        version: String,
        /// Group to ask (defaults to the version's group)
        #[arg(short, long)]
        group: Option<String>,
    },

    /// List the REST resources of every installed group
    Mappings,

    /// Convert a JSON object to another version
    Convert {
        /// File holding the object
        #[arg(short, long)]
        file: PathBuf,
        /// Target version
        #[arg(short, long)]
        to: String,
    },

    /// List the group/version/kinds a type path is registered under
    Kinds {
        /// Type path (e.g. "apis::image::v1::ImageStream")
        type_path: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "apigroups.toml")]
        path: String,
    },
}

#[derive(Serialize)]
struct GroupSummary {
    group: String,
    preferred: String,
    versions: Vec<String>,
}

#[derive(Serialize)]
struct RegistrySummary {
    outcome: String,
    enabled_versions: Vec<String>,
    preferred_group_versions: String,
    groups: Vec<GroupSummary>,
}

fn main() {
    let cli = Cli::parse();

    let config = match FrameworkConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Build a context and install every built-in group into it
fn bootstrap(config: &FrameworkConfig) -> anyhow::Result<(FrameworkContext, InstallOutcome)> {
    let allowed = config
        .allowed_versions()
        .context("invalid allowed version")?;
    let ctx = FrameworkContext::new(allowed);

    let outcome = image::install(&ctx).context("installing the image API group")?;

    for version in ctx.registry().unregistered_allowed_versions() {
        warn!("Allowed version {} is not provided by any installed group", version);
    }

    Ok((ctx, outcome))
}

fn run(cli: Cli, mut config: FrameworkConfig) -> anyhow::Result<()> {
    if let Some(allow) = cli.allow {
        config.registry.allowed_versions = allow;
    }
    let format = config.output.format;

    match cli.command {
        Commands::Install => {
            let (ctx, outcome) = bootstrap(&config)?;
            let registry = ctx.registry();

            let groups = registry
                .registered_group_versions()
                .iter()
                .filter_map(|gv| registry.group(&gv.group))
                .map(|meta| GroupSummary {
                    group: meta.group().to_string(),
                    preferred: meta.group_version.to_string(),
                    versions: meta.group_versions.iter().map(|v| v.to_string()).collect(),
                })
                .collect();

            let summary = RegistrySummary {
                outcome: match outcome {
                    InstallOutcome::Installed { .. } => "installed".to_string(),
                    InstallOutcome::Skipped => "skipped".to_string(),
                },
                enabled_versions: registry.enabled_versions().iter().map(|v| v.to_string()).collect(),
                preferred_group_versions: registry.all_preferred_group_versions(),
                groups,
            };
            print_json(&summary, format)
        }

        Commands::Interfaces { version, group } => {
            let (ctx, _) = bootstrap(&config)?;
            let version = GroupVersion::parse(&version)?;
            let group = group.unwrap_or_else(|| version.group.clone());
            let meta = ctx
                .registry()
                .group(&group)
                .ok_or_else(|| anyhow!("group {:?} is not installed", group))?;

            meta.interfaces_for(&version)?;
            println!("✅ {} serves version {}", display_group(&group), version);
            Ok(())
        }

        Commands::Mappings => {
            let (ctx, _) = bootstrap(&config)?;
            let registry = ctx.registry();
            let entries: Vec<_> = registry
                .registered_group_versions()
                .iter()
                .filter_map(|gv| registry.group(&gv.group))
                .flat_map(|meta| meta.rest_mapper.resource_entries())
                .collect();
            print_json(&entries, format)
        }

        Commands::Convert { file, to } => {
            let (ctx, _) = bootstrap(&config)?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let obj: serde_json::Value = serde_json::from_str(&content)?;
            let target = GroupVersion::parse(&to)?;
            let known = ctx.scheme().versions_for_group(&target.group);
            if !known.contains(&target) {
                let known: Vec<String> = known.iter().map(|v| v.to_string()).collect();
                return Err(anyhow!(
                    "unknown target version {} (known: [{}])",
                    target,
                    known.join(", ")
                ));
            }
            let converted = ctx.scheme().convert_to_version(&obj, &target)?;
            print_json(&converted, format)
        }

        Commands::Kinds { type_path } => {
            let (ctx, _) = bootstrap(&config)?;
            let kinds: Vec<String> = ctx
                .scheme()
                .object_kinds(&type_path)
                .iter()
                .map(|gvk| gvk.to_string())
                .collect();
            if kinds.is_empty() {
                return Err(anyhow!("type {} is not registered", type_path));
            }
            print_json(&kinds, format)
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigCommands::Init { path } => {
                FrameworkConfig::default().save(&path)?;
                println!("✅ Configuration written to {}", path);
                Ok(())
            }
        },
    }
}

fn display_group(group: &str) -> &str {
    if group.is_empty() {
        "legacy group"
    } else {
        group
    }
}
