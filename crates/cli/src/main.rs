//! OpenAPI Provider CLI
//!
//! Command-line host for providers assembled at runtime from OpenAPI
//! documents.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use openapi_provider_common::ProviderConfig;
use openapi_provider_engine::{PlanResult, Provider, ResourceProvider};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-provider")]
#[command(version, about = "Manage REST resources described by an OpenAPI document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ProviderArgs {
    /// Provider configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OpenAPI document URL or path
    #[arg(short, long, global = true, env = "OPENAPI_PROVIDER_SPEC")]
    spec: Option<String>,

    /// Base URL of the API, overriding the document's servers
    #[arg(long, global = true, env = "OPENAPI_PROVIDER_BASE_URL")]
    base_url: Option<String>,

    /// API key sent with every request
    #[arg(long, global = true, env = "OPENAPI_PROVIDER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider name, used as the resource type prefix
    #[arg(long, global = true)]
    provider_name: Option<String>,

    /// Extra header sent with every request (NAME=VALUE)
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the resource types the document exposes
    #[command(after_help = "EXAMPLES:\n  \
        openapi-provider resources --spec https://api.example.com/swagger.json")]
    Resources,

    /// Print the schema of one or all resource types as JSON
    Schema {
        /// Resource type, e.g. openapi_cdns
        resource_type: Option<String>,
    },

    /// Create a resource
    #[command(after_help = "EXAMPLES:\n  \
        openapi-provider create openapi_cdns \\\n    \
        --data '{\"label\": \"x\", \"ips\": [\"1.1.1.1\"], \"hostnames\": [\"a.com\"]}'\n\n  \
        # Read the desired state from a file\n  \
        openapi-provider create openapi_cdns --data @cdn.json")]
    Create {
        resource_type: String,

        /// Desired state as JSON, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Read a resource by identifier
    Read {
        resource_type: String,

        #[arg(long)]
        id: String,
    },

    /// Show the changes an update would make
    Plan {
        resource_type: String,

        #[arg(long)]
        id: String,

        /// Desired state as JSON, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Update a resource in place
    Update {
        resource_type: String,

        #[arg(long)]
        id: String,

        /// Desired state as JSON, or @path to a JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Delete a resource
    Delete {
        resource_type: String,

        #[arg(long)]
        id: String,
    },

    /// Adopt an existing resource and print its state
    Import {
        resource_type: String,

        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli.provider)?;
    let provider = Provider::build(&config).with_context(|| {
        format!(
            "Failed to assemble provider from {}",
            config.spec.as_deref().unwrap_or("<no spec>")
        )
    })?;

    match cli.command {
        Commands::Resources => resources_command(&provider),
        Commands::Schema { resource_type } => schema_command(&provider, resource_type.as_deref()),
        Commands::Create {
            resource_type,
            data,
        } => {
            let planned = parse_data(&data)?;
            let state = provider
                .create(&resource_type, planned)
                .with_context(|| format!("Failed to create {}", resource_type))?;
            eprintln!("{} Created {}", "✓".green(), resource_type.cyan());
            print_json(&state)
        }
        Commands::Read { resource_type, id } => {
            let state = identifier_state(&provider, &resource_type, &id)?;
            match provider
                .read(&resource_type, state)
                .with_context(|| format!("Failed to read {} '{}'", resource_type, id))?
            {
                Some(state) => print_json(&state),
                None => bail!("{} '{}' does not exist", resource_type, id),
            }
        }
        Commands::Plan {
            resource_type,
            id,
            data,
        } => {
            let prior = provider
                .import(&resource_type, &id)
                .with_context(|| format!("Failed to read {} '{}'", resource_type, id))?;
            let plan = provider.plan(&resource_type, Some(prior), parse_data(&data)?)?;
            print_plan(&resource_type, &id, &plan);
            Ok(())
        }
        Commands::Update {
            resource_type,
            id,
            data,
        } => {
            let prior = provider
                .import(&resource_type, &id)
                .with_context(|| format!("Failed to read {} '{}'", resource_type, id))?;
            let state = provider
                .update(&resource_type, prior, parse_data(&data)?)
                .with_context(|| format!("Failed to update {} '{}'", resource_type, id))?;
            eprintln!("{} Updated {} '{}'", "✓".green(), resource_type.cyan(), id);
            print_json(&state)
        }
        Commands::Delete { resource_type, id } => {
            let state = identifier_state(&provider, &resource_type, &id)?;
            provider
                .delete(&resource_type, state)
                .with_context(|| format!("Failed to delete {} '{}'", resource_type, id))?;
            eprintln!("{} Deleted {} '{}'", "✓".green(), resource_type.cyan(), id);
            Ok(())
        }
        Commands::Import { resource_type, id } => {
            let state = provider
                .import(&resource_type, &id)
                .with_context(|| format!("Failed to import {} '{}'", resource_type, id))?;
            eprintln!("{} Imported {} '{}'", "✓".green(), resource_type.cyan(), id);
            print_json(&state)
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Layer the configuration file, environment, and flags, in that order
fn resolve_config(args: &ProviderArgs) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProviderConfig::default(),
    }
    .apply_env();

    if let Some(name) = &args.provider_name {
        config.provider_name = name.clone();
    }
    if let Some(spec) = &args.spec {
        config.spec = Some(spec.clone());
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(api_key) = &args.api_key {
        config.api_key = Some(api_key.clone());
    }
    for (name, value) in &args.headers {
        config.headers.insert(name.clone(), value.clone());
    }

    config.validate()?;
    debug!(
        "Provider '{}' with spec {}",
        config.provider_name,
        config.spec.as_deref().unwrap_or("<unset>")
    );
    Ok(config)
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

/// Parse inline JSON, or the contents of a file given as `@path`
fn parse_data(data: &str) -> Result<Value> {
    let content = match data.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        None => data.to_string(),
    };
    let value: Value = serde_json::from_str(&content).context("Desired state is not valid JSON")?;
    if !value.is_object() {
        bail!("Desired state must be a JSON object");
    }
    Ok(value)
}

/// Minimal state carrying only the identifier
fn identifier_state(provider: &Provider, resource_type: &str, id: &str) -> Result<Value> {
    let schema = provider.resource_schema(resource_type)?;
    let mut state = Map::new();
    state.insert(
        schema.identifier_name().to_string(),
        Value::String(id.to_string()),
    );
    Ok(Value::Object(state))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resources_command(provider: &Provider) -> Result<()> {
    println!(
        "{} Provider {} exposes {} resource types",
        "→".cyan(),
        provider.name().yellow(),
        provider.resources().count()
    );

    for resource in provider.resources() {
        let schema = resource.lifecycle.schema();
        println!(
            "  • {} ({})",
            resource.type_name.cyan(),
            resource.lifecycle.endpoint().root_path()
        );
        if let Some(description) = &resource.description {
            println!("    {}", description);
        }
        println!("    Properties: {}", schema.properties.len());

        let force_new: Vec<&str> = schema
            .force_new_properties()
            .map(|p| p.name.as_str())
            .collect();
        if !force_new.is_empty() {
            println!("    Force new: {}", force_new.join(", "));
        }
        for warning in &resource.warnings {
            println!("    {} {}", "⚠".yellow(), warning);
        }
    }
    Ok(())
}

fn schema_command(provider: &Provider, resource_type: Option<&str>) -> Result<()> {
    let schema = provider.schema();
    match resource_type {
        Some(resource_type) => {
            provider.resource(resource_type)?;
            print_json(&schema["resources"][resource_type])
        }
        None => print_json(&schema),
    }
}

fn print_plan(resource_type: &str, id: &str, plan: &PlanResult) {
    if !plan.has_changes() {
        println!("{} {} '{}' is up to date", "✓".green(), resource_type, id);
        return;
    }

    println!(
        "{} {} '{}' has {} changes",
        "→".cyan(),
        resource_type.cyan(),
        id,
        plan.changes.len()
    );
    for change in &plan.changes {
        let marker = if change.requires_replacement {
            "forces replacement".red().to_string()
        } else if change.immutable {
            "immutable".red().to_string()
        } else {
            "in place".green().to_string()
        };
        println!(
            "  • {}: {} -> {} ({})",
            change.property,
            change.observed.as_ref().unwrap_or(&Value::Null),
            change.desired,
            marker
        );
    }
    if plan.requires_replace {
        println!(
            "\n{}",
            "Update cannot be applied in place; delete and recreate the resource".yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("X-Request-ID=req-1").unwrap(),
            ("X-Request-ID".to_string(), "req-1".to_string())
        );
        assert!(parse_header("novalue").is_err());
        assert!(parse_header("=x").is_err());
    }

    #[test]
    fn test_parse_data_inline_and_file() {
        assert_eq!(parse_data(r#"{"label": "x"}"#).unwrap(), json!({"label": "x"}));
        assert!(parse_data("[1, 2]").is_err());
        assert!(parse_data("{").is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hostnames": ["a.com"]}}"#).unwrap();
        let value = parse_data(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(value, json!({"hostnames": ["a.com"]}));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "provider_name: acme\nspec: ./swagger.json\nbase_url: http://file\n"
        )
        .unwrap();

        let cli = Cli::parse_from([
            "openapi-provider",
            "--config",
            file.path().to_str().unwrap(),
            "--base-url",
            "http://flag",
            "-H",
            "X-Tenant=t1",
            "resources",
        ]);
        let config = resolve_config(&cli.provider).unwrap();

        assert_eq!(config.provider_name, "acme");
        assert_eq!(config.base_url.as_deref(), Some("http://flag"));
        assert_eq!(config.headers.get("X-Tenant").map(String::as_str), Some("t1"));
    }
}
