//! # TensorFlow Processor Configuration Validator
//!
//! Command-line tool for validating processor configuration before deploying
//! the stream. Loads the same layered sources the processor uses at startup.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tensorflow_processor_config::config::{
    loader::KNOWN_OPTIONS, ConfigLoader, ValidatedConfig, DEFAULT_OUTPUT_NAME,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate TensorFlow processor configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment whose file section is applied (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override an option, e.g. --set mode=header (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Ignore TENSORFLOW_* environment variables
    #[arg(long)]
    no_env: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration
    Validate,

    /// List recognized options
    Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Options) => list_options(),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn build_loader(cli: &Cli) -> Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();

    if let Some(environment) = &cli.environment {
        loader = loader.with_environment(environment.as_str());
    }
    if let Some(path) = &cli.config {
        loader = loader.with_file(path.clone());
    }
    if cli.no_env {
        loader = loader.without_env_vars();
    }

    for assignment in &cli.overrides {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Invalid --set value '{assignment}', expected KEY=VALUE");
        };
        loader = loader.with_override(key.trim(), value.trim());
    }

    Ok(loader)
}

fn validate(cli: &Cli) -> Result<()> {
    let loader = build_loader(cli)?;
    let config = loader
        .load_validated()
        .with_context(|| format!("environment '{}'", loader.environment()))?;

    match cli.format {
        OutputFormat::Table => print_table(&config, loader.environment()),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config.to_log_value())?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&config.to_log_value())?),
    }

    Ok(())
}

fn print_table(config: &ValidatedConfig, environment: &str) {
    println!("🔧 TensorFlow Processor Configuration");
    println!("Environment: {environment}");
    println!();

    let model = config.model();
    println!("  model        {}", model.redacted());
    println!("    scheme     {}", model.scheme());
    if let Some(selector) = model.entry_selector() {
        println!("    archive    {selector:?}");
    }
    let fetch = if config.model_fetch().is_empty() {
        "<none>".to_string()
    } else {
        config.model_fetch().join(", ")
    };
    println!("  model-fetch  {fetch}");
    println!("  expression   {}", config.expression());
    println!("  mode         {}", config.mode());
    println!("  output-name  {}", config.output_name());

    if !config.mode().uses_output_name() && config.output_name() != DEFAULT_OUTPUT_NAME {
        println!();
        println!("⚠️  output-name is ignored in '{}' mode", config.mode());
    }

    println!("\n✅ Configuration is valid");
}

fn list_options() -> Result<()> {
    println!("📋 Recognized options (prefix 'tensorflow'):");
    for option in KNOWN_OPTIONS {
        println!(
            "  • {:<12} TENSORFLOW_{}",
            option.replace('_', "-"),
            option.to_ascii_uppercase()
        );
    }
    Ok(())
}
