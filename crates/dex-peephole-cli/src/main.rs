use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use dex_peephole::{ConfigFiles, DexStore, JsonConfig, PeepholePass};

#[derive(Parser)]
#[command(name = "dex-peephole")]
#[command(about = "Peephole optimizer for Dalvik register bytecode")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every method in a JSON store dump
    Optimize {
        #[arg(help = "Input JSON file with a top-level \"stores\" array")]
        input: PathBuf,

        #[arg(short, long, help = "Output JSON file")]
        output: PathBuf,

        #[arg(short, long, help = "JSON configuration file")]
        config: Option<PathBuf>,
    },
    /// List the active rules in the order they are tried
    Rules {
        #[arg(short, long, help = "JSON configuration file")]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize, Deserialize)]
struct StoreDump {
    stores: Vec<DexStore>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let pass = PeepholePass::from_config(&config).context("Invalid PeepholePass config")?;

            let contents = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut dump: StoreDump = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", input.display()))?;

            let stats = pass.run(&mut dump.stores, &config);

            let encoded = serde_json::to_string_pretty(&dump).context("Failed to encode output")?;
            fs::write(&output, encoded)
                .with_context(|| format!("Failed to write output to {}", output.display()))?;

            println!(
                "Optimized {} -> {}: {} methods visited, {} changed, {} skipped, {} failed, {} instructions removed",
                input.display(),
                output.display(),
                stats.methods_visited,
                stats.methods_changed,
                stats.methods_skipped,
                stats.methods_failed,
                stats.instructions_removed
            );
            for (rule, count) in &stats.rule_applications {
                println!("  {rule}: {count}");
            }
        }
        Commands::Rules { config } => {
            let config = load_config(config.as_deref())?;
            let pass = PeepholePass::from_config(&config).context("Invalid PeepholePass config")?;
            for name in pass.table().rule_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ConfigFiles> {
    let json = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loading config");
            JsonConfig::parse(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => JsonConfig::default(),
    };
    ConfigFiles::new(json).context("Invalid configuration")
}
