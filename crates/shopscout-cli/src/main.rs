//! Shopscout command-line scraper: entry point.

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use shopscout::targets::{default_categories, load_url_list, parse_category_arg};
use shopscout::{PageKind, ScrapeConfig, SinkKind, Target};

#[derive(Parser)]
#[command(
    name = "shopscout",
    about = "Scrape product records from JavaScript-rendered storefront pages",
    version,
    after_help = "Run 'shopscout <command> --help' for details on each command."
)]
struct Cli {
    /// Path to a JSON config file (default: $SHOPSCOUT_CONFIG or ./shopscout.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Comma-separated sinks to write (csv, xlsx, sqlite, jsonl).
    #[arg(long, global = true, value_delimiter = ',', default_values = ["xlsx", "csv", "sqlite"])]
    sinks: Vec<SinkKind>,

    /// Directory for output files.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long, global = true)]
    headful: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape category listing pages.
    Listing {
        /// Category to scrape as name=url. Can be repeated; defaults to the
        /// built-in category table.
        #[arg(long = "category", value_parser = parse_category_arg)]
        categories: Vec<Target>,

        /// Maximum products per listing page.
        #[arg(long)]
        max_products: Option<usize>,
    },

    /// Scrape product detail pages listed in a file (one URL per line).
    Detail {
        /// Seed file of product URLs.
        #[arg(long)]
        urls: PathBuf,

        /// Category label for the records.
        #[arg(long, default_value = "detail")]
        label: String,
    },

    /// Extract records from a saved HTML snapshot and print them as JSON.
    Parse {
        /// Saved page markup.
        file: PathBuf,

        /// Page kind (listing or detail).
        #[arg(long, default_value = "listing")]
        mode: PageKind,

        /// Category label for the records.
        #[arg(long)]
        category: Option<String>,

        /// URL the page was saved from.
        #[arg(long)]
        url: Option<String>,

        /// Maximum products to extract.
        #[arg(long)]
        max_products: Option<usize>,
    },

    /// Check browser availability and show the effective configuration.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   shopscout completions bash > ~/.local/share/bash-completion/completions/shopscout
    ///   shopscout completions zsh > ~/.zfunc/_shopscout
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "shopscout", &mut std::io::stdout());
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    logging::init(&cli.log_level, cli.log_file.as_deref())?;

    let mut config = ScrapeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.headful {
        config.headless = false;
    }

    match cli.command {
        Commands::Listing {
            categories,
            max_products,
        } => {
            if let Some(n) = max_products {
                config.max_products = n;
            }
            let targets = if categories.is_empty() {
                default_categories(&config.site_origin)
            } else {
                categories
            };
            commands::scrape(&config, targets, &cli.sinks).await
        }
        Commands::Detail { urls, label } => {
            let targets = load_url_list(&urls, &label)
                .with_context(|| format!("failed to read URL list: {}", urls.display()))?;
            commands::scrape(&config, targets, &cli.sinks).await
        }
        Commands::Parse {
            file,
            mode,
            category,
            url,
            max_products,
        } => {
            if let Some(n) = max_products {
                config.max_products = n;
            }
            commands::parse(&config, &file, mode, category.as_deref(), url.as_deref())
        }
        Commands::Doctor => commands::doctor(&config, cli.config.as_deref()),
        Commands::Completions { .. } => Ok(()),
    }
}
