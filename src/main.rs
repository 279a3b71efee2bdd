use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orgsite::{Config, site};

#[derive(Parser)]
#[command(name = "orgsite")]
#[command(about = "Build static HTML pages from Org documents")]
struct Cli {
    /// Site configuration file
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every page and write the site to the build directory
    Build,

    /// Convert a single document to an HTML fragment
    Render {
        /// Input document (Org source, or pandoc JSON with a .json extension)
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgsite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Build => {
            if let Err(e) = site::build(&config) {
                error!("{e}");
                std::process::exit(1);
            }
        }
        Command::Render { input, output } => {
            let html = match site::convert(&input, &config.pandoc) {
                Ok((_, rendered)) => rendered.to_html(),
                Err(e) => {
                    error!("{e}");
                    std::process::exit(1);
                }
            };

            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, html) {
                        error!("Error writing {}: {}", path.display(), e);
                        std::process::exit(1);
                    }
                    info!("Created {}", path.display());
                }
                None => print!("{html}"),
            }
        }
    }
}
