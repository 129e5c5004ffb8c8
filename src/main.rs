mod colors;
mod commands;

use chembrew::config::Config;
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use colors::ColorChoice;
use commands::BuildArgs;

#[derive(Parser)]
#[command(name = "chembrew")]
#[command(author, version, about = "Build and install cheminformatics formulae from source", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Commands {
    /// List the formulae chembrew can build
    List,

    /// Show the options a formula accepts
    Options {
        /// Formula name
        formula: String,
    },

    /// Show the dependencies a build would use
    Deps {
        /// Formula name
        formula: String,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Show the build steps without running them
    Plan {
        /// Formula name
        formula: String,

        /// Treat every dependency as installed
        #[arg(long)]
        assume_installed: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build a formula from source and install it into the Cellar
    Install {
        /// Formula name
        formula: String,

        /// Keep the build directory after a successful install
        #[arg(long)]
        keep_build: bool,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    colors::init_colors(cli.color);
    let config = Config::from_env();

    match cli.command {
        Some(Commands::List) => commands::list()?,
        Some(Commands::Options { formula }) => commands::options(&formula)?,
        Some(Commands::Deps { formula, build }) => commands::deps(&config, &formula, &build)?,
        Some(Commands::Plan {
            formula,
            assume_installed,
            json,
            build,
        }) => commands::plan(&config, &formula, &build, assume_installed, json)?,
        Some(Commands::Install {
            formula,
            keep_build,
            build,
        }) => commands::install(&config, &formula, &build, keep_build).await?,
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "chembrew", &mut std::io::stdout());
        }
        None => {
            println!("{} chembrew - cheminformatics formulae built from source", "⚗".bold());
            println!("\nRun {} to see available commands.", "chembrew --help".cyan());
        }
    }

    Ok(())
}
