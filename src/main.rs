use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docwriter::cli::ConfigOverrides;
use docwriter::cli::commands::{self, generate::GenerateOptions};

#[derive(Parser)]
#[command(name = "docwriter")]
#[command(
    version,
    about = "Plan and write topic-by-topic documentation for a git repository"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for a repository URL
    Generate {
        #[arg(help = "http(s) URL of the repository (prompted when omitted)")]
        url: Option<String>,

        #[command(flatten)]
        overrides: OverrideArgs,

        #[arg(long, help = "Abort the run on the first failed topic")]
        fail_fast: bool,
    },

    /// List generated documents
    List,

    /// Print a generated document
    View {
        #[arg(help = "Document path, e.g. docs/overview.mdx")]
        path: String,
    },

    /// Serve the documentation tools over MCP (stdio)
    Serve {
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct OverrideArgs {
    #[arg(long, short, help = "Output directory for plan and documents")]
    output: Option<PathBuf>,
    #[arg(long, help = "Directory repositories are cloned into")]
    workdir: Option<PathBuf>,
    #[arg(long, help = "LLM provider (claude-code, ollama, openai)")]
    provider: Option<String>,
    #[arg(long, help = "Model to use")]
    model: Option<String>,
}

impl OverrideArgs {
    fn into_overrides(self, fail_fast: bool) -> ConfigOverrides {
        ConfigOverrides {
            output: self.output,
            workdir: self.workdir,
            provider: self.provider,
            model: self.model,
            fail_fast,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdocwriter encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace with RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // stdout carries command output and the MCP transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            url,
            overrides,
            fail_fast,
        } => {
            commands::generate::run(GenerateOptions {
                url,
                overrides: overrides.into_overrides(fail_fast),
            })?;
        }
        Commands::List => {
            commands::list::run()?;
        }
        Commands::View { path } => {
            commands::view::run(&path)?;
        }
        Commands::Serve { overrides } => {
            commands::serve::run(&overrides.into_overrides(false))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                commands::config::show(json)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
