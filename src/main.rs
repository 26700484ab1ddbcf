use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cloudflat::{init, BuildError, Builder};

#[derive(Parser)]
#[command(name = "cloudflat", version, about = "Flatten TypeScript modules into cloud-code sandbox scripts")]
struct Cli {
    /// Project directory; its tsconfig.json is searched upward from here.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the starter configuration files.
    Init,
    /// Transform tracked sources into sandbox scripts.
    Build {
        /// Single file to build; omit to build the whole project.
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BuildError> {
    match &cli.command {
        Command::Init => init(&cli.root),
        Command::Build { file } => {
            let builder = Builder::new(&cli.root)?;
            match file {
                Some(file) => builder.build(file),
                None => builder.build_all(),
            }
        }
    }
}
