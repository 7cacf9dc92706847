//! kiln CLI - bake annotated notebooks into service modules.

mod build;
mod colors;
mod compile;
mod init;
mod watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kiln_notebook::{BuildConfig, NotebookError};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Compile annotated notebooks into FastAPI service modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every notebook in a project tree
    Build {
        #[command(flatten)]
        paths: PathArgs,

        /// Ignore file (relative paths resolve against the source directory)
        #[arg(long)]
        ignore_file: Option<PathBuf>,
    },

    /// Compile a single notebook
    Compile {
        /// Path to the notebook (.ipynb file)
        notebook: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default .kilnignore
    Init,

    /// Build, then rebuild whenever a notebook changes
    Watch {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(clap::Args)]
struct PathArgs {
    /// Source directory
    #[arg(short, long, default_value = ".")]
    source: PathBuf,

    /// Build directory (default: <source>/build)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl PathArgs {
    fn config(self) -> BuildConfig {
        let config = BuildConfig::new(self.source);
        match self.out {
            Some(out) => config.with_build_dir(out),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Notebook errors carry recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(notebook_err) = err.downcast_ref::<NotebookError>() {
            anyhow::anyhow!("{}", notebook_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Build { paths, ignore_file } => {
            let mut config = paths.config();
            if let Some(ignore_file) = ignore_file {
                config = config.with_ignore_file(ignore_file);
            }
            build::execute(&config).map_err(format_error)?;
        }

        Commands::Compile { notebook, output } => {
            compile::execute(&notebook, output.as_deref()).map_err(format_error)?;
        }

        Commands::Init => init::execute(".").map_err(format_error)?,

        Commands::Watch { paths } => {
            watch::execute(&paths.config()).await.map_err(format_error)?;
        }
    }

    Ok(())
}
