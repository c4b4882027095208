//! archstrap - Arch Linux bootstrap rootfs fetcher.
//!
//! Resolves which bootstrap tarball to fetch, downloads it from a mirror,
//! verifies it when the transport requires, and unpacks it into a
//! destination directory as a flat rootfs tree.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use archstrap::definition::Definition;
use archstrap::preflight;
use archstrap::source::{archlinux, ArchLinuxSource, Source};

#[derive(Parser)]
#[command(name = "archstrap")]
#[command(about = "Arch Linux bootstrap rootfs fetcher")]
#[command(
    after_help = "QUICK START:\n  archstrap run --rootfs ./rootfs   Fetch the latest release into ./rootfs\n  archstrap resolve                 Print the latest release\n  archstrap preflight               Check required host tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, verify, and unpack a bootstrap rootfs
    Run {
        /// Destination rootfs directory
        #[arg(long)]
        rootfs: PathBuf,

        /// Definition file (JSON); defaults apply when omitted
        #[arg(long)]
        definition: Option<PathBuf>,

        /// Release override (e.g. 2024.01.01); empty means latest
        #[arg(long)]
        release: Option<String>,

        /// Mirror base URL override
        #[arg(long)]
        mirror: Option<String>,

        /// Architecture override
        #[arg(long)]
        arch: Option<String>,

        /// Skip signature verification
        #[arg(long)]
        skip_verification: bool,
    },

    /// Print the latest release from the download page
    Resolve,

    /// Run preflight checks (verify host tools before a run)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show the effective definition
    Config {
        /// Definition file (JSON)
        #[arg(long)]
        definition: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Run {
            rootfs,
            definition,
            release,
            mirror,
            arch,
            skip_verification,
        } => {
            let mut definition = load_definition(definition.as_deref())?;
            if let Some(release) = release {
                definition.image.release = release;
            }
            if let Some(mirror) = mirror {
                definition.source.url = mirror;
            }
            if let Some(arch) = arch {
                definition.image.architecture = arch;
            }
            if skip_verification {
                definition.source.skip_verification = true;
            }

            ArchLinuxSource.run(&definition, &rootfs)?;
        }

        Commands::Resolve => {
            let release = archlinux::latest_release()?;
            println!("{}", release);
        }

        Commands::Preflight { strict } => {
            preflight::cmd_preflight(strict)?;
        }

        Commands::Show { what } => match what {
            ShowTarget::Config { definition } => {
                let definition = load_definition(definition.as_deref())?;
                definition.print();
            }
        },
    }

    Ok(())
}

fn load_definition(path: Option<&Path>) -> Result<Definition> {
    match path {
        Some(path) => Definition::load(path),
        None => Ok(Definition::from_env()),
    }
}
