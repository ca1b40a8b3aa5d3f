use std::{fs::File, path::Path};

use miette::{Context, IntoDiagnostic, Result};

pub mod awb;
pub mod utf;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle @UTF tables (ACB, ACF and CPK tables of contents)
    Utf {
        #[command(subcommand)]
        command: utf::UtfCommands,
    },
    /// Handle AWB archives
    Awb {
        #[command(subcommand)]
        command: awb::AwbCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Utf { command } => command.handle(),
            Commands::Awb { command } => command.handle(),
        }
    }
}

/// Opens `path` for writing, refusing to replace an existing file unless `overwrite` is set
pub(crate) fn create_output(path: &Path, overwrite: bool) -> Result<File> {
    if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    }
}

/// Reads a whole input file, naming it in the error
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}
