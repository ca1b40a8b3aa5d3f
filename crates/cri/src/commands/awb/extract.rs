use clap::Args;
use cri_awb::AwbArchive;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{io::Write, path::PathBuf};
use tracing::info;

use crate::commands::{create_output, read_input};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input AWB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_input(&self.file)?;
        let awb = AwbArchive::new(&data).context(format!("reading {}", self.file.display()))?;

        let stem = self
            .file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or(miette!("unable to take a file stem from {}", self.file.display()))?;

        std::fs::create_dir_all(&self.directory)
            .into_diagnostic()
            .context(format!("creating {}", self.directory.display()))?;

        for file in awb.iter() {
            let p = self.directory.join(file.file_name(stem));
            info!("writing {}", p.display());

            let mut out = create_output(&p, self.overwrite)?;
            out.write_all(file.data())
                .into_diagnostic()
                .context(format!("writing {}", p.display()))?;
        }

        Ok(())
    }
}
