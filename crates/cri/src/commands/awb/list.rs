use clap::Args;
use cri_awb::AwbArchive;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::info;

use crate::commands::read_input;

#[derive(Args)]
pub struct ListArgs {
    /// An input AWB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_input(&self.file)?;
        let awb = AwbArchive::new(&data).context(format!("reading {}", self.file.display()))?;

        info!(
            version = awb.version(),
            alignment = awb.alignment(),
            subkey = awb.subkey(),
            "{} holds {} files",
            self.file.display(),
            awb.len()
        );

        println!(
            "{:>5}  {:>10}  {:>10}  {:>10}  {}",
            "index".bold(),
            "id".bold(),
            "offset".bold(),
            "length".bold(),
            "kind".bold()
        );
        for (index, file) in awb.iter().enumerate() {
            println!(
                "{:>5}  {:>10}  {:>#10x}  {:>10}  {}",
                index,
                format!("{:08x}", file.id()).cyan(),
                file.offset(),
                file.len(),
                file.kind()
            );
        }

        Ok(())
    }
}
