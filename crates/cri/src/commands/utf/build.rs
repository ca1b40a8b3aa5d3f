use clap::Args;
use cri_utf::UtfWriterOptions;
use miette::{Context, IntoDiagnostic, Result};
use std::{io::Write, path::PathBuf};
use tracing::info;

use crate::commands::{create_output, read_input, utf::json};

#[derive(Args)]
pub struct BuildArgs {
    /// An input JSON file as written by `utf dump`
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// A target table file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Pad the string pool and align every blob in the data pool, nested tables included
    #[arg(short, long, value_name = "BYTES")]
    align: Option<u32>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl BuildArgs {
    pub fn handle(&self) -> Result<()> {
        let text = read_input(&self.input)?;
        let options = UtfWriterOptions::builder()
            .maybe_data_alignment(self.align)
            .build();

        let table = serde_json::from_slice(&text)
            .into_diagnostic()
            .and_then(|value| json::from_json(value, options))
            .context(format!("parsing {}", self.input.display()))?;

        let bytes = cri_utf::encode_with(&table, options)
            .context(format!("encoding table {}", table.name()))?;

        info!("writing {} ({} bytes)", self.file.display(), bytes.len());
        let mut out = create_output(&self.file, self.overwrite)?;
        out.write_all(&bytes).into_diagnostic()?;

        Ok(())
    }
}
