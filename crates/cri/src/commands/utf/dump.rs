use clap::{Args, ValueEnum};
use cri_utf::Table;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::{fmt::Write as _, io::Write, path::PathBuf};
use tracing::info;

use crate::commands::{create_output, read_input, utf::json};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// The whole table as JSON with nested tables expanded, accepted back by `utf build`
    #[default]
    Json,
    /// Names and sizes of the table and every table or archive nested in it
    Tree,
}

#[derive(Args)]
pub struct DumpArgs {
    /// An input file holding a table
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Where the table starts inside the file
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Output format
    #[arg(short = 'm', long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// A target file, stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

fn outline(table: &Table, depth: usize, out: &mut String) -> Result<()> {
    let indent = "  ".repeat(depth);
    writeln!(
        out,
        "{indent}{} ({} columns, {} rows)",
        table.name().blue(),
        table.column_count(),
        table.row_count()
    )
    .into_diagnostic()?;

    for (row, cells) in table.rows().iter().enumerate() {
        for (column, value) in table.columns().iter().zip(cells.iter()) {
            let Some(bytes) = value.as_bytes() else {
                continue;
            };

            if let Some(nested) = value.nested_table() {
                let nested = nested.context(format!("decoding {}[{row}]", column.name()))?;
                writeln!(out, "{indent}  {}[{row}]:", column.name()).into_diagnostic()?;
                outline(&nested, depth + 2, out)?;
            } else if bytes.starts_with(cri_awb::MAGIC) {
                let awb = cri_awb::decode(bytes)
                    .context(format!("decoding {}[{row}]", column.name()))?;
                writeln!(
                    out,
                    "{indent}  {}[{row}]: {} ({} files, alignment {:#x})",
                    column.name(),
                    "AWB".green(),
                    awb.len(),
                    awb.alignment()
                )
                .into_diagnostic()?;
            }
        }
    }

    Ok(())
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_input(&self.file)?;
        let table = cri_utf::decode(&data, self.offset)
            .context(format!("reading {}", self.file.display()))?;
        info!(
            "{} holds table {} with {} rows",
            self.file.display(),
            table.name(),
            table.row_count()
        );

        let text = match self.format {
            Format::Json => serde_json::to_string_pretty(&json::to_json(&table)?).into_diagnostic()?,
            Format::Tree => {
                let mut text = String::new();
                outline(&table, 0, &mut text)?;
                text
            }
        };

        match &self.output {
            Some(path) => {
                info!("writing {}", path.display());
                let mut out = create_output(path, self.overwrite)?;
                writeln!(out, "{text}").into_diagnostic()?;
            }
            None => println!("{text}"),
        }

        Ok(())
    }
}
