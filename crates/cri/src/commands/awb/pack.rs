use clap::Args;
use cri_awb::{AwbArchive, AwbWriter, AwbWriterOptions};
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::commands::{create_output, read_input};

#[derive(Args)]
pub struct PackArgs {
    /// An input directory. Subfiles are packed in file name order unless a template is given
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target AWB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// An existing archive whose id order and header fields are reused.
    /// Ids it does not list follow in file name order
    #[arg(short, long, value_name = "AWB")]
    template: Option<PathBuf>,

    /// Boundary subfile starts are rounded up to [default: template's, else 32]
    #[arg(short, long)]
    alignment: Option<u32>,

    /// Header version byte [default: template's, else 2]
    #[arg(long)]
    version: Option<u8>,

    /// Key modifier for encrypted HCA payloads [default: template's, else 0]
    #[arg(long)]
    subkey: Option<u16>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

/// Reads the id back from an extracted name such as `voice_0000002a.hca`
fn parse_id(stem: &str) -> Option<u32> {
    let (_, suffix) = stem.rsplit_once('_')?;
    if suffix.len() != 8 {
        return None;
    }
    u32::from_str_radix(suffix, 16).ok()
}

/// Files of `directory` in file name order, each with the id from its name or its position
fn collect_inputs(directory: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let files = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();

    if files.is_empty() {
        return Err(miette!("directory is empty"));
    }

    files
        .into_iter()
        .enumerate()
        .map(|(position, path)| {
            let id = match path.file_stem().and_then(|s| s.to_str()).and_then(parse_id) {
                Some(id) => id,
                None => u32::try_from(position).into_diagnostic()?,
            };
            Ok((id, path))
        })
        .collect()
}

/// Moves ids listed in `template` to the front in its order; the rest keep their order.
fn order_by_template(inputs: &mut [(u32, PathBuf)], template: &[u32]) {
    let positions = template
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect::<HashMap<_, _>>();

    inputs.sort_by_key(|(id, _)| positions.get(id).copied().unwrap_or(usize::MAX));
}

impl PackArgs {
    /// Reads every input and lays out the archive in memory
    fn build(&self) -> Result<Vec<u8>> {
        let mut inputs = collect_inputs(&self.directory)?;

        let defaults = match &self.template {
            Some(path) => {
                let bytes = read_input(path)?;
                let template =
                    AwbArchive::new(&bytes).context(format!("reading {}", path.display()))?;
                debug!(count = template.len(), "ordering by template");

                order_by_template(&mut inputs, &template.ids().collect::<Vec<_>>());
                AwbWriterOptions::builder()
                    .alignment(template.alignment().into())
                    .version(template.version())
                    .subkey(template.subkey())
                    .build()
            }
            None => AwbWriterOptions::default(),
        };

        let options = AwbWriterOptions {
            alignment: self.alignment.unwrap_or(defaults.alignment),
            version: self.version.unwrap_or(defaults.version),
            subkey: self.subkey.unwrap_or(defaults.subkey),
            ..defaults
        };

        let mut awb = AwbWriter::new(Vec::new(), options);
        for (id, path) in &inputs {
            info!("packing {} as {:08x}", path.display(), id);

            let data = read_input(path)?;
            awb.add_file(*id, data)
                .context(format!("adding {}", path.display()))?;
        }

        awb.finish().context("finalizing awb file")
    }

    pub fn handle(&self) -> Result<()> {
        let bytes = self.build()?;

        info!("creating {}", &self.file.display());
        let mut out = create_output(&self.file, self.overwrite)?;
        out.write_all(&bytes).into_diagnostic()?;
        out.flush().into_diagnostic()?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{ffi::OsString, path::Path, path::PathBuf};

    use clap::Parser;
    use miette::IntoDiagnostic;
    use pretty_assertions::assert_eq;

    use super::{order_by_template, parse_id, PackArgs};

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        pack: PackArgs,
    }

    fn parse(directory: &Path, file: &Path, template: Option<&Path>) -> miette::Result<Cli> {
        let mut args = vec![
            OsString::from("pack"),
            "--directory".into(),
            directory.into(),
            "--file".into(),
            file.into(),
        ];
        if let Some(template) = template {
            args.extend(["--template".into(), template.into()]);
        }
        Cli::try_parse_from(args).into_diagnostic()
    }

    #[test]
    fn ids_come_from_the_hex_suffix() {
        assert_eq!(parse_id("voice_0000002a"), Some(0x2a));
        assert_eq!(parse_id("bgm_title_00012345"), Some(0x12345));
        assert_eq!(parse_id("voice_2a"), None);
        assert_eq!(parse_id("voice_zzzzzzzz"), None);
        assert_eq!(parse_id("voice"), None);
    }

    #[test]
    fn template_order_comes_first() {
        let mut inputs = [1u32, 2, 5, 9, 12]
            .map(|id| (id, PathBuf::from(format!("voice_{id:08x}.hca"))))
            .to_vec();

        order_by_template(&mut inputs, &[9, 2, 7, 5]);

        assert_eq!(
            inputs.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![9, 2, 5, 1, 12]
        );
    }

    #[test]
    fn extract_then_pack_keeps_template_order() -> miette::Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let template = dir.path().join("voice.awb");
        std::fs::write(
            &template,
            cri_awb::encode([(7u32, b"HCA\0b".as_slice()), (3, b"HCA\0a".as_slice())], 0x40)?,
        )
        .into_diagnostic()?;

        let files = dir.path().join("voice");
        std::fs::create_dir(&files).into_diagnostic()?;
        std::fs::write(files.join("voice_00000003.hca"), b"HCA\0a").into_diagnostic()?;
        std::fs::write(files.join("voice_00000007.hca"), b"HCA\0b").into_diagnostic()?;

        let output = dir.path().join("out.awb");
        parse(&files, &output, Some(&template))?.pack.handle()?;

        let expected = std::fs::read(&template).into_diagnostic()?;
        let actual = std::fs::read(&output).into_diagnostic()?;
        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn failed_pack_leaves_no_output() -> miette::Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let files = dir.path().join("voice");
        std::fs::create_dir(&files).into_diagnostic()?;
        std::fs::write(files.join("a_00000001.hca"), b"HCA\0a").into_diagnostic()?;
        std::fs::write(files.join("b_00000001.hca"), b"HCA\0b").into_diagnostic()?;

        let output = dir.path().join("out.awb");
        assert!(parse(&files, &output, None)?.pack.handle().is_err());
        assert!(!output.exists());

        Ok(())
    }
}
