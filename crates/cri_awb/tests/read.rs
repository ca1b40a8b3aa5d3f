use std::path::Path;

use cri_awb::{AwbArchive, SubfileKind};
use miette::{IntoDiagnostic, Result};
use pretty_assertions::assert_eq;
use tracing::{info, instrument};
use tracing_test::traced_test;
use walkdir::WalkDir;

#[instrument(skip_all, fields(file = %path.display()))]
fn validate_awb(path: &Path) -> Result<()> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| miette::miette!("archive path has no file stem"))?;
    let parent_dir = path.with_extension("");

    info!("comparing to files in {}", parent_dir.display());

    let mut expected_files = WalkDir::new(&parent_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();
    expected_files.sort();

    let bytes = std::fs::read(path).into_diagnostic()?;
    let awb = AwbArchive::new(&bytes)?;
    assert_eq!(awb.len(), expected_files.len());

    for file in awb.iter() {
        let p = parent_dir.join(file.file_name(stem));
        info!("comparing to {}", p.display());

        let expected = std::fs::read(&p).into_diagnostic()?;
        assert_eq!(expected.len(), file.len());
        assert_eq!(expected, file.data());
        assert_eq!(file.offset() % u64::from(awb.alignment()), 0);
    }

    Ok(())
}

#[traced_test]
#[test]
fn validate_awb_parsing() -> Result<()> {
    let to_test = std::fs::read_dir(format!("{}/resources/", env!("CARGO_MANIFEST_DIR")))
        .into_diagnostic()?
        .filter_map(|res| res.ok())
        .map(|dir_entry| dir_entry.path())
        .filter(|e| e.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "awb"));

    let mut tested = 0;
    for path in to_test {
        validate_awb(&path)?;
        tested += 1;
    }
    assert_eq!(tested, 2);

    Ok(())
}

#[traced_test]
#[test]
fn read_header_fields() -> Result<()> {
    let bytes = std::fs::read(format!("{}/resources/bgm.awb", env!("CARGO_MANIFEST_DIR")))
        .into_diagnostic()?;
    let awb = AwbArchive::new(&bytes)?;

    assert_eq!(awb.version(), 1);
    assert_eq!(awb.alignment(), 0x40);
    assert_eq!(awb.subkey(), 0x5A5A);
    assert_eq!(awb.id_width(), 4);
    assert_eq!(awb.offset_width(), 4);
    assert_eq!(awb.ids().collect::<Vec<_>>(), vec![0x12345, 3, 0x10]);

    let kinds = awb.iter().map(|f| f.kind()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![SubfileKind::Hca, SubfileKind::Unknown, SubfileKind::EncryptedHca]
    );
    assert!(awb.by_id(3)?.is_empty());

    Ok(())
}
