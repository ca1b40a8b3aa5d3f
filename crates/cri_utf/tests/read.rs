use std::path::PathBuf;

use cri_utf::{
    decode, encode, Column, DataType, Error, Storage, StorageKind, Table, TableBuilder, Value,
};
use miette::{IntoDiagnostic, Result};
use pretty_assertions::assert_eq;
use tracing::info;
use tracing_test::traced_test;

fn resource(name: &str) -> PathBuf {
    PathBuf::from(format!("{}/resources/{name}", env!("CARGO_MANIFEST_DIR")))
}

fn read_table(name: &str) -> Result<Table> {
    let path = resource(name);
    info!("decoding {}", path.display());

    let bytes = std::fs::read(&path).into_diagnostic()?;
    Ok(decode(&bytes, 0)?)
}

#[traced_test]
#[test]
fn decode_cue_sheet() -> Result<()> {
    let table = read_table("cue_sheet.utf")?;

    assert_eq!(table.name(), "Header");
    assert_eq!(table.version(), 1);
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        table
            .columns()
            .iter()
            .map(|c| (c.name(), c.data_type(), c.kind()))
            .collect::<Vec<_>>(),
        vec![
            ("Name", DataType::String, StorageKind::PerRow),
            ("Type", DataType::UInt8, StorageKind::PerRow),
            ("Version", DataType::UInt32, StorageKind::Constant),
            ("Volume", DataType::Float32, StorageKind::PerRow),
            ("CueTable", DataType::Data, StorageKind::PerRow),
            ("Unused", DataType::String, StorageKind::Zero),
            ("Id", DataType::Int64, StorageKind::PerRow),
            ("Comment", DataType::String, StorageKind::Constant),
        ]
    );
    assert_eq!(
        table.columns()[2].storage(),
        &Storage::Constant(Value::UInt32(0x0130_0000))
    );

    assert_eq!(table.get(0, "Name"), Some(&Value::from("title_bank")));
    assert_eq!(table.get(1, "Name"), Some(&Value::from("title_bank")));
    assert_eq!(table.get(1, "Type"), Some(&Value::UInt8(3)));
    assert_eq!(table.get(1, "Version"), Some(&Value::UInt32(0x0130_0000)));
    assert_eq!(table.get(0, "Volume"), Some(&Value::Float32(1.0)));
    assert_eq!(table.get(1, "Volume"), Some(&Value::Float32(0.5)));
    assert_eq!(table.get(0, "Unused"), Some(&Value::from("")));
    assert_eq!(table.get(0, "Id"), Some(&Value::Int64(-1)));
    assert_eq!(table.get(1, "Id"), Some(&Value::Int64(1 << 40)));
    assert_eq!(table.get(1, "Comment"), Some(&Value::from("shared comment")));
    assert_eq!(table.get(1, "CueTable"), Some(&Value::Data(Vec::new())));

    // blobs were written padded to 0x20
    let blob = table.get(0, "CueTable").and_then(Value::as_bytes).unwrap_or_default();
    assert_eq!(blob.len(), 0x80);

    Ok(())
}

#[traced_test]
#[test]
fn decode_nested_table() -> Result<()> {
    let table = read_table("cue_sheet.utf")?;
    let expected = read_table("cue.utf")?;

    let nested = table
        .get(0, "CueTable")
        .and_then(Value::nested_table)
        .transpose()?;
    assert_eq!(nested.as_ref(), Some(&expected));

    assert_eq!(expected.name(), "Cue");
    assert_eq!(expected.get(1, "CueId"), Some(&Value::UInt32(7)));
    assert_eq!(expected.get(1, "CueName"), Some(&Value::from("se_click")));
    assert_eq!(expected.get(1, "Loop"), Some(&Value::UInt8(1)));
    assert_eq!(expected.layout().stride(), 8);

    Ok(())
}

#[traced_test]
#[test]
fn reencode_fixtures() -> Result<()> {
    for name in ["cue_sheet.utf", "cue.utf"] {
        let table = read_table(name)?;

        let bytes = encode(&table)?;
        assert_eq!(decode(&bytes, 0)?, table);
        assert_eq!(encode(&decode(&bytes, 0)?)?, bytes);
    }

    Ok(())
}

#[cfg(feature = "serde")]
#[test]
fn json_round_trip() -> Result<()> {
    let table = read_table("cue_sheet.utf")?;

    let json = serde_json::to_string_pretty(&table).into_diagnostic()?;
    let parsed: Table = serde_json::from_str(&json).into_diagnostic()?;
    assert_eq!(parsed, table);

    Ok(())
}

#[traced_test]
#[test]
fn rows_without_bytes_are_bounded() -> Result<()> {
    #[rustfmt::skip]
    let input = [
        0x40, 0x55, 0x54, 0x46,
        0x00, 0x00, 0x00, 0x1A,
        0x00, 0x01,
        0x00, 0x18,
        0x00, 0x00, 0x00, 0x18,
        0x00, 0x00, 0x00, 0x1A,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        0x00, 0x00,
        0xFF, 0xFF, 0xFF, 0xFF,
        b't', 0x00,
    ];

    assert!(matches!(
        decode(&input, 0),
        Err(Error::InvalidSection { section: "rows", .. })
    ));

    // constant-only tables have a zero stride but a real row count
    let table = TableBuilder::new("Flags")
        .column(Column::constant("Enabled", 1i32))
        .row(vec![Value::Int32(1)])
        .row(vec![Value::Int32(1)])
        .row(vec![Value::Int32(1)])
        .build()?;
    let bytes = encode(&table)?;
    assert_eq!(decode(&bytes, 0)?, table);

    Ok(())
}

#[traced_test]
#[test]
fn nan_cells_round_trip() -> Result<()> {
    let table = TableBuilder::new("Params")
        .column(Column::constant("Default", f32::NAN))
        .column(Column::per_row("Gain", DataType::Float64))
        .row(vec![Value::Float32(f32::NAN), Value::Float64(f64::NAN)])
        .row(vec![Value::Float32(f32::NAN), Value::Float64(-0.0)])
        .build()?;

    let decoded = decode(&encode(&table)?, 0)?;
    assert_eq!(decoded, table);

    #[cfg(feature = "serde")]
    {
        let json = serde_json::to_string(&decoded).into_diagnostic()?;
        let parsed: Table = serde_json::from_str(&json).into_diagnostic()?;
        assert_eq!(parsed, table);
    }

    Ok(())
}
