//! JSON form of a table with nested tables expanded in place
//!
//! A per-row data cell holding a table is written as `{"Table": {...}}` instead of
//! `{"Data": [...]}` and encoded back into a blob when the JSON is built.

use cri_utf::{StorageKind, Table, UtfWriterOptions};
use miette::{miette, Context, IntoDiagnostic, Result};
use serde_json::{json, Map, Value as Json};
use tracing::{debug, warn};

/// Tables nested deeper than this stay data blobs
pub const MAX_DEPTH: usize = 5;

const TABLE_KEY: &str = "Table";

fn rows_mut(json: &mut Json) -> Option<&mut Vec<Json>> {
    json.get_mut("rows").and_then(Json::as_array_mut)
}

fn expand(table: &Table, depth: usize) -> Result<Json> {
    let mut json = serde_json::to_value(table).into_diagnostic()?;
    if depth >= MAX_DEPTH {
        return Ok(json);
    }

    let rows = rows_mut(&mut json).ok_or_else(|| miette!("table {} has no rows", table.name()))?;
    for (row, (cells, slots)) in table.rows().iter().zip(rows.iter_mut()).enumerate() {
        let Some(slots) = slots.as_array_mut() else {
            continue;
        };

        for ((column, value), slot) in table.columns().iter().zip(cells.iter()).zip(slots) {
            if column.kind() != StorageKind::PerRow {
                continue;
            }

            match value.nested_table() {
                Some(Ok(nested)) => {
                    debug!(depth, "expanding {}[{row}]", column.name());
                    let mut wrapper = Map::new();
                    wrapper.insert(TABLE_KEY.to_owned(), expand(&nested, depth + 1)?);
                    *slot = Json::Object(wrapper);
                }
                Some(Err(error)) => warn!(%error, "keeping {}[{row}] as data", column.name()),
                None => {}
            }
        }
    }

    Ok(json)
}

/// Serializes `table`, expanding nested tables up to [`MAX_DEPTH`] levels.
pub fn to_json(table: &Table) -> Result<Json> {
    expand(table, 0)
}

fn collapse(mut json: Json, options: UtfWriterOptions, depth: usize) -> Result<Table> {
    if let Some(rows) = rows_mut(&mut json) {
        for cell in rows.iter_mut().filter_map(Json::as_array_mut).flatten() {
            let Some(nested) = cell.get_mut(TABLE_KEY) else {
                continue;
            };
            if depth >= MAX_DEPTH {
                return Err(miette!("tables nest deeper than {MAX_DEPTH} levels"));
            }

            let table = collapse(nested.take(), options, depth + 1)?;
            let bytes = cri_utf::encode_with(&table, options)
                .context(format!("encoding nested table {}", table.name()))?;
            *cell = json!({ "Data": bytes });
        }
    }

    serde_json::from_value(json).into_diagnostic()
}

/// Reads a table from its JSON form, encoding expanded nested tables with `options`.
pub fn from_json(json: Json, options: UtfWriterOptions) -> Result<Table> {
    collapse(json, options, 0)
}

#[cfg(test)]
mod test {
    use cri_utf::{UtfWriterOptions, Value};
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    use super::{from_json, to_json};

    fn fixture(name: &str) -> Result<cri_utf::Table> {
        let path = format!("{}/../cri_utf/resources/{name}", env!("CARGO_MANIFEST_DIR"));
        let bytes = std::fs::read(path).into_diagnostic()?;
        Ok(cri_utf::decode(&bytes, 0)?)
    }

    #[test]
    fn nested_tables_round_trip() -> Result<()> {
        let table = fixture("cue_sheet.utf")?;
        let cue = fixture("cue.utf")?;

        let json = to_json(&table)?;
        assert_eq!(json["rows"][0][4]["Table"]["name"], "Cue");
        assert_eq!(json["rows"][1][4], serde_json::json!({ "Data": [] }));

        let text = serde_json::to_string_pretty(&json).into_diagnostic()?;
        let parsed = serde_json::from_str(&text).into_diagnostic()?;
        let rebuilt = from_json(
            parsed,
            UtfWriterOptions::builder().data_alignment(0x20).build(),
        )?;

        let nested = rebuilt
            .get(0, "CueTable")
            .and_then(Value::nested_table)
            .transpose()?;
        assert_eq!(nested, Some(cue));

        assert_eq!(rebuilt.columns(), table.columns());
        for (before, after) in table.rows().iter().zip(rebuilt.rows()) {
            for (column, (left, right)) in table.columns().iter().zip(before.iter().zip(after.iter())) {
                if column.name() != "CueTable" {
                    assert_eq!(left, right);
                }
            }
        }

        Ok(())
    }

    #[test]
    fn plain_json_still_builds() -> Result<()> {
        let table = fixture("cue.utf")?;

        let json = serde_json::to_value(&table).into_diagnostic()?;
        assert_eq!(from_json(json, UtfWriterOptions::default())?, table);

        Ok(())
    }
}
