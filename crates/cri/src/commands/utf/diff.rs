use clap::{Args, ValueEnum};
use cri_utf::{Column, Table, Value};
use itertools::Itertools;
use miette::{miette, Context, Result};
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use std::{fmt::Display, path::PathBuf};

use crate::commands::read_input;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// Report which cells differ
    #[default]
    Semantic,
    /// Also show inline changes inside differing strings
    Full,
}

#[derive(Debug, PartialEq)]
enum Change {
    Added(String, String),
    Removed(String, String),
    Comparison(String, String, String),
    Context(Vec<String>),
    Modified(String, String, Vec<Change>, Vec<Change>),
}

impl Change {
    fn modified(key: &str, value: impl Into<String>) -> Change {
        Change::Modified(key.into(), value.into(), Vec::new(), Vec::new())
    }

    pub fn with_children(&mut self, children: Vec<Change>) -> Result<()> {
        match self {
            Change::Modified(_, _, vec, _) => {
                vec.extend(children);
                Ok(())
            }
            _ => Err(miette!("tried to add children to an addition or removal")),
        }
    }

    pub fn with_related(&mut self, related: Vec<Change>) -> Result<()> {
        match self {
            Change::Modified(_, _, _, vec) => {
                vec.extend(related);
                Ok(())
            }
            _ => Err(miette!("tried to add related to an addition or removal")),
        }
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(_, v) => {
                writeln!(f, "✅ {}", v.green())
            }
            Change::Removed(_, v) => {
                writeln!(f, "❌ {}", v.red())
            }
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Context(values) => {
                writeln!(f, "{}", values.iter().map(|l| format!(" {l}")).join("\n"))
            }
            Change::Modified(_, v, children, related) => {
                let mut txt_final = related.iter().map(|c| c.to_string()).join("");

                let mut current_key = String::new();
                for c in children {
                    let key = match c {
                        Change::Added(key, _) => format!("* {} added:\n", key),
                        Change::Removed(key, _) => format!("* {} removed:\n", key),
                        Change::Modified(key, _, _, _) => format!("* {} modified:\n", key),
                        _ => current_key.clone(),
                    };

                    if current_key != key {
                        txt_final.push_str(&key);
                        current_key = key;
                    }

                    txt_final.push_str(&c.to_string().lines().map(|l| format!("  {l}\n")).join(""));
                }

                writeln!(f, "🔃 {}", v.blue())?;
                writeln!(
                    f,
                    "{}",
                    txt_final
                        .lines()
                        .filter(|l| l.trim().len() > 1)
                        .map(|l| "  ".to_string() + l)
                        .join("\n")
                )
            }
        }
    }
}

fn describe(column: &Column) -> String {
    match column.storage().constant() {
        Some(constant) => format!("{} {} = {}", column.data_type(), column.kind(), constant),
        None => format!("{} {}", column.data_type(), column.kind()),
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input table file
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input table file
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t = Mode::Semantic)]
    mode: Mode,
}

impl DiffArgs {
    fn inline_changes(&self, old: &str, new: &str) -> Vec<String> {
        let diff = TextDiff::from_chars(old, new);
        let mut comparison = Vec::new();
        for op in diff.ops().iter() {
            for change in diff.iter_inline_changes(op) {
                let mut context = String::new();
                for (emphasized, value) in change.iter_strings_lossy() {
                    if emphasized {
                        if change.tag() == ChangeTag::Insert {
                            context.push_str(&format!("{}", value.green().underline()));
                        } else {
                            context.push_str(&format!("{}", value.red().underline()));
                        }
                    } else {
                        context.push_str(&format!("{}", value.dimmed()));
                    }
                }
                comparison.push(context);
            }
        }
        comparison
    }

    fn handle_cell(&self, name: &str, left: &Value, right: &Value) -> Result<Vec<Change>> {
        if left == right {
            return Ok(Vec::new());
        }

        if let (Some(l), Some(r)) = (left.nested_table(), right.nested_table()) {
            let l = l.context(format!("decoding left {name}"))?;
            let r = r.context(format!("decoding right {name}"))?;
            return Ok(self.handle_table(name, &l, &r)?.into_iter().collect());
        }

        let mut result = vec![Change::Comparison(name.into(), left.to_string(), right.to_string())];
        if let (Mode::Full, Some(l), Some(r)) = (self.mode, left.as_str(), right.as_str()) {
            result.push(Change::Context(self.inline_changes(l, r)));
        }
        Ok(result)
    }

    fn handle_table(&self, name: &str, left: &Table, right: &Table) -> Result<Option<Change>> {
        let mut result: Option<Change> = None;

        let mut related = Vec::new();
        if left.name() != right.name() {
            related.push(Change::Comparison(
                "name".into(),
                left.name().into(),
                right.name().into(),
            ));
        }
        if left.version() != right.version() {
            related.push(Change::Comparison(
                "version".into(),
                format!("{:#06x}", left.version()),
                format!("{:#06x}", right.version()),
            ));
        }
        if left.row_count() != right.row_count() {
            related.push(Change::Comparison(
                "rows".into(),
                left.row_count().to_string(),
                right.row_count().to_string(),
            ));
        }
        if !related.is_empty() {
            result
                .get_or_insert(Change::modified("tables", name))
                .with_related(related)?;
        }

        let columns_added: Vec<Change> = right
            .columns()
            .iter()
            .filter(|c| left.column_index(c.name()).is_none())
            .map(|c| Change::Added("columns".into(), format!("{}: {}", c.name(), describe(c))))
            .collect();

        let columns_removed: Vec<Change> = left
            .columns()
            .iter()
            .filter(|c| right.column_index(c.name()).is_none())
            .map(|c| Change::Removed("columns".into(), format!("{}: {}", c.name(), describe(c))))
            .collect();

        let shared = left
            .columns()
            .iter()
            .filter_map(|l| Some((l, &right.columns()[right.column_index(l.name())?])))
            .unique_by(|(l, _)| l.name().to_owned())
            .collect::<Vec<_>>();

        let columns_modified: Vec<Change> = shared
            .iter()
            .filter(|(l, r)| describe(l) != describe(r))
            .map(|(l, r)| -> Result<Change> {
                let mut change = Change::modified("columns", l.name());
                change.with_related(vec![Change::Comparison(
                    "schema".into(),
                    describe(l),
                    describe(r),
                )])?;
                Ok(change)
            })
            .collect::<Result<_>>()?;

        for changes in [columns_added, columns_removed, columns_modified] {
            if !changes.is_empty() {
                result
                    .get_or_insert(Change::modified("tables", name))
                    .with_children(changes)?;
            }
        }

        for row in 0..left.row_count().min(right.row_count()) {
            let mut cells = Vec::new();
            for (column, _) in &shared {
                let (Some(l), Some(r)) = (left.get(row, column.name()), right.get(row, column.name()))
                else {
                    continue;
                };
                cells.extend(self.handle_cell(&format!("{}[{row}]", column.name()), l, r)?);
            }

            if !cells.is_empty() {
                let (nested, values): (Vec<_>, Vec<_>) = cells
                    .into_iter()
                    .partition(|c| matches!(c, Change::Modified(..)));

                let mut change = Change::modified("rows", format!("row {row}"));
                change.with_related(values)?;
                change.with_children(nested)?;

                result
                    .get_or_insert(Change::modified("tables", name))
                    .with_children(vec![change])?;
            }
        }

        Ok(result)
    }

    pub fn handle(&self) -> Result<()> {
        let l = read_input(&self.left)?;
        let left = cri_utf::decode(&l, 0).context(format!("reading {}", self.left.display()))?;

        let r = read_input(&self.right)?;
        let right = cri_utf::decode(&r, 0).context(format!("reading {}", self.right.display()))?;

        let difference = self.handle_table(&self.left.to_string_lossy(), &left, &right)?;

        if let Some(d) = difference {
            println!("{}", d);
        }

        Ok(())
    }
}
