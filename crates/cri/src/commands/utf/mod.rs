pub mod build;
pub mod diff;
pub mod dump;
pub mod json;

#[derive(clap::Subcommand)]
pub enum UtfCommands {
    /// Print a table as JSON or as an outline of its nested tables
    Dump(dump::DumpArgs),
    /// Build a table from its JSON form
    Build(build::BuildArgs),
    /// Compare two tables
    Diff(diff::DiffArgs),
}

impl UtfCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            UtfCommands::Dump(dump) => dump.handle(),
            UtfCommands::Build(build) => build.handle(),
            UtfCommands::Diff(diff) => diff.handle(),
        }
    }
}
