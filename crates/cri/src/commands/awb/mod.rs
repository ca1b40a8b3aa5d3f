pub mod extract;
pub mod list;
pub mod pack;

#[derive(clap::Subcommand)]
pub enum AwbCommands {
    /// List the subfiles of an AWB archive
    List(list::ListArgs),
    /// Extract an AWB archive into a directory
    Extract(extract::ExtractArgs),
    /// Pack a directory into an AWB archive
    Pack(pack::PackArgs),
}

impl AwbCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            AwbCommands::List(list) => list.handle(),
            AwbCommands::Extract(extract) => extract.handle(),
            AwbCommands::Pack(pack) => pack.handle(),
        }
    }
}
