mod cli;
mod commands;

use crate::cli::{Commands, LuascopeCli};
use anyhow::Result;
use logging::LogMode;

fn main() -> Result<()> {
    let cli = LuascopeCli::parse_args();

    let workspace = cli.command.workspace_args();
    let mode = match &workspace.log_file {
        Some(path) => LogMode::File(Some(path.clone())),
        None => LogMode::Cli,
    };
    let _guards = logging::init(mode, workspace.verbose)?;

    match cli.command {
        Commands::Index { workspace, stats } => commands::index::run(&workspace, stats),
        Commands::Search {
            workspace,
            file,
            name,
            mode,
            scope,
        } => commands::query::search(&workspace, &file, &name, mode, scope),
        Commands::Symbols {
            workspace,
            query,
            mode,
        } => commands::query::workspace_symbols(&workspace, &query, mode),
        Commands::Definition { workspace, cursor } => {
            commands::query::definition(&workspace, &cursor)
        }
        Commands::References { workspace, cursor } => {
            commands::query::references(&workspace, &cursor)
        }
        Commands::Complete {
            workspace,
            file,
            input,
            line,
        } => commands::query::complete(&workspace, &file, &input, line),
        Commands::Resolve {
            workspace,
            file,
            path,
        } => commands::query::resolve(&workspace, &file, &path),
        Commands::Outline { workspace, file } => commands::query::outline(&workspace, &file),
    }
}
