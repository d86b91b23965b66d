use clap::{Args, Parser, Subcommand};
use lua_indexer::analysis::types::{SearchMode, SearchScope};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "luascope",
    version,
    about = "Static symbol and type resolution for Lua workspaces",
    long_about = "Indexes the Lua files of a workspace and answers definition, reference, \
completion and outline queries against it. Results are printed as JSON."
)]
pub struct LuascopeCli {
    #[command(subcommand)]
    pub command: Commands,
}

impl LuascopeCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Workspace directory to index
    #[arg(long, short = 'w', default_value = ".")]
    pub workspace: PathBuf,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a rolling file instead of STDERR
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// A zero-based cursor position in a workspace file.
#[derive(Args, Debug, Clone)]
pub struct CursorArgs {
    /// File containing the cursor, absolute or relative to the workspace
    #[arg(long)]
    pub file: PathBuf,

    /// Zero-based line
    #[arg(long)]
    pub line: u32,

    /// Zero-based column
    #[arg(long)]
    pub column: u32,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the workspace and report what was found
    Index {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Output full statistics. Optionally specify a file path to save to.
        #[arg(long, value_name = "FILE", num_args = 0..=1, require_equals = true)]
        stats: Option<Option<PathBuf>>,
    },
    /// Search the symbols of one file by name
    Search {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        name: String,

        /// exact, prefix or fuzzy
        #[arg(long, default_value = "prefix")]
        mode: SearchMode,

        /// all, global or local
        #[arg(long, default_value = "all")]
        scope: SearchScope,
    },
    /// Search every symbol of every workspace file
    Symbols {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[arg(long)]
        query: String,

        /// exact, prefix or fuzzy
        #[arg(long, default_value = "fuzzy")]
        mode: SearchMode,
    },
    /// Find the definition of the name under the cursor
    Definition {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[command(flatten)]
        cursor: CursorArgs,
    },
    /// List the references of the definition under the cursor
    References {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[command(flatten)]
        cursor: CursorArgs,
    },
    /// Complete a partially typed access path such as `player:mo`
    Complete {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[arg(long)]
        file: PathBuf,

        /// Text before the cursor; `---` asks for a comment template
        #[arg(long, allow_hyphen_values = true)]
        input: String,

        /// Zero-based line of the input; required for `---` comment completion
        #[arg(long)]
        line: Option<u32>,
    },
    /// Resolve a dotted access path through tags, metatables and requires
    Resolve {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        path: String,
    },
    /// Print the symbol tree of a file
    Outline {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[arg(long)]
        file: PathBuf,
    },
}

impl Commands {
    pub fn workspace_args(&self) -> &WorkspaceArgs {
        match self {
            Commands::Index { workspace, .. }
            | Commands::Search { workspace, .. }
            | Commands::Symbols { workspace, .. }
            | Commands::Definition { workspace, .. }
            | Commands::References { workspace, .. }
            | Commands::Complete { workspace, .. }
            | Commands::Resolve { workspace, .. }
            | Commands::Outline { workspace, .. } => workspace,
        }
    }
}
