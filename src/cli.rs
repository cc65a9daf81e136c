use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "docsift",
    about = "Crawl toctree documentation into a searchable index"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Task list to use instead of <data-dir>/tasks.json
    #[arg(long, global = true)]
    pub tasks_file: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Default log level when `DOCSIFT_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl sources and write each task's snapshot
    Build(BuildArgs),
    /// Merge task snapshots into the search index
    Refresh(RefreshArgs),
    /// Search the merged index
    Search(SearchArgs),
    /// List configured tasks
    Tasks(TasksArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Build --

#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Only build these topics (comma separated)
    #[arg(long = "tasks", value_delimiter = ',')]
    pub topics: Option<Vec<String>>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Refresh --

#[derive(Debug, Parser)]
pub struct RefreshArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search terms
    pub terms: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Return every match
    #[arg(long)]
    pub all: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// Result limit after applying `--all`.
    pub fn limit(&self, total: usize) -> usize {
        if self.all { total } else { self.count }
    }
}

// -- Tasks --

#[derive(Debug, Parser)]
pub struct TasksArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docsift",
            &mut std::io::stdout(),
        );
    }
}
