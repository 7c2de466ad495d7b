mod commands;
mod logging;

use camino::Utf8PathBuf;
use clap::{Args, Parser};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Grammar-driven incremental parsing from the command line.
#[derive(Parser)]
#[command(name = "thicket", version)]
enum Options {
    /// Builds a parse table from a JSON grammar definition.
    Generate {
        grammar: Utf8PathBuf,
        /// Where to write the table. Defaults to stdout.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Parses a file and prints its tree and syntax errors.
    Parse {
        table: Utf8PathBuf,
        path: Utf8PathBuf,
        /// Print parser counters to stderr.
        #[arg(long)]
        stats: bool,
        /// Print nothing but diagnostics.
        #[arg(short, long)]
        quiet: bool,
        #[command(flatten)]
        parser: ParserArgs,
    },
    /// Replaces a byte range of a file and reparses it incrementally.
    Edit {
        table: Utf8PathBuf,
        path: Utf8PathBuf,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        /// Replacement text.
        #[arg(long)]
        text: String,
        #[command(flatten)]
        parser: ParserArgs,
    },
    /// Prints the captures of a query against a file.
    Query {
        table: Utf8PathBuf,
        path: Utf8PathBuf,
        pattern: String,
        #[command(flatten)]
        parser: ParserArgs,
    },
}

/// Parser settings shared by every subcommand that parses.
#[derive(Args)]
struct ParserArgs {
    /// JSON file with parser options. Flags override it.
    #[arg(long)]
    options: Option<Utf8PathBuf>,
    #[arg(long)]
    max_versions: Option<usize>,
    #[arg(long)]
    max_steps: Option<u64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    match Options::parse() {
        Options::Generate { grammar, output } => commands::generate(&grammar, output.as_deref()),
        Options::Parse { table, path, stats, quiet, parser } => {
            commands::parse(&table, &path, &parser, stats, quiet)
        }
        Options::Edit { table, path, start, end, text, parser } => {
            commands::edit(&table, &path, start..end, &text, &parser)
        }
        Options::Query { table, path, pattern, parser } => {
            commands::query(&table, &path, &pattern, &parser)
        }
    }
}
