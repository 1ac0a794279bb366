use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use lexp::{InspectConfig, Inspector, NilPolicy, StrPolicy};
use lexpscope::{commands, repl};

#[derive(Parser)]
#[command(name = "lexpscope")]
#[command(about = "Inspect NaN-boxed Lisp values in a cell heap snapshot")]
#[command(
    long_about = "Decodes 64-bit NaN-boxed value words and walks cons structure stored in a \
                  raw dump of the runtime's cell[] array."
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Raw little-endian dump of the cell heap
    #[arg(long)]
    image: PathBuf,

    /// Symbol file (`name = 0xWORD` per line); defaults to <image>.sym if present
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Longest atom name read before giving up
    #[arg(long, default_value_t = 4096)]
    max_string_len: usize,

    /// Deepest nesting below the starting indent, 0 for no limit
    #[arg(long, default_value_t = 256)]
    max_depth: usize,

    /// Most nodes one dump or print may visit, 0 for no limit
    #[arg(long, default_value_t = 100_000)]
    max_nodes: usize,

    /// Follow cons cells without checking for cycles
    #[arg(long)]
    no_cycle_check: bool,

    /// Leave out the NIL that ends each proper list
    #[arg(long)]
    suppress_nil: bool,

    /// Render STR references by ordinal instead of reading their contents
    #[arg(long)]
    str_ordinal: bool,

    /// Re-read the heap for every access
    #[arg(long)]
    no_cache: bool,
}

impl Target {
    fn config(&self) -> InspectConfig {
        InspectConfig {
            max_string_len: self.max_string_len,
            max_depth: Some(self.max_depth).filter(|&d| d > 0),
            max_nodes: Some(self.max_nodes).filter(|&n| n > 0),
            detect_cycles: !self.no_cycle_check,
            nil_policy: if self.suppress_nil {
                NilPolicy::SuppressTerminal
            } else {
                NilPolicy::Show
            },
            str_policy: if self.str_ordinal {
                StrPolicy::Ordinal
            } else {
                StrPolicy::Contents
            },
            cache_reads: !self.no_cache,
        }
    }

    fn inspector(&self) -> Result<Inspector<lexp::SnapshotHost>, String> {
        let host = commands::load_host(&self.image, self.symbols.as_deref())?;
        Ok(Inspector::new(host, self.config()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render one value on one line
    Render {
        #[command(flatten)]
        target: Target,
        /// Symbol name, cell[N], cell[N + 1] or 0x word literal
        expr: String,
    },
    /// Dump cons structure, one line per node
    Dump {
        #[command(flatten)]
        target: Target,
        /// Symbol name, cell[N], cell[N + 1] or 0x word literal
        expr: String,
        /// Starting indent
        indent: Option<usize>,
    },
    /// Print a value in Lisp notation
    Print {
        #[command(flatten)]
        target: Target,
        /// Symbol name, cell[N], cell[N + 1] or 0x word literal
        expr: String,
    },
    /// Build a booted heap image, optionally with definitions
    Build {
        /// Output image file
        #[arg(long)]
        out: PathBuf,
        /// Output symbol file; defaults to <out>.sym
        #[arg(long)]
        symbols_out: Option<PathBuf>,
        /// Heap size in cells
        #[arg(long)]
        cells: Option<usize>,
        /// name=s-expression, bound in the global environment (repeatable)
        #[arg(short, long = "define")]
        definitions: Vec<String>,
    },
    /// Interactive inspector
    Repl {
        #[command(flatten)]
        target: Target,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    let stdout = io::stdout();
    match cli.command {
        Commands::Render { target, expr } => {
            commands::run_render(&target.inspector()?, &expr, &mut stdout.lock())
        }
        Commands::Dump {
            target,
            expr,
            indent,
        } => commands::run_dump(
            &target.inspector()?,
            &expr,
            indent.unwrap_or(0),
            &mut stdout.lock(),
        ),
        Commands::Print { target, expr } => {
            commands::run_print(&target.inspector()?, &expr, &mut stdout.lock())
        }
        Commands::Build {
            out,
            symbols_out,
            cells,
            definitions,
        } => commands::run_build(cells, &definitions, &out, symbols_out.as_deref()),
        Commands::Repl { target } => repl::run(&target.inspector()?),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
