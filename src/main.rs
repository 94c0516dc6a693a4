use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use streambf::engine::DEFAULT_COMPACT_THRESHOLD;
use streambf::instruction::disassemble;
use streambf::tape::DEFAULT_CELLS;
use streambf::{Engine, EngineConfig, EofPolicy, Error, Result};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "streambf", about = "Streaming interpreter for eight-instruction tape programs")]
struct Cli {
    /// Path to the program source.
    program: PathBuf,

    /// Initial number of tape cells; the tape doubles whenever it runs out.
    #[arg(long, default_value_t = DEFAULT_CELLS)]
    cells: usize,

    /// Discard consumed instructions once this many have run outside any loop.
    #[arg(long, default_value_t = DEFAULT_COMPACT_THRESHOLD)]
    compact_threshold: usize,

    /// Keep every instruction read from the source.
    #[arg(long)]
    no_compact: bool,

    /// What `,` stores at end of input (unchanged, zero, max).
    #[arg(long, default_value = "unchanged")]
    eof: EofPolicy,

    /// Print run statistics to stderr when the program ends.
    #[arg(long)]
    stats: bool,

    /// Print the program's instructions with their locations instead of running it.
    #[arg(long)]
    disassemble: bool,
}

/// Log to stderr so stdout carries only program output. `RUST_LOG`
/// overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.disassemble {
        let text = std::fs::read(&cli.program).map_err(|source| open_error(cli, source))?;
        print!("{}", disassemble(&text));
        return Ok(());
    }

    let source = File::open(&cli.program).map_err(|source| open_error(cli, source))?;
    let config = EngineConfig {
        initial_cells: cli.cells,
        compact_threshold: (!cli.no_compact).then_some(cli.compact_threshold),
        eof: cli.eof,
    };

    let mut engine = Engine::new(source, io::stdin().lock(), io::stdout().lock(), config);
    let stats = engine.run()?;
    if cli.stats {
        eprintln!("{stats}");
    }
    Ok(())
}

fn open_error(cli: &Cli, source: io::Error) -> Error {
    Error::Open {
        path: cli.program.clone(),
        source,
    }
}
