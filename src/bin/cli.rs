//! CaskKV CLI
//!
//! Interactive prompt over a local database directory.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use caskkv::protocol::{Command, Response};
use caskkv::{Config, Engine, OpenMode};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// CaskKV CLI
#[derive(Parser, Debug)]
#[command(name = "caskkv-cli")]
#[command(about = "Interactive shell for a CaskKV database")]
#[command(version)]
struct Args {
    /// Data directory (created if missing unless --read-only)
    #[arg(short, long, default_value = "./caskkv_data")]
    data_dir: PathBuf,

    /// Segment rotation threshold in bytes
    #[arg(short = 's', long, default_value_t = caskkv::config::DEFAULT_MAX_SEGMENT_SIZE)]
    segment_size: u64,

    /// fsync every write before acknowledging it
    #[arg(long)]
    sync: bool,

    /// Open without write access
    #[arg(long)]
    read_only: bool,
}

impl Args {
    fn mode(&self) -> OpenMode {
        let mut mode = OpenMode::READ;
        if !self.read_only {
            mode |= OpenMode::WRITE | OpenMode::CREATE;
        }
        if self.sync {
            mode |= OpenMode::SYNC_ON_PUT;
        }
        mode
    }
}

fn main() {
    // Logs go to stderr so they never interleave with command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,caskkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .mode(args.mode())
        .max_segment_size(args.segment_size)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine) {
        tracing::error!("I/O error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close database: {}", e);
        std::process::exit(1);
    }
}

/// Read-eval-print loop until EOF or `quit`
fn run(engine: &Engine) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, ">> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(Command::Quit) => return Ok(()),
            Ok(command) => command,
            Err(e) => {
                writeln!(stdout, "[ERROR] {}", e)?;
                continue;
            }
        };

        let response = Response::from(engine.execute(command));
        writeln!(stdout, "{}", response)?;
    }
}
