use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use serde_json::Value;

/// Transform JSON read from standard input through a jsonmap program.
#[derive(ClapParser, Debug)]
#[command(name = "jsonmap", version, about = "Transform JSON through a jsonmap program")]
struct Cli {
    /// Path to the jsonmap program file.
    program_file: PathBuf,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Raise the log level (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Reads and parses the complete JSON input from standard input.
fn read_input() -> Result<Value> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read JSON input from stdin")?;
    serde_json::from_str(&text).context("failed to parse JSON input from stdin")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let program_text = fs::read_to_string(&cli.program_file)
        .with_context(|| format!("failed to read program file {:?}", cli.program_file))?;
    let input = read_input()?;

    log::info!("translating input through {:?}", cli.program_file);
    let output = jsonmap::translate(&program_text, input).map_err(|err| {
        log::error!("translation failed: {err}");
        anyhow::Error::from(err)
    })?;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("failed to serialize output JSON")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{rendered}").context("failed to write output")?;
    Ok(())
}
