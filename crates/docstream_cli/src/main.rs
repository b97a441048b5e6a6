//! `docstream` command line entry point.
//!
//! # Responsibility
//! - `write`: read JSON-lines record events from stdin into a store.
//! - `read`: run query lines from stdin and print decoded events as JSON
//!   lines on stdout.

use clap::{Parser, Subcommand};
use docstream_core::{
    default_log_level, init_logging, CodecError, CodecResult, DocumentReader, DocumentWriter,
    SqliteDocumentStore, StoreConfig, StoreLocation, StreamEvent, StreamReceiver,
};
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "docstream", version, about = "Store record event streams as documents")]
struct Cli {
    /// Store URI, e.g. `sqlite:///var/lib/docstream/store.db?collection=records`.
    /// Required for `write`; `read` defaults to an empty in-memory store.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Log level (trace|debug|info|warn|error). Defaults by build mode.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Save JSON-lines events from stdin, one document per record.
    Write,
    /// Run `[field:]value` queries from stdin and print matched records.
    Read,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, &log_dir.to_string_lossy())?;
    }

    let config = store_config(cli.store.as_deref(), cli.command)?;
    let store = SqliteDocumentStore::open(&config).map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok command={:?} collection={}",
        cli.command,
        store.collection()
    );

    let stdin = io::stdin();
    match cli.command {
        Command::Write => write_events(stdin.lock(), store),
        Command::Read => read_queries(stdin.lock(), store, io::stdout().lock()),
    }
}

/// Resolves the store for `command`.
///
/// `write` must name its store; writing into a memory store is allowed but
/// warned about since every record is lost on exit.
fn store_config(uri: Option<&str>, command: Command) -> Result<StoreConfig, String> {
    let config = match (uri, command) {
        (Some(uri), _) => StoreConfig::parse(uri).map_err(|err| err.to_string())?,
        (None, Command::Read) => StoreConfig::in_memory(),
        (None, Command::Write) => {
            return Err("`write` requires --store, e.g. --store sqlite:///path/store.db".to_string())
        }
    };

    if command == Command::Write && config.location == StoreLocation::Memory {
        warn!(
            "event=cli_start module=cli status=warning command=Write error_code=memory_store"
        );
        eprintln!("warning: writing to an in-memory store; records are discarded on exit");
    }
    Ok(config)
}

fn write_events(input: impl BufRead, store: SqliteDocumentStore) -> Result<(), String> {
    let mut writer = DocumentWriter::new(store);
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|err| format!("failed to read stdin: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: StreamEvent = serde_json::from_str(&line)
            .map_err(|err| format!("line {}: invalid event: {err}", index + 1))?;
        event
            .send_to(&mut writer)
            .map_err(|err| format!("line {}: {err}", index + 1))?;
    }
    writer.close_stream().map_err(|err| err.to_string())
}

fn read_queries<W: Write>(
    input: impl BufRead,
    store: SqliteDocumentStore,
    output: W,
) -> Result<(), String> {
    let mut reader = DocumentReader::new(store, JsonLinesPrinter { output });
    for line in input.lines() {
        let line = line.map_err(|err| format!("failed to read stdin: {err}"))?;
        if line.trim().is_empty() {
            continue;
        }
        reader
            .process(&line)
            .map_err(|err| format!("query `{line}`: {err}"))?;
    }
    reader.close_stream().map_err(|err| err.to_string())
}

/// Receiver printing each event as one JSON line.
struct JsonLinesPrinter<W: Write> {
    output: W,
}

impl<W: Write> JsonLinesPrinter<W> {
    fn print(&mut self, event: StreamEvent) -> CodecResult<()> {
        let line =
            serde_json::to_string(&event).map_err(|err| CodecError::Receiver(err.to_string()))?;
        writeln!(self.output, "{line}").map_err(|err| CodecError::Receiver(err.to_string()))
    }
}

impl<W: Write> StreamReceiver for JsonLinesPrinter<W> {
    fn start_record(&mut self, id: Option<&str>) -> CodecResult<()> {
        self.print(StreamEvent::StartRecord(id.map(str::to_string)))
    }

    fn start_entity(&mut self, name: &str) -> CodecResult<()> {
        self.print(StreamEvent::start_entity(name))
    }

    fn literal(&mut self, name: &str, value: &str) -> CodecResult<()> {
        self.print(StreamEvent::literal(name, value))
    }

    fn end_entity(&mut self) -> CodecResult<()> {
        self.print(StreamEvent::EndEntity)
    }

    fn end_record(&mut self) -> CodecResult<()> {
        self.print(StreamEvent::EndRecord)
    }

    fn close_stream(&mut self) -> CodecResult<()> {
        self.output
            .flush()
            .map_err(|err| CodecError::Receiver(err.to_string()))
    }
}
