//! Packson CLI - Command-line tool for the Packson binary JSON codec
//!
//! This binary provides command-line interfaces for:
//! - encode: JSON text → packson stream
//! - decode: packson stream → JSON text
//! - inspect: string table, dictionary and size statistics
//!
//! Every path argument accepts `-` for stdin/stdout.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use packson_codec::{decode, encode_with, stats, EncodeOptions, StreamStats};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packson")]
#[command(about = "Compact binary codec for JSON values")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON document into a packson stream
    ///
    /// Examples:
    ///   packson encode data.json -o data.pson
    ///   cat data.json | packson encode - > data.pson
    Encode {
        /// Input JSON file, or `-` for stdin
        input: PathBuf,
        /// Output file, or `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
        /// Output buffer growth granularity in bytes
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Decode a packson stream back into JSON
    Decode {
        /// Input packson file, or `-` for stdin
        input: PathBuf,
        /// Output file, or `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Report string table and dictionary statistics
    ///
    /// JSON input is encoded first so the report can include the size ratio.
    Inspect {
        /// Input file (packson stream or JSON), or `-` for stdin
        input: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InspectFormat {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encode {
            input,
            output,
            chunk_size,
        } => {
            handle_encode(&input, &output, chunk_size)?;
        }
        Commands::Decode {
            input,
            output,
            pretty,
        } => {
            handle_decode(&input, &output, pretty)?;
        }
        Commands::Inspect { input, format } => {
            handle_inspect(&input, format)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if is_stdio(path) {
        io::stdin().lock().read_to_end(&mut data)?;
    } else {
        File::open(path)?.read_to_end(&mut data)?;
    }
    Ok(data)
}

fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        Ok(Box::new(BufWriter::new(io::stdout().lock())))
    } else {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn display_path(path: &Path) -> String {
    if is_stdio(path) {
        "<stdio>".to_string()
    } else {
        path.display().to_string()
    }
}

fn handle_encode(
    input: &Path,
    output: &Path,
    chunk_size: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let text = read_input(input)?;
    let value: Value = serde_json::from_slice(&text)?;

    let opts = chunk_size
        .map(EncodeOptions::with_chunk_size)
        .unwrap_or_default();
    let bytes = encode_with(&value, &opts)?;

    let mut writer = open_output(output)?;
    writer.write_all(&bytes)?;
    writer.flush()?;

    let elapsed = start.elapsed();
    debug!(chunk_size = opts.chunk_size, "encode finished");
    report_encode_summary(output, text.len(), bytes.len(), elapsed)?;
    Ok(())
}

fn handle_decode(input: &Path, output: &Path, pretty: bool) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let bytes = read_input(input)?;
    let value = decode(&bytes)?;

    let mut writer = open_output(output)?;
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &value)?;
    } else {
        serde_json::to_writer(&mut writer, &value)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    report_decode_summary(output, bytes.len(), start.elapsed())?;
    Ok(())
}

fn report_encode_summary(
    output: &Path,
    json_bytes: usize,
    encoded_bytes: usize,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = io::stderr().lock();
    writeln!(
        &mut stderr,
        "Encoded to {} (json bytes: {}, packson bytes: {}, ratio: {:.3}, elapsed: {:.2?})",
        display_path(output),
        json_bytes,
        encoded_bytes,
        size_ratio(encoded_bytes, json_bytes),
        elapsed
    )?;
    Ok(())
}

fn report_decode_summary(
    output: &Path,
    encoded_bytes: usize,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = io::stderr().lock();
    writeln!(
        &mut stderr,
        "Decoded to {} (packson bytes: {}, elapsed: {:.2?})",
        display_path(output),
        encoded_bytes,
        elapsed
    )?;
    Ok(())
}

fn size_ratio(encoded: usize, json: usize) -> f64 {
    encoded as f64 / json.max(1) as f64
}

#[derive(Debug, Clone, Serialize)]
struct InspectReport {
    encoded_bytes: usize,
    json_bytes: Option<usize>,
    ratio: Option<f64>,
    table_bytes: usize,
    body_bytes: usize,
    strings: usize,
    string_references: usize,
    blob_bytes: usize,
    array_headers: usize,
    object_entries: usize,
    arrays: usize,
    objects: usize,
}

impl InspectReport {
    fn new(stats: &StreamStats, encoded_bytes: usize, json_bytes: Option<usize>) -> Self {
        Self {
            encoded_bytes,
            json_bytes,
            ratio: json_bytes.map(|json| size_ratio(encoded_bytes, json)),
            table_bytes: stats.table_len,
            body_bytes: stats.body_len,
            strings: stats.strings,
            string_references: stats.references,
            blob_bytes: stats.blob_len,
            array_headers: stats.headers,
            object_entries: stats.entries,
            arrays: stats.arrays,
            objects: stats.objects,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![("Encoded bytes", self.encoded_bytes.to_string())];
        if let Some(json) = self.json_bytes {
            rows.push(("JSON bytes", json.to_string()));
        }
        if let Some(ratio) = self.ratio {
            rows.push(("Ratio", format!("{ratio:.3}")));
        }
        rows.extend([
            ("String table bytes", self.table_bytes.to_string()),
            ("Body bytes", self.body_bytes.to_string()),
            ("Strings", self.strings.to_string()),
            ("String references", self.string_references.to_string()),
            ("String blob bytes", self.blob_bytes.to_string()),
            ("Array headers", self.array_headers.to_string()),
            ("Object entries", self.object_entries.to_string()),
            ("Arrays", self.arrays.to_string()),
            ("Objects", self.objects.to_string()),
        ]);
        rows
    }
}

/// Build the report for `data`, encoding it first when it is JSON text
fn build_report(data: &[u8]) -> Result<InspectReport, Box<dyn Error>> {
    match serde_json::from_slice::<Value>(data) {
        Ok(value) => {
            debug!("inspect input parsed as JSON");
            let encoded = encode_with(&value, &EncodeOptions::default())?;
            let stats = stats(&encoded)?;
            Ok(InspectReport::new(&stats, encoded.len(), Some(data.len())))
        }
        Err(_) => {
            let stats = stats(data)?;
            Ok(InspectReport::new(&stats, data.len(), None))
        }
    }
}

fn handle_inspect(input: &Path, format: InspectFormat) -> Result<(), Box<dyn Error>> {
    let data = read_input(input)?;
    let report = build_report(&data)?;

    let mut stdout = io::stdout().lock();
    match format {
        InspectFormat::Table => print_inspect_table(&mut stdout, &report)?,
        InspectFormat::Json => print_inspect_json(&mut stdout, &report)?,
    }
    Ok(())
}

fn print_inspect_table(
    writer: &mut dyn Write,
    report: &InspectReport,
) -> Result<(), Box<dyn Error>> {
    writeln!(writer, "Statistic\tValue")?;
    for (name, value) in report.rows() {
        writeln!(writer, "{name}\t{value}")?;
    }
    Ok(())
}

fn print_inspect_json(
    writer: &mut dyn Write,
    report: &InspectReport,
) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}
