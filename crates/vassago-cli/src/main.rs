//! Vassago asset container tool
//!
//! Inspects and unpacks XNB containers.
//!
//! ## Usage
//!
//! ```bash
//! # Header, frame statistics and reader manifest
//! vassago info Content/hero.xnb
//!
//! # Same, as JSON
//! vassago info Content/hero.xnb --json
//!
//! # Write the decompressed payload
//! vassago unpack Content/hero.xnb -o hero.bin
//!
//! # Containers built for another platform tag
//! vassago --config content.json info Content/hero.xnb
//! ```

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use vassago_content::{AssetHeader, ContentConfig, ContentReader, HeaderOptions, TypeReaderRegistry};
use vassago_core::{DecodeStats, Result};

#[derive(Parser, Debug)]
#[command(name = "vassago")]
#[command(author = "Daemoniorum LLC")]
#[command(version)]
#[command(about = "Inspect and unpack XNB asset containers", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Content configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the header, decode statistics and reader manifest
    Info {
        /// Container file
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the decompressed payload to a file
    Unpack {
        /// Container file
        file: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct InfoReport {
    platform: char,
    graphics_profile: String,
    compressed: bool,
    total_size: u32,
    payload_size: u32,
    content_size: u32,
    stats: Option<StatsReport>,
    readers: Vec<ReaderReport>,
    shared_resources: i32,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    frames: usize,
    compressed_bytes: u64,
    decompressed_bytes: u64,
    verbatim_blocks: usize,
    aligned_blocks: usize,
    uncompressed_blocks: usize,
    ratio: f64,
}

impl From<&DecodeStats> for StatsReport {
    fn from(stats: &DecodeStats) -> Self {
        Self {
            frames: stats.frames,
            compressed_bytes: stats.compressed_bytes,
            decompressed_bytes: stats.decompressed_bytes,
            verbatim_blocks: stats.verbatim_blocks,
            aligned_blocks: stats.aligned_blocks,
            uncompressed_blocks: stats.uncompressed_blocks,
            ratio: stats.ratio(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReaderReport {
    name: String,
    version: i32,
    /// A built-in reader is registered under this name.
    known: bool,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Parse the prologue, decode the payload and read the reader manifest.
fn inspect(path: &Path, options: &HeaderOptions, registry: &TypeReaderRegistry) -> Result<InfoReport> {
    let (header, stream) = AssetHeader::prepare(open(path)?, options)?;
    let stats = stream.stats().map(StatsReport::from);

    let mut input = ContentReader::new(stream, registry);
    let readers = input
        .read_raw_manifest()?
        .into_iter()
        .map(|entry| {
            let known = registry.has_factory(entry.reader_name());
            ReaderReport {
                name: entry.name,
                version: entry.version,
                known,
            }
        })
        .collect();
    let shared_resources = input.read_7bit_encoded_int()?;

    Ok(InfoReport {
        platform: header.platform as char,
        graphics_profile: header.graphics_profile.to_string(),
        compressed: header.compressed,
        total_size: header.total_size,
        payload_size: header.payload_size(),
        content_size: header.content_size(),
        stats,
        readers,
        shared_resources,
    })
}

/// Copy the plain payload to `output`, returning its length.
fn unpack(path: &Path, output: &Path, options: &HeaderOptions) -> Result<u64> {
    let (_, mut stream) = AssetHeader::prepare(open(path)?, options)?;
    let mut out = File::create(output)?;
    Ok(io::copy(&mut stream, &mut out)?)
}

fn print_report(path: &Path, report: &InfoReport) {
    println!("{}", path.display());
    println!("  Platform:         {}", report.platform);
    println!("  Profile:          {}", report.graphics_profile);
    println!("  Compressed:       {}", report.compressed);
    println!("  File size:        {} bytes", report.total_size);
    println!("  Payload size:     {} bytes", report.content_size);

    if let Some(stats) = &report.stats {
        println!("  Frames:           {}", stats.frames);
        println!(
            "  Blocks:           {} verbatim, {} aligned, {} uncompressed",
            stats.verbatim_blocks, stats.aligned_blocks, stats.uncompressed_blocks
        );
        println!("  Ratio:            {:.2}x", stats.ratio);
    }

    println!("  Shared resources: {}", report.shared_resources);
    println!("  Type readers:");
    for (index, reader) in report.readers.iter().enumerate() {
        let marker = if reader.known { ' ' } else { '?' };
        println!("    {marker}{:>3}  {} (v{})", index + 1, reader.name, reader.version);
    }
}

fn run(args: Args) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => ContentConfig::from_json_file(path)?,
        None => ContentConfig::default(),
    };
    let options = config.header_options()?;

    match args.command {
        Command::Info { file, json } => {
            let registry = TypeReaderRegistry::with_default_readers();
            let report = inspect(&file, &options, &registry)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&file, &report);
            }
        }
        Command::Unpack { file, output } => {
            let written = unpack(&file, &output, &options)?;
            info!(
                input = %file.display(),
                output = %output.display(),
                bytes = written,
                "unpacked payload"
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {err}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            // Corrupt containers exit with 2, everything else with 1.
            let corrupt = err
                .downcast_ref::<vassago_core::Error>()
                .is_some_and(vassago_core::Error::is_corrupt);
            ExitCode::from(if corrupt { 2 } else { 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vassago_content::readers::{INT32_READER, STRING_READER};
    use vassago_content::testing::{compressed_container, plain_container, ContentWriter};

    fn payload() -> Vec<u8> {
        let mut writer = ContentWriter::new();
        writer
            .manifest(&[
                (STRING_READER, 0),
                (INT32_READER, 0),
                ("Game.Content.LevelReader, Game, Version=1.0.0.0", 2),
            ])
            .encoded_int(3)
            .encoded_int(1)
            .string(&"tile ".repeat(10_000));
        writer.into_bytes()
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["vassago", "--log-level", "debug", "unpack", "a.xnb", "-o", "a.bin"]).unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, Command::Unpack { ref output, .. } if output == Path::new("a.bin")));

        assert!(Args::try_parse_from(["vassago", "unpack", "a.xnb"]).is_err());
    }

    #[test]
    fn test_inspect_compressed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("level.xnb");
        fs::write(&path, compressed_container(1, &payload())).unwrap();

        let registry = TypeReaderRegistry::with_default_readers();
        let report = inspect(&path, &HeaderOptions::default(), &registry).unwrap();
        assert!(report.compressed);
        assert_eq!(report.graphics_profile, "HiDef");
        assert_eq!(report.content_size as usize, payload().len());
        assert_eq!(report.shared_resources, 3);

        let stats = report.stats.as_ref().unwrap();
        assert_eq!(stats.frames, 2);
        assert!(stats.ratio > 1.0);

        let known: Vec<bool> = report.readers.iter().map(|r| r.known).collect();
        assert_eq!(known, vec![true, true, false]);
        assert_eq!(report.readers[2].version, 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["readers"][0]["name"], STRING_READER);
    }

    #[test]
    fn test_unpack_writes_payload() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.bin");
        for (name, file) in [
            ("plain.xnb", plain_container(0, &payload())),
            ("packed.xnb", compressed_container(0, &payload())),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, file).unwrap();
            let written = unpack(&path, &output, &HeaderOptions::default()).unwrap();
            assert_eq!(written as usize, payload().len());
            assert_eq!(fs::read(&output).unwrap(), payload());
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let registry = TypeReaderRegistry::new();
        let err = inspect(&dir.path().join("absent.xnb"), &HeaderOptions::default(), &registry).unwrap_err();
        assert!(!err.is_corrupt());
    }
}
