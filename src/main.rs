//! Evtarc CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use evtarc::events::EventKind;
use evtarc::file::{read_library_file, write_library_file};
use evtarc::{Config, FormatVersion};

fn usage() -> ! {
    eprintln!("Evtarc v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: evtarc [--config <file>] <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  info <file>                    Show archive version and event counts");
    eprintln!("  dump <file>                    List every event record");
    eprintln!("  convert <in> <out> [version]   Re-encode an archive at another version");
    process::exit(1);
}

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config = match take_config(&mut args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };
    init_logging(&config);

    if args.is_empty() {
        usage();
    }

    let result = match (args[0].as_str(), &args[1..]) {
        ("info", [file]) => show_info(Path::new(file), &config),
        ("dump", [file]) => dump(Path::new(file), &config),
        ("convert", [input, output]) => convert(
            Path::new(input),
            Path::new(output),
            config.codec.version(),
            &config,
        ),
        ("convert", [input, output, version]) => parse_version(version).and_then(|version| {
            convert(Path::new(input), Path::new(output), version, &config)
        }),
        ("info" | "dump" | "convert", _) => usage(),
        (command, _) => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'evtarc' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Strip `--config <file>` from the arguments and load it
fn take_config(args: &mut Vec<String>) -> anyhow::Result<Config> {
    let Some(index) = args.iter().position(|a| a == "--config") else {
        return Ok(Config::default());
    };
    if index + 1 >= args.len() {
        bail!("--config requires a file argument");
    }

    let path = PathBuf::from(args.remove(index + 1));
    args.remove(index);
    Config::from_file(&path).with_context(|| format!("loading {}", path.display()))
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_version(text: &str) -> anyhow::Result<FormatVersion> {
    let version = FormatVersion::new(
        text.parse::<i32>()
            .with_context(|| format!("invalid version {text:?}"))?,
    );
    version.check_supported()?;
    Ok(version)
}

fn show_info(path: &Path, config: &Config) -> anyhow::Result<()> {
    let library = read_library_file(path, &config.limits)
        .with_context(|| format!("reading {}", path.display()))?;

    println!("File:    {}", path.display());
    println!("Library: {}", library.name);
    println!("Version: {}", library.version);
    println!("Events:  {}", library.total_events());
    for kind in EventKind::WIRE_ORDER {
        let count = library.count(kind);
        if count > 0 {
            println!("  {:<10} {count}", kind.label());
        }
    }
    Ok(())
}

fn dump(path: &Path, config: &Config) -> anyhow::Result<()> {
    let library = read_library_file(path, &config.limits)
        .with_context(|| format!("reading {}", path.display()))?;

    for (kind, event) in library.records() {
        let descriptors: Vec<&str> = event.descriptors.iter().map(|d| d.name.as_str()).collect();
        println!(
            "{:<10} #{:<6} {} {:?} [{}]",
            kind.label(),
            event.visible_id,
            event.stamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            event.name,
            descriptors.join(", ")
        );
    }
    Ok(())
}

fn convert(
    input: &Path,
    output: &Path,
    version: FormatVersion,
    config: &Config,
) -> anyhow::Result<()> {
    let mut library = read_library_file(input, &config.limits)
        .with_context(|| format!("reading {}", input.display()))?;

    let from = library.version;
    library.version = version;
    write_library_file(output, &library)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Converted {} events from version {from} to {version}",
        library.total_events()
    );
    Ok(())
}
