//! Convert a raw ApRES file to the hierarchical container format

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use apres_rs::{file_to_dataset, ApresFile, DecodeMode, StreamOptions, CONTAINER_SUFFIX};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let (positional, fs_opts) = parse_args(&args)?;

    if positional.is_empty() {
        eprintln!("Usage: {} [-o FS_OPTS_JSON] <infile.dat> [outfile{}]", args[0], CONTAINER_SUFFIX);
        eprintln!("Example: {} survey.dat", args[0]);
        std::process::exit(1);
    }

    let infile = &positional[0];
    let outfile = positional
        .get(1)
        .cloned()
        .unwrap_or_else(|| with_suffix(infile, CONTAINER_SUFFIX));

    tracing::info!("Converting {} to {}", infile, outfile);

    let stream = apres_rs::open_stream(infile, &fs_opts)?;
    let file = ApresFile::read(BufReader::new(stream), DecodeMode::Forgiving)?;
    tracing::info!("Read {} bursts", file.len());

    let history = args.join(" ");
    let dataset = file_to_dataset(&file, Some(&history))?;

    let mut writer = BufWriter::new(File::create(&outfile)?);
    dataset.to_writer(&mut writer)?;
    writer.flush()?;

    tracing::info!("Wrote {}", outfile);
    Ok(())
}

fn parse_args(args: &[String]) -> anyhow::Result<(Vec<String>, StreamOptions)> {
    let mut positional = Vec::new();
    let mut fs_opts = StreamOptions::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--fs-opts" => {
                i += 1;
                let raw = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("missing value for -o"))?;
                fs_opts = serde_json::from_str(raw)?;
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    Ok((positional, fs_opts))
}

/// Swap the path's extension for the given suffix (URI-safe string splitext).
fn with_suffix(path: &str, suffix: &str) -> String {
    let cut = match path.rfind('.') {
        Some(idx) if idx > path.rfind('/').map_or(0, |s| s) => idx,
        _ => path.len(),
    };
    format!("{}{}", &path[..cut], suffix)
}

fn init_tracing() {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();
}
