//! Recover the raw ApRES file from a converted container file

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use apres_rs::{dataset_to_file, Dataset, APRES_SUFFIX};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <infile.acf> [outfile{}]", args[0], APRES_SUFFIX);
        std::process::exit(1);
    }

    let infile = &args[1];
    let outfile = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| with_suffix(infile, APRES_SUFFIX));

    tracing::info!("Recovering {} from {}", outfile, infile);

    let dataset = Dataset::from_reader(BufReader::new(File::open(infile)?))?;
    let file = dataset_to_file(&dataset)?;

    let mut writer = BufWriter::new(File::create(&outfile)?);
    file.write(&mut writer)?;
    writer.flush()?;

    tracing::info!("Wrote {} bursts to {}", file.len(), outfile);
    Ok(())
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
