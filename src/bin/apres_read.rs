//! Print the headers, shapes, a sample of the data, and diagnostics from
//! a raw ApRES file

use std::env;
use std::io::BufReader;

use apres_rs::{ApresFile, DecodeMode, StreamOptions};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let (positional, fs_opts) = parse_args(&args)?;

    if positional.len() != 1 {
        eprintln!("Usage: {} [-o FS_OPTS_JSON] <infile.dat>", args[0]);
        std::process::exit(1);
    }

    let infile = &positional[0];
    let stream = apres_rs::open_stream(infile, &fs_opts)?;
    let file = ApresFile::read(BufReader::new(stream), DecodeMode::Forgiving)?;

    for (i, burst) in file.bursts().iter().enumerate() {
        println!("burst {}: format version = {:?}", i, burst.version());
        println!("burst {}: data shape = {:?}", i, burst.shape().dims());
        println!("burst {}: header =", i);
        for (key, value) in burst.header().iter() {
            println!("  {} = {}", key, value);
        }

        if let Some(diagnostic) = burst.diagnostic() {
            println!("burst {}: diagnostic: {}", i, diagnostic);
        }

        let samples = burst.samples();
        println!("burst {}: len(data) = {}", i, samples.len());

        // Show a small selection of the first samples
        if !samples.is_empty() {
            let n = samples.len().min(10);
            let head: Vec<String> = (0..n).map(|j| samples.value_at(j).to_string()).collect();
            println!("burst {}: head = [{}]", i, head.join(", "));
        }
    }

    println!("number of bursts = {}", file.len());
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

fn init_tracing() {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap();

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();
}
