//! Read a raw ApRES file and write it to another raw ApRES file,
//! optionally subsetting the bursts, sub-bursts, samples and attenuators

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use apres_rs::{ApresFile, DecodeMode, StreamOptions, SubsetLimits};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let (positional, fs_opts, limits) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            usage(&args[0]);
        }
    };

    if positional.len() != 2 {
        usage(&args[0]);
    }

    let infile = &positional[0];
    let outfile = &positional[1];

    tracing::info!("Rewriting {} to {}", infile, outfile);

    let stream = apres_rs::open_stream(infile, &fs_opts)?;
    let file = ApresFile::read(BufReader::new(stream), DecodeMode::Forgiving)?;

    let mut writer = BufWriter::new(File::create(outfile)?);
    file.write_subset(&mut writer, &limits)?;
    writer.flush()?;

    tracing::info!("Wrote {}", outfile);
    Ok(())
}

fn usage(prog: &str) -> ! {
    eprintln!(
        "Usage: {} [-b BURSTS] [-u SUBBURSTS] [-s SAMPLES] [-a ATTENUATORS] [-o FS_OPTS_JSON] <infile.dat> <outfile.dat>",
        prog
    );
    eprintln!("Only the first N of each limited axis are written out.");
    std::process::exit(1);
}

type ParsedArgs = (Vec<String>, StreamOptions, SubsetLimits);

fn parse_args(args: &[String]) -> anyhow::Result<ParsedArgs> {
    let mut positional = Vec::new();
    let mut fs_opts = StreamOptions::new();
    let mut limits = SubsetLimits::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-b" | "--bursts" => {
                limits.bursts = Some(flag_value(args, &mut i, "-b")?);
            }
            "-u" | "--subbursts" => {
                limits.subbursts = Some(flag_value(args, &mut i, "-u")?);
            }
            "-s" | "--samples" => {
                limits.samples = Some(flag_value(args, &mut i, "-s")?);
            }
            "-a" | "--attenuators" => {
                limits.attenuators = Some(flag_value(args, &mut i, "-a")?);
            }
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

    Ok((positional, fs_opts, limits))
}

fn flag_value(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<usize> {
    *i += 1;
    let raw = args
        .get(*i)
        .ok_or_else(|| anyhow::anyhow!("missing value for {}", flag))?;
    Ok(raw.parse()?)
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
