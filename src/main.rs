use anyhow::Context;
use clap::Parser;
use huffpack::{BitStream, Codec, FrequencyTable};
use std::fs::{self, File};
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};

const USAGE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, clap::Args)]
struct EncodeArgs {
    /// Plain-text file to count symbols from and to compress.
    source: PathBuf,
    compressed: PathBuf,
}

#[derive(Debug, Clone, clap::Args)]
struct DecodeArgs {
    /// Plain-text file the compressed file's code was built from.
    source: PathBuf,
    compressed: PathBuf,
    /// Where to write the decoded bytes instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
struct CodesArgs {
    source: PathBuf,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Operation {
    Encode(EncodeArgs),
    Decode(DecodeArgs),
    /// Print the code assigned to every symbol of a source file.
    Codes(CodesArgs),
}

#[derive(Debug, clap::Parser)]
#[command(version, about = "Huffman-code files into a trailer-terminated bit stream")]
struct Args {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    op: Operation,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_codec(source: &mut BufReader<File>, path: &Path) -> anyhow::Result<Codec> {
    let freqs = FrequencyTable::from_reader(&mut *source)
        .with_context(|| format!("failed to count symbols in {}", path.display()))?;
    log::info!(
        "{}: {} distinct symbols, {:?} total",
        path.display(),
        freqs.distinct(),
        freqs.total()
    );

    Codec::from_frequencies(&freqs).map_err(anyhow::Error::from)
}

fn open_source(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn encode(args: EncodeArgs) -> anyhow::Result<()> {
    let mut source = open_source(&args.source)?;
    let codec = load_codec(&mut source, &args.source)?;
    source.rewind()?;

    let mut stream = BitStream::open(&args.compressed, "w")?;
    let summary = codec
        .encode_bits(source, &mut stream)
        .with_context(|| format!("failed to encode {}", args.source.display()))?;
    stream.close()?;

    if u128::from(summary.bits) != codec.table().encoded_bits() {
        log::warn!(
            "{} changed while it was being encoded, the code may not fit it",
            args.source.display()
        );
    }

    log::info!(
        "wrote {} symbols as {} bits ({} bytes) to {}",
        summary.symbols,
        summary.bits,
        summary.compressed_len(),
        args.compressed.display()
    );

    Ok(())
}

fn decode(args: DecodeArgs) -> anyhow::Result<()> {
    let mut source = open_source(&args.source)?;
    let codec = load_codec(&mut source, &args.source)?;

    let mut stream = BitStream::open(&args.compressed, "r")?;

    let result = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let result = codec.decode_bits(&mut stream, file);

            // No partial output is left behind.
            if result.is_err() {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("failed to remove {}: {}", path.display(), e);
                }
            }
            result
        }
        None => codec.decode_bits(&mut stream, std::io::stdout().lock()),
    };

    let summary =
        result.with_context(|| format!("failed to decode {}", args.compressed.display()))?;
    stream.close()?;

    log::info!(
        "decoded {} symbols from {} bits",
        summary.symbols,
        summary.bits
    );

    Ok(())
}

fn codes(args: CodesArgs) -> anyhow::Result<()> {
    let mut source = open_source(&args.source)?;
    let codec = load_codec(&mut source, &args.source)?;

    print!("{}", codec.table());
    log::info!(
        "{} encodes to {} bits",
        args.source.display(),
        codec.table().encoded_bits()
    );

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(USAGE_EXIT_CODE);
        }
        Err(e) => e.exit(),
    };

    init_logging(args.verbose);

    match args.op {
        Operation::Encode(args) => encode(args),
        Operation::Decode(args) => decode(args),
        Operation::Codes(args) => codes(args),
    }
}
