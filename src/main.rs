//! tinycodec CLI
//!
//! Encodes YUV4MPEG2 video into the tiny bitstream and back.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tinycodec_lib::codec::tiny::{
    decode_all, Codebook, CodebookBuilder, DcReset, EncoderConfig, Keying, Qp, StreamInfo,
    TinyEncoder, YuvFrame,
};
use tinycodec_lib::format::{Y4mDemuxer, Y4mMuxer};
use tinycodec_lib::{init, Config};
use tracing::{info, warn};

/// Frames handed to the encoder at once
const ENCODE_BATCH: usize = 16;

#[derive(Parser)]
#[command(name = "tinycodec")]
#[command(about = "tinycodec - 4x4 integer-transform intra video codec", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of threads to use
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a Y4M file into a tiny bitstream (plus <output>.json)
    Encode {
        /// Input Y4M file (8-bit 4:2:0, 4:4:4 or mono)
        input: PathBuf,

        /// Output bitstream
        output: PathBuf,

        /// Quantization parameter (0-51)
        #[arg(long, default_value_t = 24)]
        qp: i64,

        /// Codebook asset (JSON); the built-in table is used otherwise
        #[arg(long)]
        codebook: Option<PathBuf>,

        /// Keep DC prediction running across frames
        #[arg(long)]
        session_dc: bool,

        /// Encode planes and frames one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Decode a tiny bitstream into a 4:2:0 Y4M file
    Decode {
        /// Input bitstream
        input: PathBuf,

        /// Output Y4M file
        output: PathBuf,

        /// Luma width (overrides the sidecar)
        #[arg(long)]
        width: Option<usize>,

        /// Luma height (overrides the sidecar)
        #[arg(long)]
        height: Option<usize>,

        /// Quantization parameter (overrides the sidecar)
        #[arg(long)]
        qp: Option<i64>,

        /// Number of frames (overrides the sidecar)
        #[arg(long)]
        frames: Option<u64>,

        /// Stream was encoded with --session-dc (overrides the sidecar)
        #[arg(long)]
        session_dc: bool,

        /// Codebook asset (JSON); must match the one used to encode
        #[arg(long)]
        codebook: Option<PathBuf>,
    },

    /// Export or train codebooks
    Codebook {
        #[command(subcommand)]
        action: CodebookCommand,
    },

    /// Show the stream info stored next to a bitstream
    Info {
        /// Bitstream path
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum CodebookCommand {
    /// Write the built-in codebook as JSON
    Export {
        /// Output JSON file
        output: PathBuf,
    },

    /// Build a codebook from the symbol statistics of a Y4M file
    Train {
        /// Training Y4M file
        input: PathBuf,

        /// Output JSON file
        output: PathBuf,

        /// Quantization parameter to gather statistics at
        #[arg(long, default_value_t = 24)]
        qp: i64,

        /// Table keying
        #[arg(long, value_enum, default_value_t = KeyingArg::RunSize)]
        keying: KeyingArg,

        /// Build a separate table for DC symbols
        #[arg(long)]
        split_dc: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KeyingArg {
    /// One code per literal (run, value)
    Literal,
    /// One code per (run, magnitude size) plus raw magnitude bits
    #[value(name = "run_size")]
    RunSize,
}

impl From<KeyingArg> for Keying {
    fn from(arg: KeyingArg) -> Self {
        match arg {
            KeyingArg::Literal => Keying::Literal,
            KeyingArg::RunSize => Keying::RunSize,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config {
        max_threads: cli.threads,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    init(config)?;

    info!("tinycodec v{}", tinycodec_lib::VERSION);

    match cli.command {
        Commands::Encode {
            input,
            output,
            qp,
            codebook,
            session_dc,
            sequential,
        } => {
            info!("Encoding {} -> {}", input.display(), output.display());
            cmd_encode(&input, &output, qp, codebook.as_deref(), session_dc, sequential)?;
        }
        Commands::Decode {
            input,
            output,
            width,
            height,
            qp,
            frames,
            session_dc,
            codebook,
        } => {
            info!("Decoding {} -> {}", input.display(), output.display());
            let overrides = StreamOverrides {
                width,
                height,
                qp,
                frames,
                session_dc,
            };
            cmd_decode(&input, &output, &overrides, codebook.as_deref())?;
        }
        Commands::Codebook { action } => match action {
            CodebookCommand::Export { output } => cmd_codebook_export(&output)?,
            CodebookCommand::Train {
                input,
                output,
                qp,
                keying,
                split_dc,
            } => cmd_codebook_train(&input, &output, qp, keying.into(), split_dc)?,
        },
        Commands::Info { input } => {
            cmd_info(&input)?;
        }
    }

    Ok(())
}

fn load_codebook(path: Option<&Path>) -> anyhow::Result<Codebook> {
    let codebook = match path {
        Some(path) => Codebook::load(path)?,
        None => Codebook::builtin()?,
    };
    Ok(codebook)
}

fn cmd_encode(
    input: &Path,
    output: &Path,
    qp: i64,
    codebook: Option<&Path>,
    session_dc: bool,
    sequential: bool,
) -> anyhow::Result<()> {
    let codebook = load_codebook(codebook)?;
    let config = EncoderConfig::new(Qp::new(qp)?)
        .with_dc_reset(if session_dc {
            DcReset::Session
        } else {
            DcReset::PerFrame
        })
        .with_parallel(!sequential);

    let mut demuxer = Y4mDemuxer::open(input)?;
    let sink = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    let mut encoder =
        TinyEncoder::new(sink, &codebook, config, demuxer.width(), demuxer.height())?;
    encoder.set_frame_rate(demuxer.frame_rate());

    let mut batch = Vec::with_capacity(ENCODE_BATCH);
    loop {
        let frame = demuxer.read_frame()?;
        let done = frame.is_none();
        if let Some(frame) = frame {
            batch.push(frame);
        }
        if batch.len() == ENCODE_BATCH || (done && !batch.is_empty()) {
            encoder.encode_batch(&batch)?;
            batch.clear();
        }
        if done {
            break;
        }
    }

    let (_, info) = encoder.finish()?;
    if info.frame_count == 0 {
        warn!("{} contained no frames", input.display());
    }

    let sidecar = StreamInfo::sidecar_path(output);
    info.save(&sidecar)?;

    println!(
        "Encoded {} frames ({}x{}, QP {}) -> {}",
        info.frame_count,
        info.width,
        info.height,
        info.qp,
        output.display()
    );
    println!("Stream info: {}", sidecar.display());
    Ok(())
}

/// Command-line values that replace sidecar fields
struct StreamOverrides {
    width: Option<usize>,
    height: Option<usize>,
    qp: Option<i64>,
    frames: Option<u64>,
    session_dc: bool,
}

fn resolve_stream_info(input: &Path, overrides: &StreamOverrides) -> anyhow::Result<StreamInfo> {
    let sidecar = StreamInfo::sidecar_path(input);
    let mut info = if sidecar.exists() {
        StreamInfo::load(&sidecar)?
    } else {
        let (Some(width), Some(height), Some(frames)) =
            (overrides.width, overrides.height, overrides.frames)
        else {
            bail!(
                "{} not found; pass --width, --height and --frames",
                sidecar.display()
            );
        };
        let mut info = StreamInfo::new(width, height, &EncoderConfig::default());
        info.frame_count = frames;
        info
    };

    if let Some(width) = overrides.width {
        info.width = width;
    }
    if let Some(height) = overrides.height {
        info.height = height;
    }
    if let Some(qp) = overrides.qp {
        info.qp = Qp::new(qp)?;
    }
    if let Some(frames) = overrides.frames {
        info.frame_count = frames;
    }
    if overrides.session_dc {
        info.dc_reset = DcReset::Session;
    }
    info.validate()?;
    Ok(info)
}

fn cmd_decode(
    input: &Path,
    output: &Path,
    overrides: &StreamOverrides,
    codebook: Option<&Path>,
) -> anyhow::Result<()> {
    let codebook = load_codebook(codebook)?;
    let info = resolve_stream_info(input, overrides)?;
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let frames = decode_all(&data, &codebook, info)?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    write_y4m(file, &info, &frames).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Decoded {} frames ({}x{}) -> {}",
        frames.len(),
        info.width,
        info.height,
        output.display()
    );
    Ok(())
}

/// Write decoded frames as Y4M, surfacing errors from the final flush
fn write_y4m<W: Write>(
    writer: W,
    info: &StreamInfo,
    frames: &[YuvFrame],
) -> anyhow::Result<()> {
    let mut buffered = BufWriter::new(writer);
    let mut muxer = Y4mMuxer::new(&mut buffered, info.width, info.height, info.frame_rate)?;
    for frame in frames {
        muxer.write_frame(frame)?;
    }
    drop(muxer);
    buffered.flush()?;
    Ok(())
}

fn cmd_codebook_export(output: &Path) -> anyhow::Result<()> {
    let codebook = Codebook::builtin()?;
    codebook.save(output)?;
    println!("Wrote built-in codebook to {}", output.display());
    Ok(())
}

fn cmd_codebook_train(
    input: &Path,
    output: &Path,
    qp: i64,
    keying: Keying,
    split_dc: bool,
) -> anyhow::Result<()> {
    let mut builder = CodebookBuilder::new(keying, Qp::new(qp)?).with_split_dc(split_dc);
    let mut demuxer = Y4mDemuxer::open(input)?;
    while let Some(frame) = demuxer.read_frame()? {
        builder.observe_frame(&frame)?;
    }
    if demuxer.frames_read() == 0 {
        bail!("{} contained no frames", input.display());
    }

    let codebook = builder.build()?;
    codebook.save(output)?;
    println!(
        "Trained codebook from {} frames ({} symbols) -> {}",
        demuxer.frames_read(),
        builder.symbol_count(),
        output.display()
    );
    Ok(())
}

fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let sidecar = StreamInfo::sidecar_path(input);
    let info = StreamInfo::load(&sidecar)
        .with_context(|| format!("reading stream info {}", sidecar.display()))?;

    println!("File: {}", input.display());
    if let Ok(metadata) = std::fs::metadata(input) {
        let bytes = metadata.len();
        println!("Size: {} bytes", bytes);
        let pixels = (info.width * info.height) as u64 * info.frame_count * 3 / 2;
        if bytes > 0 && pixels > 0 {
            println!(
                "Bits per sample: {:.3}",
                bytes as f64 * 8.0 / pixels as f64
            );
        }
    }
    println!("{}", info.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that rejects every write
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn stream(frames: &[YuvFrame]) -> StreamInfo {
        let mut info = StreamInfo::new(16, 8, &EncoderConfig::default());
        info.frame_count = frames.len() as u64;
        info
    }

    #[test]
    fn test_write_y4m() {
        let frames = vec![YuvFrame::filled(16, 8, 16, 128, 128).unwrap(); 2];
        let mut out = Vec::new();
        write_y4m(&mut out, &stream(&frames), &frames).unwrap();

        assert!(out.starts_with(b"YUV4MPEG2 "));
        assert_eq!(out.windows(6).filter(|w| *w == b"FRAME\n").count(), 2);
    }

    #[test]
    fn test_write_y4m_reports_flush_failure() {
        // small enough to stay in the buffer until the final flush
        let frames = vec![YuvFrame::filled(16, 8, 16, 128, 128).unwrap()];
        assert!(write_y4m(ClosedPipe, &stream(&frames), &frames).is_err());
    }
}
