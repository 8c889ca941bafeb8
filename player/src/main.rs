//! `player`: loads a `.spc` snapshot and streams its audio output, live
//! or to a file.

mod error;
mod sink;

use clap::Parser;
use error::{PlayerError, Result};
use log::{error, info};
use sink::{CpalSink, FileSink, SampleSink, SAMPLE_RATE_HZ};
use spc_core::machine::Machine;
use spc_snapshot::Snapshot;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "player", about = "SPC700/DSP snapshot player", long_about = None)]
struct Args {
    /// Snapshot file to play (.spc)
    snapshot: PathBuf,

    /// Write output to FILE instead of playing live
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// With -o, write decimal samples one pair per line instead of raw PCM
    #[arg(long)]
    text: bool,

    /// Skip this many seconds of audio before producing output
    #[arg(short = 's', long = "skip", default_value_t = 0)]
    seconds_to_skip: u64,

    /// Enable verbose (debug-level) logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env().filter_level(level).init();

    match run(args) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<()> {
    info!("Loading snapshot from {}", args.snapshot.display());
    let bytes = std::fs::read(&args.snapshot)?;
    let snapshot = Snapshot::from_bytes(&bytes)?;

    let mut machine = Machine::new();
    snapshot.load_into(&mut machine);
    info!("Snapshot loaded: initial PC=0x{:04X}", machine.cpu().regs.pc);

    let mut sink: Box<dyn SampleSink> = match &args.output {
        Some(path) => Box::new(FileSink::create(path, args.text)?),
        None => Box::new(CpalSink::new()?),
    };

    let skip_samples = args.seconds_to_skip * SAMPLE_RATE_HZ as u64;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| PlayerError::AudioBackend { message: format!("failed to install Ctrl-C handler: {e}") })?;

    info!("Playing. Press Ctrl+C to stop.");
    let mut produced: u64 = 0;
    while running.load(Ordering::Relaxed) {
        if let Some((left, right)) = machine.step() {
            produced += 1;
            if produced > skip_samples {
                sink.push(left, right);
            }
        }
    }

    sink.finish()?;
    info!("Stopped after {produced} samples ({:.1}s)", produced as f64 / SAMPLE_RATE_HZ as f64);
    Ok(())
}
