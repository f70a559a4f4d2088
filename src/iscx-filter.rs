use std::{path::PathBuf, process::exit};

use chrono::FixedOffset;
use clap::Parser;
use iscx_prep::{
    filter::filter_capture,
    flow::{load_flows, parse_utc_offset},
    matcher::FlowTable,
};
use log::{error, info};

/// Extract the packets of the flows described by ISCX XML files from a capture.
///
/// Every packet is compared with every flow, so expect a long run on the
/// full 24GB capture.
#[derive(Parser)]
#[clap(name = "iscx-filter")]
struct Opts {
    /// Directory holding the XML flow files
    #[clap(long, short = 'i')]
    input_dir: PathBuf,
    /// XML flow file to read (relative to the input dir), repeatable
    #[clap(long = "file", short = 'f', required = true, multiple_occurrences = true)]
    files: Vec<PathBuf>,
    /// Capture to read packets from
    #[clap(long, short = 'p')]
    pcap: PathBuf,
    /// Capture to create with the matching packets
    #[clap(long, short = 'o')]
    output: PathBuf,
    /// UTC offset the flow start/stop times were recorded in, e.g. -03:00
    #[clap(long, default_value = "+00:00", parse(try_from_str = parse_utc_offset))]
    utc_offset: FixedOffset,
}

fn run(opts: Opts) -> anyhow::Result<()> {
    info!("loading ISCX 2012 DDoS flows");
    let flows = load_flows(&opts.input_dir, &opts.files, opts.utc_offset)?;
    let table = FlowTable::new(flows);

    filter_capture(&opts.pcap, &opts.output, &table)?;
    info!("done");
    Ok(())
}

fn main() {
    iscx_prep::init_logging();
    let opts = Opts::parse();

    if let Err(e) = run(opts) {
        error!("{:#}", e);
        exit(1);
    }
}
