use std::{path::PathBuf, process::exit};

use clap::Parser;
use iscx_prep::rewrite::rewrite_destination;
use log::error;
use mac_address::MacAddress;

/// Point every non-broadcast frame of a capture at a new destination MAC.
#[derive(Parser)]
#[clap(name = "eth-rewrite")]
struct Opts {
    /// Destination MAC address to write in, e.g. 00:11:22:33:44:55
    mac: MacAddress,
    /// Capture to read
    input: PathBuf,
    /// Capture to create
    output: PathBuf,
}

fn run(opts: Opts) -> anyhow::Result<()> {
    rewrite_destination(&opts.input, &opts.output, opts.mac)?;
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
