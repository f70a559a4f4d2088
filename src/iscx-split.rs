use std::{path::PathBuf, process::exit};

use clap::Parser;
use iscx_prep::{
    kfold::{StratifiedKFold, DEFAULT_SEED},
    layout::{OutputLayout, DEFAULT_PREFIX},
    loader::load_dataset,
    serialize::AttributeMode,
};
use log::{error, info};

/// Split ISCX flow summaries into stratified k-fold training and testing sets.
///
/// The roles are swapped on purpose: each fold's 1/k slice is written as the
/// training set and the remaining (k-1)/k as the testing set.
#[derive(Parser)]
#[clap(name = "iscx-split")]
struct Opts {
    /// Number of folds
    #[clap(long, short = 'k', default_value_t = 5)]
    folds: usize,
    /// Directory holding the XML flow files
    #[clap(long, short = 'i')]
    input_dir: PathBuf,
    /// XML flow file to read (relative to the input dir), repeatable
    #[clap(long = "file", short = 'f', required = true, multiple_occurrences = true)]
    files: Vec<PathBuf>,
    /// Parent directory for the train/ and test/ sets
    /// [default: ISCX2012DDoS_<folds>-fold_sets]
    #[clap(long, short = 'o')]
    output_dir: Option<PathBuf>,
    #[clap(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// File name prefix of the written sets
    #[clap(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
    /// Write element attributes of the input back out instead of dropping them
    #[clap(long)]
    keep_attributes: bool,
}

fn run(opts: Opts) -> anyhow::Result<()> {
    let output_dir = opts
        .output_dir
        .unwrap_or_else(|| PathBuf::from(format!("ISCX2012DDoS_{}-fold_sets", opts.folds)));
    let mode = if opts.keep_attributes {
        AttributeMode::Preserve
    } else {
        AttributeMode::Drop
    };

    info!("loading ISCX 2012 DDoS dataset");
    let dataset = load_dataset(&opts.input_dir, &opts.files, true)?;
    let [normal, attack] = dataset.class_counts();
    info!("{} flows loaded: {normal} normal, {attack} attack", dataset.len());

    let folds = StratifiedKFold::new(opts.folds, opts.seed).split(&dataset.labels)?;
    let layout = OutputLayout::new(output_dir, opts.prefix);
    let written = layout.write_folds(&dataset, &folds, mode)?;

    for fold in &written {
        info!(
            "fold {}: {} training, {} testing",
            fold.number, fold.training.records, fold.testing.records
        );
    }
    info!("sets written under {}", layout.root().display());
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
