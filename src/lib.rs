//! Preparation of the ISCX 2012 DDoS dataset: stratified k-fold splitting of
//! the labeled flow summaries, and extraction of the packets behind a flow
//! subset from the raw capture.

pub mod capture;
pub mod error;
pub mod filter;
pub mod flow;
pub mod kfold;
pub mod layout;
pub mod loader;
pub mod matcher;
pub mod record;
pub mod rewrite;
pub mod serialize;

pub use error::{Error, ReadError, Result, WriteError};

/// Installs the `env_logger` backend, `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
