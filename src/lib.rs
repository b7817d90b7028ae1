pub mod capture;
pub mod cli;
pub mod config;
pub mod connections;
pub mod direction;
pub mod error;
pub mod format;
pub mod geo;
pub mod identity;
pub mod ingest;
pub mod keys;
pub mod ledger;
pub mod packet;
pub mod prefix;
pub mod report;
pub mod sort_mode;

pub use error::{Error, Result};
