//! Parallel evaluation of receiver batches.

mod config;
mod runner;

pub use config::PropagationConfig;
pub use runner::{BatchReport, BatchRunner, Receiver};
