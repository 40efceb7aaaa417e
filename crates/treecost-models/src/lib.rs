//! treecost-models: synthetic replacement-cost labels and a boosted-tree cost
//! model for street-tree census data.
//!
//! The crate covers the whole path from census rows to a ranked list of cost
//! drivers: cost synthesis from trunk diameter, categorical encoding, a seeded
//! train/test split, a gradient-boosted regression tree ensemble, held-out
//! scoring and split-count feature importance. CSV I/O and an HTML report are
//! provided for the command-line front end.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod importance;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod stats;
pub mod synthesis;
pub mod trainer;

pub use error::{PipelineError, Result};
