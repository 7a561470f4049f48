//! Command-line front end for the partscout pipeline.

pub mod cli;
pub mod pipeline;
