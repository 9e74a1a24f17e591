//! Shared pieces of the waveprint command-line tools

pub mod config;
pub mod corpus;
pub mod output;
