//! Command-line front end of the `gpx` expression engine.
mod cli;
pub mod config;

pub use cli::Cli;
pub use config::Config;
