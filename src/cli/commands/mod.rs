//! CLI command implementations.

pub mod config_cmd;
pub mod parse;
pub mod run;
pub mod scrape;
