pub mod aws;
pub mod cache;
pub mod cli;
pub mod completions;
pub mod config;
pub mod constants;
pub mod env;
pub mod exec;
pub mod orchestrator;
