pub mod cli;
pub mod config;
pub mod db;
mod metrics;
pub mod server;
pub mod staging;

pub use config::Opts;
