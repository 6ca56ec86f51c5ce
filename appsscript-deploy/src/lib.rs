pub mod auth;
pub mod cli;
pub mod client;
pub mod load_config;

pub use cli::{render_error, run, Cli, Commands};
