//! css-commons library
//!
//! Moves stylesheet modules required by several entry chunks into shared
//! common chunks and rewrites the entries to `@import` them.

pub mod cli;
pub mod config;
pub mod bundler;
pub mod extract;
pub mod resolver;
pub mod transform;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use bundler::Bundler;
