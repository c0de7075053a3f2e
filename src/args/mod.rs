//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::LoadArgs;
pub use types::HttpMethod;

pub(crate) use defaults::DEFAULT_USER_AGENT;
