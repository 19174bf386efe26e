//! Side-effecting helpers: configuration files, child processes, oracles and prompts.

pub mod config;
pub mod oracle;
pub mod process;
pub mod prompt;
