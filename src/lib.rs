//! Lyric Relay - translation relay for synced song lyrics
//!
//! Translates batches of lyric lines through a hosted NLLB model, falls back
//! per line to a free translation-memory API, and proxies lyrics providers
//! for browser clients that cannot call them directly.

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod lang;
pub mod rate_limit;
pub mod retry;
pub mod server;
pub mod translate;

#[cfg(test)]
mod test_support;
