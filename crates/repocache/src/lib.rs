//! Library half of the `repocache` CLI, split out of `main.rs` so the
//! command tree and its handlers can be exercised from integration tests
//! without spawning the compiled binary.

pub mod cli;
pub mod output;
