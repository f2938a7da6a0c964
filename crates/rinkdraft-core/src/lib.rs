// Library root: re-exports all modules so integration tests and the CLI
// driver can access the crate's public API.

pub mod analysis;
pub mod config;
pub mod draft;
pub mod error;
pub mod game;
pub mod players;
