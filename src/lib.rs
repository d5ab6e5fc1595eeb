// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod config;
pub mod content;
pub mod db;
pub mod media;
pub mod server;
pub mod survey;
pub mod tier;
