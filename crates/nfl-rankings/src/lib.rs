// Library root: re-exports all modules so integration tests and the CLI
// binary can access the crate's public API.

pub mod config;
pub mod consensus;
pub mod db;
pub mod import;
pub mod ranking;
pub mod schedule;
pub mod service;
