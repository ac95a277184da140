// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod coerce;
pub mod config;
pub mod db;
pub mod import;
pub mod loader;
pub mod mapper;
pub mod schema;
