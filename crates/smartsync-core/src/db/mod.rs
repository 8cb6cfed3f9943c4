//! Database layer for smartsync

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::LibSqlStore;
