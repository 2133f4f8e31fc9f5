//! Roomcast archive: optional on-disk record of room messages.
//!
//! The live history served to clients stays in memory. The archive is a
//! side channel: the router hands each room message to an [`ArchiveWriter`],
//! which queues it and writes batches to SQLite on the blocking pool. A full
//! queue drops the record, never the delivery.
//!
//! The router never reads the archive back; joins are served from memory.
//! `ArchiveWriter::count` feeds the startup banner, and `room_history` is the
//! read side for offline inspection of a database file.

pub mod db;
pub mod writer;

use std::path::PathBuf;

use thiserror::Error;

pub use db::MessageArchive;
pub use writer::ArchiveWriter;

/// Archive settings.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub path: PathBuf,
    /// Bounded queue capacity between the router and the writer task
    pub queue_capacity: usize,
}

impl ArchiveConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue_capacity: 1024,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::new("roomcast.db")
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
