//! SQLite storage for room messages. rusqlite is sync; callers run it on
//! `spawn_blocking`.

use std::path::Path;

use chrono::{DateTime, Utc};
use roomcast_protocol::{ChatMessage, ConnectionId, RoomName};

use crate::ArchiveResult;

pub struct MessageArchive {
    conn: rusqlite::Connection,
}

impl MessageArchive {
    /// Open (or create) the archive at `path`, creating parent directories.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let archive = Self { conn };
        archive.run_migrations()?;
        Ok(archive)
    }

    pub fn open_in_memory() -> ArchiveResult<Self> {
        let archive = Self {
            conn: rusqlite::Connection::open_in_memory()?,
        };
        archive.run_migrations()?;
        Ok(archive)
    }

    fn run_migrations(&self) -> ArchiveResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS room_messages (
                id          INTEGER NOT NULL,
                room_name   TEXT NOT NULL,
                sender_id   TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                text        TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                archived_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_room_messages_room ON room_messages(room_name, id);
            ",
        )?;
        Ok(())
    }

    /// Store a batch in one transaction. Messages without a room are skipped.
    pub fn insert_batch(&mut self, messages: &[ChatMessage]) -> ArchiveResult<usize> {
        let now = Utc::now().timestamp_millis();
        let tx = self.conn.transaction()?;
        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO room_messages
                    (id, room_name, sender_id, sender_name, text, timestamp, archived_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for msg in messages {
                let Some(room) = &msg.room_name else {
                    continue;
                };
                stmt.execute(rusqlite::params![
                    msg.id as i64,
                    room.as_str(),
                    msg.sender_id.as_str(),
                    msg.sender_name,
                    msg.text,
                    msg.timestamp.to_rfc3339(),
                    now,
                ])?;
                stored += 1;
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    pub fn insert(&mut self, message: &ChatMessage) -> ArchiveResult<bool> {
        Ok(self.insert_batch(std::slice::from_ref(message))? == 1)
    }

    /// The most recent `limit` messages of a room, oldest first.
    pub fn room_history(&self, room: &RoomName, limit: usize) -> ArchiveResult<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, room_name, sender_id, sender_name, text, timestamp FROM (
                SELECT * FROM room_messages WHERE room_name = ?1 ORDER BY id DESC LIMIT ?2
            ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![room.as_str(), limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, room_name, sender_id, sender_name, text, timestamp) = row?;
            messages.push(ChatMessage {
                id: id as u64,
                text,
                sender_id: ConnectionId::from(sender_id),
                sender_name,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)?.with_timezone(&Utc),
                room_name: RoomName::parse(&room_name),
                target_id: None,
            });
        }
        Ok(messages)
    }

    pub fn count(&self) -> ArchiveResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM room_messages", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
