//! Archive tests: SQLite storage and the background writer.

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use roomcast_archive::*;
    use roomcast_protocol::{ChatMessage, ConnectionId, RoomName};

    fn room_message(id: u64, room: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            text: text.into(),
            sender_id: ConnectionId::from("c-1"),
            sender_name: "alice".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32 % 60).unwrap(),
            room_name: RoomName::parse(room),
            target_id: None,
        }
    }

    fn lobby() -> RoomName {
        RoomName::parse("lobby").unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────
    // MessageArchive
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn insert_and_read_back() {
        let mut archive = MessageArchive::open_in_memory().unwrap();
        let msg = room_message(1, "lobby", "hi");
        assert!(archive.insert(&msg).unwrap());

        let history = archive.room_history(&lobby(), 10).unwrap();
        assert_eq!(history, vec![msg]);
        assert_eq!(archive.count().unwrap(), 1);
    }

    #[test]
    fn messages_without_room_are_skipped() {
        let mut archive = MessageArchive::open_in_memory().unwrap();
        let mut public = room_message(1, "lobby", "hi");
        public.room_name = None;
        assert!(!archive.insert(&public).unwrap());
        assert_eq!(archive.count().unwrap(), 0);
    }

    #[test]
    fn history_is_per_room_and_limited() {
        let mut archive = MessageArchive::open_in_memory().unwrap();
        let batch = vec![
            room_message(1, "lobby", "one"),
            room_message(2, "other", "elsewhere"),
            room_message(3, "lobby", "two"),
            room_message(4, "lobby", "three"),
        ];
        assert_eq!(archive.insert_batch(&batch).unwrap(), 4);

        let texts: Vec<String> = archive
            .room_history(&lobby(), 2)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn archive_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/archive.db");
        {
            let mut archive = MessageArchive::open(&path).unwrap();
            archive.insert(&room_message(1, "lobby", "kept")).unwrap();
        }
        let archive = MessageArchive::open(&path).unwrap();
        let history = archive.room_history(&lobby(), 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "kept");
    }

    // ─────────────────────────────────────────────────────────────────────
    // ArchiveWriter
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn writer_flushes_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.db");
        let writer = ArchiveWriter::open(&ArchiveConfig::new(&path)).unwrap();

        for i in 1..=5 {
            assert!(writer.submit(room_message(i, "lobby", "msg")));
        }
        writer.shutdown().await;

        let archive = MessageArchive::open(&path).unwrap();
        assert_eq!(archive.count().unwrap(), 5);
    }

    #[tokio::test]
    async fn writer_serves_queries() {
        let archive = MessageArchive::open_in_memory().unwrap();
        let writer = ArchiveWriter::spawn(archive, 16);
        writer.submit(room_message(1, "lobby", "hello"));

        // Poll until the background batch lands.
        let mut history = Vec::new();
        for _ in 0..50 {
            history = writer.room_history(lobby(), 10).await.unwrap();
            if !history.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(history.len(), 1);
        assert_eq!(writer.count().await.unwrap(), 1);
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let archive = MessageArchive::open_in_memory().unwrap();
        let writer = ArchiveWriter::spawn(archive, 1);

        // The current-thread test runtime cannot run the writer task until we
        // yield, so the second submit finds the queue full.
        assert!(writer.submit(room_message(1, "lobby", "first")));
        assert!(!writer.submit(room_message(2, "lobby", "second")));

        writer.shutdown().await;
    }
}
