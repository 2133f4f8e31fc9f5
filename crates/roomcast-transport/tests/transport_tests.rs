//! Transport tests: outbound queues, client staleness, and the HTTP surface.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::extract::ws::Message;
    use roomcast_protocol::ConnectionId;
    use roomcast_transport::{
        ClientConnection, EventHandler, Outbox, PeerTable, TransportConfig, TransportServer,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    // ─────────────────────────────────────────────────────────────────────
    // PeerTable
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn deliver_queues_text_frame() {
        let peers = PeerTable::new();
        let id = ConnectionId::from("a");
        let (tx, mut rx) = mpsc::unbounded_channel();
        peers.insert(id.clone(), tx);

        assert!(peers.deliver(&id, r#"{"event":"listRooms"}"#));
        match rx.try_recv().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"event":"listRooms"}"#),
            other => panic!("Unexpected message: {other:?}"),
        }
    }

    #[test]
    fn deliver_to_unknown_or_closed_peer_fails() {
        let peers = PeerTable::new();
        assert!(!peers.deliver(&ConnectionId::from("ghost"), "{}"));

        let id = ConnectionId::from("a");
        let (tx, rx) = mpsc::unbounded_channel();
        peers.insert(id.clone(), tx);
        drop(rx);
        assert!(!peers.deliver(&id, "{}"));
    }

    #[test]
    fn clones_share_the_table() {
        let peers = PeerTable::new();
        let view = peers.clone();
        let (tx, _rx) = mpsc::unbounded_channel();
        peers.insert(ConnectionId::from("a"), tx);

        assert!(view.contains(&ConnectionId::from("a")));
        assert_eq!(view.len(), 1);

        view.remove(&ConnectionId::from("a"));
        assert!(peers.is_empty());
    }

    #[test]
    fn arc_outbox_forwards() {
        let peers = Arc::new(PeerTable::new());
        let id = ConnectionId::from("a");
        let (tx, mut rx) = mpsc::unbounded_channel();
        peers.insert(id.clone(), tx);

        assert!(Outbox::deliver(&peers, &id, "{}"));
        assert!(rx.try_recv().is_ok());
    }

    // ─────────────────────────────────────────────────────────────────────
    // ClientConnection
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn client_goes_stale_without_activity() {
        let mut client = ClientConnection::new(ConnectionId::from("a"));
        assert!(!client.is_stale(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(20));
        assert!(client.is_stale(Duration::from_millis(5)));

        client.touch();
        assert!(!client.is_stale(Duration::from_secs(60)));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Server
    // ─────────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    impl EventHandler for Journal {
        fn on_connect(&self, id: &ConnectionId, _display_name: Option<&str>) {
            self.calls.lock().unwrap().push(format!("connect {id}"));
        }

        fn on_frame(&self, id: &ConnectionId, text: &str) {
            self.calls.lock().unwrap().push(format!("frame {id} {text}"));
        }

        fn on_malformed(&self, id: &ConnectionId, reason: &str) {
            self.calls.lock().unwrap().push(format!("malformed {id} {reason}"));
        }

        fn on_disconnect(&self, id: &ConnectionId) {
            self.calls.lock().unwrap().push(format!("disconnect {id}"));
        }
    }

    async fn get(port: u16, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
            .await
            .expect("Timeout waiting for response")
            .unwrap();
        response
    }

    fn test_config() -> TransportConfig {
        TransportConfig {
            port: 0,
            heartbeat_interval: None,
            ..TransportConfig::default()
        }
    }

    #[tokio::test]
    async fn binds_os_assigned_port_and_reports_health() {
        let handler = Arc::new(Journal::default());
        let mut server = TransportServer::start(test_config(), handler.clone(), PeerTable::new())
            .await
            .unwrap();

        assert_ne!(server.port(), 0);
        assert_eq!(server.client_count(), 0);

        let response = get(server.port(), "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""status":"ok""#));
        assert!(response.contains(r#""clients":0"#));
        assert!(handler.calls.lock().unwrap().is_empty());

        server.stop().await;
    }

    #[tokio::test]
    async fn plain_get_on_ws_route_is_not_upgraded() {
        let handler = Arc::new(Journal::default());
        let mut server = TransportServer::start(test_config(), handler.clone(), PeerTable::new())
            .await
            .unwrap();

        let response = get(server.port(), "/ws").await;
        assert!(!response.starts_with("HTTP/1.1 101"));
        assert!(handler.calls.lock().unwrap().is_empty());

        server.stop().await;
    }
}
