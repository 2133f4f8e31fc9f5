//! Protocol layer tests: frame decoding, outbound encoding, error codes, value types.

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use roomcast_protocol::*;
    use serde_json::json;

    fn sample_message() -> ChatMessage {
        ChatMessage {
            id: 7,
            text: "hi".into(),
            sender_id: ConnectionId::from("c-1"),
            sender_name: "alice".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            room_name: RoomName::parse("lobby"),
            target_id: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Value types
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn room_name_is_trimmed() {
        let name = RoomName::parse("  lobby \n").unwrap();
        assert_eq!(name.as_str(), "lobby");
    }

    #[test]
    fn blank_room_name_is_rejected() {
        assert!(RoomName::parse("").is_none());
        assert!(RoomName::parse("   \t").is_none());
    }

    #[test]
    fn room_names_are_case_sensitive() {
        assert_ne!(RoomName::parse("Lobby"), RoomName::parse("lobby"));
    }

    #[test]
    fn blank_display_name_is_rejected() {
        assert!(DisplayName::parse("  ").is_none());
        assert_eq!(DisplayName::parse(" bob ").unwrap().as_str(), "bob");
    }

    #[test]
    fn generated_connection_ids_are_distinct() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn connection_id_serializes_as_plain_string() {
        let id = ConnectionId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc"));
    }

    #[test]
    fn chat_message_uses_camel_case() {
        let value = serde_json::to_value(sample_message()).unwrap();
        assert_eq!(value["senderId"], "c-1");
        assert_eq!(value["senderName"], "alice");
        assert_eq!(value["roomName"], "lobby");
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
        assert!(value.get("targetId").is_none());
    }

    #[test]
    fn chat_message_scope_helpers() {
        let mut msg = sample_message();
        assert!(msg.is_room_scoped());
        assert!(!msg.is_private());

        msg.room_name = None;
        msg.target_id = Some(ConnectionId::from("c-2"));
        assert!(msg.is_private());
        assert!(!msg.is_room_scoped());
    }

    #[test]
    fn anonymous_presence_entry_has_null_name() {
        let entry = PresenceEntry {
            id: ConnectionId::from("c-9"),
            display_name: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!({"id": "c-9", "displayName": null}));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inbound decoding
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn decode_public_message() {
        let event = ClientEvent::decode(r#"{"event":"message","data":{"text":"hello"}}"#).unwrap();
        assert_eq!(event, ClientEvent::Message { text: "hello".into() });
        assert_eq!(event.name(), ClientEvents::MESSAGE);
        assert_eq!(event.text(), Some("hello"));
    }

    #[test]
    fn decode_room_message_camel_case() {
        let raw = r#"{"event":"roomMessage","data":{"roomName":"lobby","text":"hi"}}"#;
        let event = ClientEvent::decode(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::RoomMessage {
                room_name: "lobby".into(),
                text: "hi".into()
            }
        );
    }

    #[test]
    fn decode_private_message() {
        let event = ClientEvent::decode(
            r#"{"event":"privateMessage","data":{"targetId":"c-2","text":"psst"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::PrivateMessage { target_id, text } => {
                assert_eq!(target_id.as_str(), "c-2");
                assert_eq!(text, "psst");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_typing_without_room() {
        let event =
            ClientEvent::decode(r#"{"event":"typing","data":{"displayName":"alice"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Typing {
                display_name: "alice".into(),
                room_name: None
            }
        );
    }

    #[test]
    fn decode_stop_typing_with_empty_payload() {
        let event = ClientEvent::decode(r#"{"event":"stopTyping","data":{}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::StopTyping {
                display_name: None,
                room_name: None
            }
        );
    }

    #[test]
    fn decode_no_payload_events() {
        assert_eq!(
            ClientEvent::decode(r#"{"event":"listRooms"}"#).unwrap(),
            ClientEvent::ListRooms
        );
        assert_eq!(
            ClientEvent::decode(r#"{"event":"listUsers","data":null}"#).unwrap(),
            ClientEvent::ListUsers
        );
    }

    #[test]
    fn payload_on_no_payload_event_is_ignored() {
        let event =
            ClientEvent::decode(r#"{"event":"connectionState","data":{"junk":true}}"#).unwrap();
        assert_eq!(event, ClientEvent::ConnectionState);
    }

    #[test]
    fn blank_text_still_decodes() {
        // Blank text is a handler-level validation error, not a decode error.
        let event = ClientEvent::decode(r#"{"event":"message","data":{"text":"   "}}"#).unwrap();
        assert_eq!(event.text(), Some("   "));
    }

    #[test]
    fn unknown_event_is_reported() {
        let err = ClientEvent::decode(r#"{"event":"selfDestruct","data":{}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownEvent);
        assert!(err.message.contains("selfDestruct"));
    }

    #[test]
    fn missing_field_is_malformed() {
        let raw = r#"{"event":"roomMessage","data":{"text":"hi"}}"#;
        let err = ClientEvent::decode(raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedEvent);
    }

    #[test]
    fn missing_payload_is_malformed() {
        let err = ClientEvent::decode(r#"{"event":"joinRoom"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedEvent);
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = ClientEvent::decode(r#"{"event":"message","data":{"text":42}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedEvent);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = ClientEvent::decode("not json at all").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedEvent);

        let err = ClientEvent::decode(r#"{"data":{"text":"no event"}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedEvent);
    }

    #[test]
    fn every_known_event_is_listed() {
        for name in ClientEvents::ALL {
            assert!(ClientEvents::is_known(name));
        }
        assert!(!ClientEvents::is_known("presenceChanged"));
        assert!(!ClientEvents::takes_payload(ClientEvents::LIST_ROOMS));
        assert!(ClientEvents::takes_payload(ClientEvents::JOIN_ROOM));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Outbound encoding
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn presence_changed_wire_format() {
        let event = ServerEvent::presence(vec![
            PresenceEntry {
                id: ConnectionId::from("c-1"),
                display_name: DisplayName::parse("alice"),
            },
            PresenceEntry {
                id: ConnectionId::from("c-2"),
                display_name: None,
            },
        ]);
        let value: serde_json::Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "presenceChanged",
                "data": {
                    "count": 2,
                    "roster": [
                        {"id": "c-1", "displayName": "alice"},
                        {"id": "c-2", "displayName": null}
                    ]
                }
            })
        );
    }

    #[test]
    fn room_message_wire_format() {
        let event = ServerEvent::RoomMessage(sample_message());
        assert_eq!(event.name(), ServerEvents::ROOM_MESSAGE);
        let value: serde_json::Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(value["event"], "roomMessage");
        assert_eq!(value["data"]["text"], "hi");
        assert_eq!(value["data"]["roomName"], "lobby");
        assert_eq!(value["data"]["id"], 7);
    }

    #[test]
    fn room_list_changed_wire_format() {
        let event = ServerEvent::RoomListChanged {
            names: vec![RoomName::parse("a").unwrap(), RoomName::parse("b").unwrap()],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "roomListChanged", "data": {"names": ["a", "b"]}}));
    }

    #[test]
    fn typing_omits_absent_room() {
        let event = ServerEvent::Typing {
            connection_id: ConnectionId::from("c-1"),
            display_name: "alice".into(),
            room_name: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "typing", "data": {"connectionId": "c-1", "displayName": "alice"}})
        );
    }

    #[test]
    fn error_event_wire_format() {
        let event: ServerEvent =
            EventError::new(ErrorCode::DmSelfTarget, "Cannot send a private message to yourself")
                .into();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["code"], "DM_SELF_TARGET");
        assert_eq!(value["data"]["message"], "Cannot send a private message to yourself");
    }

    #[test]
    fn server_event_parses_back_from_frame() {
        let original = ServerEvent::RoomJoined {
            room_name: RoomName::parse("lobby").unwrap(),
            members: vec![ConnectionId::from("c-1")],
            history: vec![sample_message()],
        };
        let parsed: ServerEvent = serde_json::from_str(&original.to_frame().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Error codes
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn error_code_strings_match_serde() {
        let codes = [
            ErrorCode::EmptyText,
            ErrorCode::DmEmptyText,
            ErrorCode::DmSelfTarget,
            ErrorCode::InvalidRoomName,
            ErrorCode::InvalidDisplayName,
            ErrorCode::TextTooLong,
            ErrorCode::MalformedEvent,
            ErrorCode::UnknownEvent,
            ErrorCode::RoomExists,
            ErrorCode::RoomNotFound,
            ErrorCode::NotAMember,
            ErrorCode::DmTargetOffline,
            ErrorCode::InternalError,
        ];
        for code in codes {
            assert_eq!(serde_json::to_value(code).unwrap(), json!(code.as_str()));
        }
    }

    #[test]
    fn not_found_classification() {
        assert!(ErrorCode::RoomNotFound.is_not_found());
        assert!(ErrorCode::DmTargetOffline.is_not_found());
        assert!(!ErrorCode::EmptyText.is_not_found());
        assert!(!ErrorCode::InternalError.is_not_found());
    }

    #[test]
    fn event_error_display() {
        let err = EventError::text_too_long(10);
        assert_eq!(err.code, ErrorCode::TextTooLong);
        assert_eq!(
            err.to_string(),
            "[TEXT_TOO_LONG] Text exceeds the maximum length of 10 characters"
        );
    }
}
